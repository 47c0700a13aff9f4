use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::app::{LowdownError, Result};
use crate::domain::{Item, ItemKind};
use crate::pipeline::Pipeline;
use crate::store::Store;

pub const DEFAULT_WORKERS: usize = 4;

/// Per-item results of a batch run, in input order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub results: Vec<(i64, Result<Item>)>,
}

impl BatchReport {
    /// Items that reached their generated status.
    pub fn generated(&self) -> Vec<&Item> {
        self.results
            .iter()
            .filter_map(|(_, r)| r.as_ref().ok())
            .filter(|item| item.status == item.kind.generated_status())
            .collect()
    }

    /// `(id, reason)` for every item that ended in a failure status or could
    /// not be processed at all.
    pub fn failures(&self) -> Vec<(i64, String)> {
        self.results
            .iter()
            .filter_map(|(id, result)| match result {
                Ok(item) if item.status.is_failure() => {
                    Some((*id, item.summary.clone().unwrap_or_default()))
                }
                Ok(_) => None,
                Err(e) => Some((*id, e.to_string())),
            })
            .collect()
    }
}

/// Bounded-concurrency driver: one task per item, at most `workers` in
/// flight. An item's failure never stops its siblings.
pub struct BatchRunner {
    semaphore: Arc<Semaphore>,
}

impl BatchRunner {
    pub fn new() -> Self {
        Self::with_workers(DEFAULT_WORKERS)
    }

    pub fn with_workers(workers: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(workers.max(1))),
        }
    }

    pub async fn run<S: Store + Send + Sync + 'static>(
        &self,
        pipeline: &Pipeline<S>,
        kind: ItemKind,
        ids: Vec<i64>,
    ) -> BatchReport {
        let mut handles = Vec::new();

        for id in ids {
            let pipeline = pipeline.clone();
            let semaphore = self.semaphore.clone();

            let handle = tokio::spawn(async move {
                match semaphore.acquire_owned().await {
                    Ok(_permit) => pipeline.acquire_and_generate(kind, id).await,
                    Err(e) => Err(LowdownError::Acquisition(format!("worker pool closed: {}", e))),
                }
            });

            handles.push((id, handle));
        }

        let mut results = Vec::with_capacity(handles.len());
        for (id, handle) in handles {
            match handle.await {
                Ok(result) => results.push((id, result)),
                Err(e) => {
                    tracing::error!("Task join error for {} {}: {}", kind, id, e);
                    results.push((id, Err(LowdownError::Task(e.to_string()))));
                }
            }
        }

        BatchReport { results }
    }
}

impl Default for BatchRunner {
    fn default() -> Self {
        Self::new()
    }
}
