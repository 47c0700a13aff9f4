//! Acquisition and generation for single items, plus the batch driver.
//!
//! External calls run with no store lock held. Their result is folded into
//! an [`Outcome`] and written by [`Store::record_outcome`] in one
//! transaction, which re-checks the lifecycle in case the item changed while
//! the calls were in flight.

mod batch;

pub use batch::{BatchReport, BatchRunner, DEFAULT_WORKERS};

use std::sync::Arc;

use tracing::{info, warn};

use crate::app::{LowdownError, Result};
use crate::domain::outcome::NO_CONTENT_REASON;
use crate::domain::{can_transition, Item, ItemKind, ItemStatus, Outcome};
use crate::generator::Generator;
use crate::scraper::Acquirer;
use crate::store::Store;

pub struct Pipeline<S> {
    store: Arc<S>,
    acquirer: Arc<dyn Acquirer>,
    generator: Arc<dyn Generator>,
}

impl<S> Clone for Pipeline<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            acquirer: self.acquirer.clone(),
            generator: self.generator.clone(),
        }
    }
}

impl<S: Store + Send + Sync + 'static> Pipeline<S> {
    pub fn new(store: Arc<S>, acquirer: Arc<dyn Acquirer>, generator: Arc<dyn Generator>) -> Self {
        Self {
            store,
            acquirer,
            generator,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    fn load(&self, kind: ItemKind, id: i64) -> Result<Item> {
        let item = self
            .store
            .get_item(kind, id)?
            .ok_or_else(|| LowdownError::not_found(kind, id))?;

        if !item.status.accepts_pipeline() {
            return Err(LowdownError::InvalidTransition {
                from: item.status,
                to: kind.generated_status(),
            });
        }
        Ok(item)
    }

    /// Scrape the item's URL, generate from the text and record the result.
    ///
    /// Stage failures are not errors here: they land on the item as
    /// `scraping_failed` / `ai_failed` with the reason in its text field, and
    /// the updated item is returned.
    pub async fn acquire_and_generate(&self, kind: ItemKind, id: i64) -> Result<Item> {
        let item = self.load(kind, id)?;
        info!("Acquiring {} {} from {}", kind, id, item.url);

        let outcome = match self.acquirer.acquire(&item.url).await {
            Ok(content) => self.generate(&item, content).await,
            Err(LowdownError::NoContent) => Outcome::scraping_failed(NO_CONTENT_REASON),
            Err(e) => Outcome::scraping_failed(format!("Scraping error: {}", e)),
        };

        self.record(kind, id, outcome)
    }

    /// Generate from caller-supplied text, skipping acquisition.
    ///
    /// Blank content marks the item `content_failed` (when its status allows
    /// it) and is still reported to the caller as a validation error.
    pub async fn generate_from_manual(
        &self,
        kind: ItemKind,
        id: i64,
        content: &str,
    ) -> Result<Item> {
        let content = content.trim();
        if content.is_empty() {
            let item = self
                .store
                .get_item(kind, id)?
                .ok_or_else(|| LowdownError::not_found(kind, id))?;
            if can_transition(kind, item.status, ItemStatus::ContentFailed) {
                self.store
                    .record_outcome(kind, id, &Outcome::content_failed())?;
            }
            return Err(LowdownError::Validation(
                "manual content cannot be empty".into(),
            ));
        }

        let item = self.load(kind, id)?;
        info!("Generating {} {} from {} chars of manual content", kind, id, content.len());

        let outcome = self.generate(&item, content.to_string()).await;
        self.record(kind, id, outcome)
    }

    /// Run every pending item of `kind` through the pipeline.
    pub async fn process_pending(&self, kind: ItemKind, runner: &BatchRunner) -> Result<BatchReport> {
        let ids: Vec<i64> = self
            .store
            .list_by_status(kind, ItemStatus::Pending)?
            .into_iter()
            .map(|item| item.id)
            .collect();

        info!("Processing {} pending {} items", ids.len(), kind);
        Ok(runner.run(self, kind, ids).await)
    }

    async fn generate(&self, item: &Item, content: String) -> Outcome {
        let result = self
            .generator
            .generate(item.kind, &item.title, &content, &item.url)
            .await;

        match result {
            Ok(generated) => {
                let title = match item.kind {
                    ItemKind::Article => Some(generated.headline),
                    ItemKind::Snapshot if item.has_unresolved_title() => Some(generated.headline),
                    ItemKind::Snapshot => None,
                };
                Outcome::Generated {
                    title,
                    text: generated.body,
                    original_content: content,
                }
            }
            Err(e) => Outcome::ai_failed(format!("AI service error: {}", e), content),
        }
    }

    fn record(&self, kind: ItemKind, id: i64, outcome: Outcome) -> Result<Item> {
        if let Outcome::Failed { status, reason, .. } = &outcome {
            warn!("{} {} failed ({}): {}", kind, id, status, reason);
        }
        let item = self.store.record_outcome(kind, id, &outcome)?;
        info!("{} {} is now {}", kind, id, item.status);
        Ok(item)
    }
}
