use std::path::PathBuf;
use std::sync::Arc;

use crate::app::error::{LowdownError, Result};
use crate::config::Config;
use crate::generator::{ChatGenerator, Generator};
use crate::pipeline::{BatchRunner, Pipeline};
use crate::scraper::build_acquirer;
use crate::store::sqlite::SqliteStore;

/// Wires the store to the configured adapters.
///
/// The acquirer and generator are built on demand by [`AppContext::pipeline`]
/// so commands that only touch the store never launch a browser.
pub struct AppContext {
    pub store: Arc<SqliteStore>,
    pub config: Config,
    pub batch: BatchRunner,
}

impl AppContext {
    pub fn new(config: Config) -> Result<Self> {
        let db_path = match config.store.db_path.clone() {
            Some(p) => p,
            None => Self::default_db_path()?,
        };
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let store = Arc::new(SqliteStore::new(&db_path)?);
        Ok(Self::with_store(store, config))
    }

    pub fn in_memory(config: Config) -> Result<Self> {
        let store = Arc::new(SqliteStore::in_memory()?);
        Ok(Self::with_store(store, config))
    }

    fn with_store(store: Arc<SqliteStore>, config: Config) -> Self {
        let batch = BatchRunner::with_workers(config.batch.workers);
        Self {
            store,
            config,
            batch,
        }
    }

    pub async fn pipeline(&self) -> Result<Pipeline<SqliteStore>> {
        let acquirer = build_acquirer(&self.config.scraper).await?;
        let generator: Arc<dyn Generator> =
            Arc::new(ChatGenerator::new(self.config.generator.clone())?);
        Ok(Pipeline::new(self.store.clone(), acquirer, generator))
    }

    fn default_db_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| LowdownError::Config("Could not find data directory".into()))?;
        Ok(data_dir.join("lowdown").join("lowdown.db"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::domain::{ItemKind, NewItem};
    use crate::store::Store;

    #[test]
    fn test_new_creates_database_directory() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("data").join("lowdown.db");
        let config = Config {
            store: StoreConfig {
                db_path: Some(db_path.clone()),
            },
            ..Default::default()
        };

        let ctx = AppContext::new(config).unwrap();
        ctx.store
            .create_item(ItemKind::Article, &NewItem::new("https://example.com/a"))
            .unwrap();
        assert!(db_path.exists());
    }

    #[tokio::test]
    async fn test_pipeline_builds_with_http_backend() {
        let ctx = AppContext::in_memory(Config::default()).unwrap();
        assert!(ctx.pipeline().await.is_ok());
    }
}
