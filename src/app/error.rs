use thiserror::Error;

use crate::domain::{ItemKind, ItemStatus};

#[derive(Error, Debug)]
pub enum LowdownError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] rusqlite_migration::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{kind} with URL {url} already exists")]
    Conflict { kind: ItemKind, url: String },

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: i64 },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Cannot move from '{from}' to '{to}'")]
    InvalidTransition { from: ItemStatus, to: ItemStatus },

    #[error("No content found at URL")]
    NoContent,

    #[error("Acquisition failed: {0}")]
    Acquisition(String),

    #[error("Scraper error: {0}")]
    Scraper(String),

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Task failed: {0}")]
    Task(String),
}

impl LowdownError {
    pub fn not_found(kind: ItemKind, id: i64) -> Self {
        LowdownError::NotFound {
            kind: kind.label(),
            id,
        }
    }

    pub fn poisoned<E: std::fmt::Display>(e: E) -> Self {
        LowdownError::Database(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(1),
            Some(e.to_string()),
        ))
    }

    /// True for errors a caller can expect to see on a well-formed request.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            LowdownError::Conflict { .. }
                | LowdownError::NotFound { .. }
                | LowdownError::Validation(_)
                | LowdownError::InvalidTransition { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, LowdownError>;
