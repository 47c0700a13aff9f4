use crate::domain::{ItemKind, ItemStatus};

pub const NO_CONTENT_REASON: &str = "No content found at URL.";
pub const NO_MANUAL_CONTENT_REASON: &str = "No manual content provided.";

/// Result of running acquisition and generation for one item, recorded by
/// the store in a single transaction once the external calls are over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Generated {
        title: Option<String>,
        text: String,
        original_content: String,
    },
    Failed {
        status: ItemStatus,
        reason: String,
        original_content: Option<String>,
    },
}

impl Outcome {
    pub fn scraping_failed(reason: impl Into<String>) -> Self {
        Outcome::Failed {
            status: ItemStatus::ScrapingFailed,
            reason: reason.into(),
            original_content: None,
        }
    }

    /// Generation failed after content was acquired; the content is kept
    /// so a retry does not need to scrape again.
    pub fn ai_failed(reason: impl Into<String>, content: impl Into<String>) -> Self {
        Outcome::Failed {
            status: ItemStatus::AiFailed,
            reason: reason.into(),
            original_content: Some(content.into()),
        }
    }

    pub fn content_failed() -> Self {
        Outcome::Failed {
            status: ItemStatus::ContentFailed,
            reason: NO_MANUAL_CONTENT_REASON.into(),
            original_content: None,
        }
    }

    pub fn target_status(&self, kind: ItemKind) -> ItemStatus {
        match self {
            Outcome::Generated { .. } => kind.generated_status(),
            Outcome::Failed { status, .. } => *status,
        }
    }
}
