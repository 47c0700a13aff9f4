//! Summarization and highlight generation through an external text model.
//!
//! The model is asked for a labelled reply (see [`response`]) so headline and
//! body are parsed deterministically; anything else is a
//! [`LowdownError::Generation`](crate::app::LowdownError::Generation).

mod chat;
mod config;
pub mod response;

pub use chat::ChatGenerator;
pub use config::GeneratorConfig;

use async_trait::async_trait;

use crate::app::Result;
use crate::domain::ItemKind;

/// A parsed generation result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generated {
    /// Plain-text headline.
    pub headline: String,
    /// Summary body (articles) or formatted highlight (snapshots).
    pub body: String,
}

#[async_trait]
pub trait Generator: Send + Sync {
    /// Headline plus a multi-sentence summary for an article.
    async fn summarize(&self, title: &str, content: &str, url: &str) -> Result<Generated>;

    /// Headline plus a one-sentence highlight for a snapshot.
    async fn highlight(&self, title: &str, content: &str, url: &str) -> Result<Generated>;

    async fn generate(
        &self,
        kind: ItemKind,
        title: &str,
        content: &str,
        url: &str,
    ) -> Result<Generated> {
        match kind {
            ItemKind::Article => self.summarize(title, content, url).await,
            ItemKind::Snapshot => self.highlight(title, content, url).await,
        }
    }
}
