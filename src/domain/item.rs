use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::app::{LowdownError, Result};
use crate::domain::ItemStatus;

pub const DEFAULT_SOURCE: &str = "manual_add";

/// The two curated entity types. They share one lifecycle and differ in
/// table, generated status and the name of their generated text column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Article,
    Snapshot,
}

impl ItemKind {
    pub fn table(&self) -> &'static str {
        match self {
            ItemKind::Article => "articles",
            ItemKind::Snapshot => "snapshots",
        }
    }

    /// Column holding the generated text: `summary` or `highlight`.
    pub fn text_column(&self) -> &'static str {
        match self {
            ItemKind::Article => "summary",
            ItemKind::Snapshot => "highlight",
        }
    }

    pub fn generated_status(&self) -> ItemStatus {
        match self {
            ItemKind::Article => ItemStatus::Summarized,
            ItemKind::Snapshot => ItemStatus::Highlighted,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ItemKind::Article => "Article",
            ItemKind::Snapshot => "Snapshot",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ItemKind {
    type Err = LowdownError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "article" | "articles" => Ok(ItemKind::Article),
            "snapshot" | "snapshots" => Ok(ItemKind::Snapshot),
            other => Err(LowdownError::Validation(format!("unknown kind '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: i64,
    pub kind: ItemKind,
    pub url: String,
    pub title: String,
    pub source: String,
    /// Summary for articles, highlight for snapshots. Holds the failure
    /// reason while the item sits in a failed status.
    pub summary: Option<String>,
    pub original_content: Option<String>,
    pub status: ItemStatus,
    pub position: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Item {
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// The title is unresolved until something better than the URL is known.
    pub fn has_unresolved_title(&self) -> bool {
        self.title.trim().is_empty() || self.title == self.url
    }

    /// Generated text suitable for export, if the item has any.
    pub fn export_text(&self) -> Option<&str> {
        self.summary
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Input for creating (or resurrecting) an item.
#[derive(Debug, Clone, Default)]
pub struct NewItem {
    pub url: String,
    pub title: Option<String>,
    pub source: Option<String>,
    pub summary: Option<String>,
}

impl NewItem {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Trim and validate the URL; it must be absolute http(s).
    pub fn normalized_url(&self) -> Result<String> {
        let trimmed = self.url.trim();
        if trimmed.is_empty() {
            return Err(LowdownError::Validation("URL cannot be empty".into()));
        }
        let parsed = url::Url::parse(trimmed)?;
        match parsed.scheme() {
            "http" | "https" => Ok(trimmed.to_string()),
            scheme => Err(LowdownError::Validation(format!(
                "unsupported URL scheme '{}'",
                scheme
            ))),
        }
    }

    pub fn resolved_title(&self, url: &str) -> String {
        self.title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(url)
            .to_string()
    }

    pub fn resolved_source(&self) -> String {
        self.source
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_SOURCE)
            .to_string()
    }
}

/// Whitelisted partial update. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct ItemUpdate {
    pub url: Option<String>,
    pub title: Option<String>,
    pub source: Option<String>,
    pub summary: Option<String>,
    pub original_content: Option<String>,
    pub status: Option<ItemStatus>,
    pub position: Option<i64>,
}

impl ItemUpdate {
    pub fn is_empty(&self) -> bool {
        self.url.is_none()
            && self.title.is_none()
            && self.source.is_none()
            && self.summary.is_none()
            && self.original_content.is_none()
            && self.status.is_none()
            && self.position.is_none()
    }

    pub fn status(status: ItemStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(url: &str, title: &str) -> Item {
        Item {
            id: 1,
            kind: ItemKind::Article,
            url: url.into(),
            title: title.into(),
            source: DEFAULT_SOURCE.into(),
            summary: None,
            original_content: None,
            status: ItemStatus::Pending,
            position: 1,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_kind_columns() {
        assert_eq!(ItemKind::Article.table(), "articles");
        assert_eq!(ItemKind::Article.text_column(), "summary");
        assert_eq!(ItemKind::Snapshot.table(), "snapshots");
        assert_eq!(ItemKind::Snapshot.text_column(), "highlight");
    }

    #[test]
    fn test_kind_parses_plural() {
        assert_eq!("Snapshots".parse::<ItemKind>().unwrap(), ItemKind::Snapshot);
        assert!("threat".parse::<ItemKind>().is_err());
    }

    #[test]
    fn test_normalized_url_trims() {
        let new = NewItem::new("  https://example.com/a  ");
        assert_eq!(new.normalized_url().unwrap(), "https://example.com/a");
    }

    #[test]
    fn test_normalized_url_rejects_non_http() {
        assert!(NewItem::new("ftp://example.com/a").normalized_url().is_err());
        assert!(NewItem::new("not a url").normalized_url().is_err());
        assert!(NewItem::new("   ").normalized_url().is_err());
    }

    #[test]
    fn test_title_defaults_to_url() {
        let new = NewItem::new("https://example.com/a").with_title("  ");
        assert_eq!(new.resolved_title("https://example.com/a"), "https://example.com/a");
        assert_eq!(new.resolved_source(), DEFAULT_SOURCE);
    }

    #[test]
    fn test_unresolved_title() {
        assert!(item("https://e.com/a", "https://e.com/a").has_unresolved_title());
        assert!(item("https://e.com/a", "").has_unresolved_title());
        assert!(!item("https://e.com/a", "Real title").has_unresolved_title());
    }

    #[test]
    fn test_export_text_skips_blank() {
        let mut it = item("https://e.com/a", "t");
        assert_eq!(it.export_text(), None);
        it.summary = Some("   \n".into());
        assert_eq!(it.export_text(), None);
        it.summary = Some("  body \n".into());
        assert_eq!(it.export_text(), Some("body"));
    }
}
