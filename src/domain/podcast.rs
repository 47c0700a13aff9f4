use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::app::{LowdownError, Result};

/// A podcast episode that an issue can feature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PodcastEpisode {
    pub id: i64,
    pub title: String,
    pub podcast_url: String,
    pub description: Option<String>,
    pub published_date: Option<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PodcastEpisode {
    /// Markdown block for an issue export.
    pub fn feature_block(&self) -> String {
        let body = self.description.as_deref().map(str::trim).unwrap_or("");
        format!("## 🎙️ Podcast Episode: {}\n\n{}", self.title.trim(), body)
            .trim_end()
            .to_string()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewPodcastEpisode {
    pub title: String,
    pub podcast_url: String,
    pub description: Option<String>,
    pub published_date: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct PodcastUpdate {
    pub title: Option<String>,
    pub podcast_url: Option<String>,
    pub description: Option<String>,
    pub published_date: Option<String>,
    pub image_url: Option<String>,
}

pub(crate) fn validate_title(title: &str) -> Result<&str> {
    let title = title.trim();
    if title.is_empty() {
        return Err(LowdownError::Validation("title cannot be empty".into()));
    }
    Ok(title)
}

/// Episode links must be absolute http(s) URLs.
pub(crate) fn validate_podcast_url(raw: &str) -> Result<&str> {
    let trimmed = raw.trim();
    let parsed = url::Url::parse(trimmed)?;
    match parsed.scheme() {
        "http" | "https" => Ok(trimmed),
        scheme => Err(LowdownError::Validation(format!(
            "unsupported URL scheme '{}'",
            scheme
        ))),
    }
}
