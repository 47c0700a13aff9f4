use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::app::{LowdownError, Result};
use crate::domain::{Item, PodcastEpisode, Threat};

/// Publication state of a newsletter issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueStatus {
    #[default]
    Draft,
    Archived,
}

impl IssueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueStatus::Draft => "draft",
            IssueStatus::Archived => "archived",
        }
    }
}

impl fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IssueStatus {
    type Err = LowdownError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "draft" => Ok(IssueStatus::Draft),
            "archived" => Ok(IssueStatus::Archived),
            other => Err(LowdownError::Validation(format!(
                "unknown issue status '{}'",
                other
            ))),
        }
    }
}

/// A newsletter issue: a title, framing text and an ordered set of
/// articles, optionally featuring a threat and a podcast episode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub id: i64,
    pub title: String,
    pub intro_text: Option<String>,
    pub outro_text: Option<String>,
    pub featured_threat_id: Option<i64>,
    pub featured_podcast_id: Option<i64>,
    pub status: IssueStatus,
    pub publication_date: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An issue with its linked rows resolved, articles in link order.
#[derive(Debug, Clone)]
pub struct FullIssue {
    pub issue: Issue,
    pub articles: Vec<Item>,
    pub featured_threat: Option<Threat>,
    pub featured_podcast: Option<PodcastEpisode>,
}

#[derive(Debug, Clone, Default)]
pub struct NewIssue {
    pub title: String,
    pub intro_text: Option<String>,
    pub outro_text: Option<String>,
    pub featured_threat_id: Option<i64>,
    pub featured_podcast_id: Option<i64>,
    /// Defaults to the creation date, `YYYY-MM-DD`.
    pub publication_date: Option<String>,
    pub article_ids: Vec<i64>,
}

impl NewIssue {
    pub fn new(title: impl Into<String>, article_ids: Vec<i64>) -> Self {
        Self {
            title: title.into(),
            article_ids,
            ..Default::default()
        }
    }
}

/// Drop repeated ids, keeping the first occurrence.
pub(crate) fn dedup_ids(ids: &[i64]) -> Vec<i64> {
    let mut seen = std::collections::HashSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parses() {
        assert_eq!("draft".parse::<IssueStatus>().unwrap(), IssueStatus::Draft);
        assert_eq!(IssueStatus::Archived.to_string(), "archived");
        assert!("published".parse::<IssueStatus>().is_err());
    }

    #[test]
    fn test_dedup_ids_keeps_first_order() {
        assert_eq!(dedup_ids(&[3, 1, 3, 2, 1]), vec![3, 1, 2]);
        assert!(dedup_ids(&[]).is_empty());
    }
}
