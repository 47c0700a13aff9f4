use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::app::{LowdownError, Result};
use crate::domain::ItemKind;

/// Pipeline status of an article or snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Pending,
    Summarized,
    Highlighted,
    Accepted,
    ScrapingFailed,
    AiFailed,
    ContentFailed,
    Archived,
}

pub const ALL_STATUSES: [ItemStatus; 8] = [
    ItemStatus::Pending,
    ItemStatus::Summarized,
    ItemStatus::Highlighted,
    ItemStatus::Accepted,
    ItemStatus::ScrapingFailed,
    ItemStatus::AiFailed,
    ItemStatus::ContentFailed,
    ItemStatus::Archived,
];

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Pending => "pending",
            ItemStatus::Summarized => "summarized",
            ItemStatus::Highlighted => "highlighted",
            ItemStatus::Accepted => "accepted",
            ItemStatus::ScrapingFailed => "scraping_failed",
            ItemStatus::AiFailed => "ai_failed",
            ItemStatus::ContentFailed => "content_failed",
            ItemStatus::Archived => "archived",
        }
    }

    pub fn is_active(&self) -> bool {
        *self != ItemStatus::Archived
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            ItemStatus::ScrapingFailed | ItemStatus::AiFailed | ItemStatus::ContentFailed
        )
    }

    /// Statuses from which the acquisition/generation pipeline may run.
    pub fn accepts_pipeline(&self) -> bool {
        *self == ItemStatus::Pending || self.is_failure()
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemStatus {
    type Err = LowdownError;

    fn from_str(s: &str) -> Result<Self> {
        ALL_STATUSES
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| LowdownError::Validation(format!("unknown status '{}'", s)))
    }
}

/// Whether `kind` items may move from `from` to `to`.
///
/// The generated status is kind-specific: articles become `summarized`,
/// snapshots become `highlighted`. `archived` is terminal here; leaving it
/// happens only through resurrection on re-import.
pub fn can_transition(kind: ItemKind, from: ItemStatus, to: ItemStatus) -> bool {
    use ItemStatus::*;

    let generated = kind.generated_status();

    if to == Archived {
        return from.is_active();
    }

    match from {
        Pending | ScrapingFailed | AiFailed | ContentFailed => {
            to == generated || matches!(to, ScrapingFailed | AiFailed | ContentFailed)
        }
        Summarized | Highlighted => from == generated && to == Accepted,
        Accepted => to == generated,
        Archived => false,
    }
}

pub fn check_transition(kind: ItemKind, from: ItemStatus, to: ItemStatus) -> Result<()> {
    if can_transition(kind, from, to) {
        Ok(())
    } else {
        Err(LowdownError::InvalidTransition { from, to })
    }
}

/// Whether a curator may set `to` by hand: accept, un-accept or archive.
///
/// Generated and failure statuses are reached only by recording a pipeline
/// outcome, so a hand edit can never produce one without its text.
pub fn can_curate(kind: ItemKind, from: ItemStatus, to: ItemStatus) -> bool {
    let generated = kind.generated_status();
    let curator_edge = to == ItemStatus::Archived
        || (from == generated && to == ItemStatus::Accepted)
        || (from == ItemStatus::Accepted && to == generated);

    curator_edge && can_transition(kind, from, to)
}

pub fn check_curator_transition(kind: ItemKind, from: ItemStatus, to: ItemStatus) -> Result<()> {
    if can_curate(kind, from, to) {
        Ok(())
    } else {
        Err(LowdownError::InvalidTransition { from, to })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ItemStatus::*;

    #[test]
    fn test_status_round_trips_through_str() {
        for status in ALL_STATUSES {
            assert_eq!(status.as_str().parse::<ItemStatus>().unwrap(), status);
        }
        assert!("deleted".parse::<ItemStatus>().is_err());
    }

    #[test]
    fn test_pending_outcomes() {
        let kind = ItemKind::Article;
        assert!(can_transition(kind, Pending, Summarized));
        assert!(can_transition(kind, Pending, ScrapingFailed));
        assert!(can_transition(kind, Pending, AiFailed));
        assert!(can_transition(kind, Pending, ContentFailed));
        assert!(!can_transition(kind, Pending, Accepted));
        assert!(!can_transition(kind, Pending, Highlighted));
    }

    #[test]
    fn test_snapshot_generated_status_is_highlighted() {
        let kind = ItemKind::Snapshot;
        assert!(can_transition(kind, Pending, Highlighted));
        assert!(!can_transition(kind, Pending, Summarized));
        assert!(can_transition(kind, Highlighted, Accepted));
        assert!(can_transition(kind, Accepted, Highlighted));
        assert!(!can_transition(kind, Accepted, Summarized));
    }

    #[test]
    fn test_failures_recover_through_generation() {
        let kind = ItemKind::Article;
        for failed in [ScrapingFailed, AiFailed, ContentFailed] {
            assert!(can_transition(kind, failed, Summarized));
            assert!(!can_transition(kind, failed, Accepted));
        }
    }

    #[test]
    fn test_accept_and_unaccept_are_symmetric() {
        let kind = ItemKind::Article;
        assert!(can_transition(kind, Summarized, Accepted));
        assert!(can_transition(kind, Accepted, Summarized));
        assert!(!can_transition(kind, Summarized, Pending));
    }

    #[test]
    fn test_any_active_status_archives() {
        for kind in [ItemKind::Article, ItemKind::Snapshot] {
            for status in ALL_STATUSES.into_iter().filter(ItemStatus::is_active) {
                assert!(can_transition(kind, status, Archived), "{status} -> archived");
            }
        }
    }

    #[test]
    fn test_curator_cannot_set_pipeline_statuses() {
        let kind = ItemKind::Article;
        assert!(!can_curate(kind, Pending, Summarized));
        assert!(!can_curate(kind, Pending, ScrapingFailed));
        assert!(!can_curate(kind, AiFailed, Summarized));
        assert!(!can_curate(kind, Pending, ContentFailed));

        assert!(can_curate(kind, Summarized, Accepted));
        assert!(can_curate(kind, Accepted, Summarized));
        assert!(can_curate(kind, Pending, Archived));
        assert!(can_curate(kind, AiFailed, Archived));
        assert!(!can_curate(kind, Archived, Archived));

        let snapshot = ItemKind::Snapshot;
        assert!(can_curate(snapshot, Highlighted, Accepted));
        assert!(!can_curate(snapshot, Pending, Highlighted));
    }

    #[test]
    fn test_archived_is_terminal() {
        for kind in [ItemKind::Article, ItemKind::Snapshot] {
            for to in ALL_STATUSES {
                assert!(!can_transition(kind, Archived, to));
            }
        }
        let err = check_transition(ItemKind::Article, Archived, Accepted).unwrap_err();
        assert!(matches!(
            err,
            LowdownError::InvalidTransition {
                from: Archived,
                to: Accepted
            }
        ));
    }
}
