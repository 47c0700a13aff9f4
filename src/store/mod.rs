pub mod newsletter;
pub mod ordering;
pub mod sqlite;

use crate::app::Result;
use crate::domain::{
    FullIssue, Issue, Item, ItemKind, ItemStatus, ItemUpdate, NewIssue, NewItem,
    NewPodcastEpisode, NewThreat, Outcome, PodcastEpisode, PodcastUpdate, Threat, ThreatUpdate,
};

pub use sqlite::SqliteStore;

/// Persistence contract for curated items, threats, podcast episodes and
/// newsletter issues.
///
/// Each method is one logical operation: implementations must apply it
/// atomically so the active ordering of a kind is always `1..=N`.
pub trait Store {
    // Item operations

    /// Insert a pending item at the end of the list. An active item with the
    /// same URL is a conflict; an archived one is resurrected in place.
    fn create_item(&self, kind: ItemKind, item: &NewItem) -> Result<Item>;
    fn get_item(&self, kind: ItemKind, id: i64) -> Result<Option<Item>>;
    fn list_active(&self, kind: ItemKind) -> Result<Vec<Item>>;
    fn list_archived(&self, kind: ItemKind) -> Result<Vec<Item>>;
    fn list_by_status(&self, kind: ItemKind, status: ItemStatus) -> Result<Vec<Item>>;
    fn update_item(&self, kind: ItemKind, id: i64, update: &ItemUpdate) -> Result<Item>;
    fn delete_item(&self, kind: ItemKind, id: i64) -> Result<bool>;

    // Lifecycle and ordering

    /// Curator status change: accept, un-accept or archive. Generated and
    /// failure statuses are only reachable through [`Store::record_outcome`].
    fn transition(&self, kind: ItemKind, id: i64, to: ItemStatus) -> Result<Item>;
    fn record_outcome(&self, kind: ItemKind, id: i64, outcome: &Outcome) -> Result<Item>;
    fn archive_accepted(&self, kind: ItemKind) -> Result<usize>;
    fn move_item(&self, kind: ItemKind, id: i64, position: i64) -> Result<Item>;
    /// Move relative to the current position; clamps at either end.
    fn shift_item(&self, kind: ItemKind, id: i64, delta: i64) -> Result<Item>;
    fn reindex(&self, kind: ItemKind) -> Result<usize>;

    // Threat operations
    fn add_threat(&self, threat: &NewThreat) -> Result<Threat>;
    fn get_threat(&self, id: i64) -> Result<Option<Threat>>;
    fn list_threats(&self) -> Result<Vec<Threat>>;
    fn update_threat(&self, id: i64, update: &ThreatUpdate) -> Result<Threat>;
    fn delete_threat(&self, id: i64) -> Result<bool>;

    // Podcast operations
    fn add_podcast(&self, episode: &NewPodcastEpisode) -> Result<PodcastEpisode>;
    fn get_podcast(&self, id: i64) -> Result<Option<PodcastEpisode>>;
    fn list_podcasts(&self) -> Result<Vec<PodcastEpisode>>;
    fn update_podcast(&self, id: i64, update: &PodcastUpdate) -> Result<PodcastEpisode>;
    /// Delete an episode and clear it from any issue featuring it.
    fn delete_podcast(&self, id: i64) -> Result<bool>;

    // Newsletter issues

    /// Create a draft issue linking `issue.article_ids` in the given order.
    fn create_issue(&self, issue: &NewIssue) -> Result<Issue>;
    fn get_issue(&self, id: i64) -> Result<Option<FullIssue>>;
    fn list_issues(&self) -> Result<Vec<Issue>>;
    /// Link more articles to a draft issue; returns how many were new.
    fn add_issue_articles(&self, id: i64, article_ids: &[i64]) -> Result<usize>;
    /// Archive an issue together with its linked articles. Returns the number
    /// of articles archived.
    fn archive_issue(&self, id: i64) -> Result<usize>;

    fn move_up(&self, kind: ItemKind, id: i64) -> Result<Item> {
        self.shift_item(kind, id, -1)
    }

    fn move_down(&self, kind: ItemKind, id: i64) -> Result<Item> {
        self.shift_item(kind, id, 1)
    }
}
