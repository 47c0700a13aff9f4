pub mod issue;
pub mod item;
pub mod outcome;
pub mod podcast;
pub mod status;
pub mod threat;

pub use issue::{FullIssue, Issue, IssueStatus, NewIssue};
pub use item::{Item, ItemKind, ItemUpdate, NewItem, DEFAULT_SOURCE};
pub use outcome::Outcome;
pub use podcast::{NewPodcastEpisode, PodcastEpisode, PodcastUpdate};
pub use status::{
    can_curate, can_transition, check_curator_transition, check_transition, ItemStatus,
};
pub use threat::{NewThreat, Threat, ThreatUpdate};
