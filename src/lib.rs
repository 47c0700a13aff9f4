//! # Lowdown
//!
//! Content pipeline for a curated newsletter: collect story URLs, scrape
//! them, have a text model write a summary or one-line highlight, curate the
//! order, and export the accepted set as paste-ready markdown.
//!
//! ## Architecture
//!
//! ```text
//! URL → Store (pending) → Acquirer → Generator → Store (summarized)
//!     → curation (accept / move) → Export
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! lowdown article add https://example.com/story
//! lowdown article summarize 1
//! lowdown article accept 1
//! lowdown article export > issue.md
//! ```

/// Application context and error handling.
///
/// [`AppContext`](app::AppContext) wires the store to the configured
/// acquisition and generation adapters.
pub mod app;

/// Command-line interface using clap.
pub mod cli;

/// Configuration loaded from `~/.config/lowdown/config.toml`.
pub mod config;

/// Core domain models.
///
/// - [`Item`](domain::Item): an article or snapshot
/// - [`ItemStatus`](domain::ItemStatus): lifecycle states and transitions
/// - [`Threat`](domain::Threat): threat profiles for the analysis block
/// - [`Issue`](domain::Issue): a newsletter issue and its linked articles
/// - [`PodcastEpisode`](domain::PodcastEpisode): episodes featured in an issue
pub mod domain;

/// Export Assembler for item lists and newsletter issues.
pub mod export;

/// Summarization and highlight generation.
///
/// - [`Generator`](generator::Generator): async trait for text generation
/// - [`ChatGenerator`](generator::ChatGenerator): OpenAI-compatible implementation
pub mod generator;

/// Acquisition and generation driver, single item and batch.
pub mod pipeline;

/// Content acquisition from the web.
///
/// - [`Acquirer`](scraper::Acquirer): async trait for acquisition
/// - [`HttpScraper`](scraper::HttpScraper): reqwest-based implementation
/// - [`ChromeScraper`](scraper::ChromeScraper): headless Chrome implementation
pub mod scraper;

/// SQLite persistence layer.
///
/// - [`Store`](store::Store): trait defining storage operations
/// - [`SqliteStore`](store::SqliteStore): SQLite implementation
pub mod store;
