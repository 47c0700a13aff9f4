pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::domain::ItemStatus;
use crate::export::ExportFormat;

#[derive(Parser)]
#[command(name = "lowdown")]
#[command(about = "Curate, summarize and export newsletter stories", long_about = None)]
pub struct Cli {
    /// Database file (overrides the config file)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Config file (default: ~/.config/lowdown/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Number of items processed at once by process-pending
    #[arg(short, long, global = true)]
    pub workers: Option<usize>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Curate articles (summarized stories)
    Article {
        #[command(subcommand)]
        action: ItemAction,
    },
    /// Curate snapshots (one-sentence highlights)
    Snapshot {
        #[command(subcommand)]
        action: ItemAction,
    },
    /// Manage threat profiles
    Threat {
        #[command(subcommand)]
        action: ThreatAction,
    },
    /// Assemble, export and archive newsletter issues
    Issue {
        #[command(subcommand)]
        action: IssueAction,
    },
    /// Manage podcast episodes
    Podcast {
        #[command(subcommand)]
        action: PodcastAction,
    },
}

#[derive(Subcommand)]
pub enum ItemAction {
    /// Add a URL to the end of the list
    Add {
        url: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        source: Option<String>,
    },
    /// Add every URL in a file, one per line (# starts a comment)
    Import {
        path: PathBuf,
        #[arg(long)]
        source: Option<String>,
    },
    /// List active items in position order
    List {
        /// List archived items instead, newest first
        #[arg(long)]
        archived: bool,
        /// Only items with this status
        #[arg(long, conflicts_with = "archived")]
        status: Option<ItemStatus>,
    },
    /// Show one item in full
    Show { id: i64 },
    /// Change fields of an item
    Edit {
        id: i64,
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        source: Option<String>,
        /// Replace the summary (articles) or highlight (snapshots)
        #[arg(long)]
        summary: Option<String>,
        #[arg(long)]
        status: Option<ItemStatus>,
        #[arg(long)]
        position: Option<i64>,
    },
    /// Delete an item permanently
    Delete { id: i64 },
    /// Move an item to a position (clamped to the list)
    Move { id: i64, position: i64 },
    /// Move an item one place up
    Up { id: i64 },
    /// Move an item one place down
    Down { id: i64 },
    /// Mark a generated item as accepted for export
    Accept { id: i64 },
    /// Return an accepted item to its generated status
    Unaccept { id: i64 },
    /// Archive an item
    Archive { id: i64 },
    /// Archive every accepted item
    ArchiveAccepted,
    /// Scrape the URL and generate the summary or highlight
    Summarize { id: i64 },
    /// Generate from pasted content instead of scraping
    SummarizeManual {
        id: i64,
        #[arg(long, conflicts_with = "file", required_unless_present = "file")]
        content: Option<String>,
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Summarize every pending item
    ProcessPending,
    /// Repair positions to 1..N
    Reindex,
    /// Print accepted items assembled for the newsletter
    Export {
        /// newsletter, highlights or transcript
        #[arg(long)]
        format: Option<ExportFormat>,
        /// File appended verbatim after the items
        #[arg(long, conflicts_with = "threat")]
        appendix: Option<PathBuf>,
        /// Append the analysis block of a stored threat
        #[arg(long)]
        threat: Option<i64>,
        /// Archive the exported items afterwards
        #[arg(long)]
        archive: bool,
    },
}

#[derive(Subcommand)]
pub enum ThreatAction {
    /// Record a threat profile
    Add {
        name: String,
        #[arg(long = "type")]
        threat_type: Option<String>,
        #[arg(long)]
        country: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// JSON object, e.g. '{"range":"400 km"}'
        #[arg(long)]
        specs: Option<String>,
        /// Comma-separated list of operating countries
        #[arg(long)]
        operators: Option<String>,
    },
    /// List threats, newest first
    List,
    /// Show one threat in full
    Show { id: i64 },
    /// Change fields of a threat
    Edit {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long = "type")]
        threat_type: Option<String>,
        #[arg(long)]
        country: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        specs: Option<String>,
        #[arg(long)]
        ioc_year: Option<i64>,
        #[arg(long)]
        operators: Option<String>,
        #[arg(long)]
        image_url: Option<String>,
        #[arg(long)]
        status: Option<String>,
        /// Threat-of-the-day text used in exports
        #[arg(long)]
        tod_summary: Option<String>,
    },
    /// Delete a threat
    Delete { id: i64 },
}

#[derive(Subcommand)]
pub enum IssueAction {
    /// Create a draft issue from article ids
    Create {
        title: String,
        /// Comma-separated article ids, in issue order
        #[arg(long, value_delimiter = ',', required_unless_present = "accepted")]
        articles: Vec<i64>,
        /// Use every accepted article, in position order
        #[arg(long, conflicts_with = "articles")]
        accepted: bool,
        #[arg(long)]
        intro: Option<String>,
        #[arg(long)]
        outro: Option<String>,
        /// Featured threat id
        #[arg(long)]
        threat: Option<i64>,
        /// Featured podcast episode id
        #[arg(long)]
        podcast: Option<i64>,
        /// Publication date (default: today)
        #[arg(long)]
        date: Option<String>,
    },
    /// List issues, newest first
    List,
    /// Show an issue and its articles
    Show { id: i64 },
    /// Append articles to a draft issue
    AddArticles {
        id: i64,
        #[arg(value_delimiter = ',', required = true)]
        articles: Vec<i64>,
    },
    /// Archive an issue and its articles
    Archive { id: i64 },
    /// Print the issue as markdown
    Export {
        id: i64,
        /// Archive the issue and its articles afterwards
        #[arg(long)]
        archive: bool,
    },
}

#[derive(Subcommand)]
pub enum PodcastAction {
    /// Record a podcast episode
    Add {
        title: String,
        url: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        published: Option<String>,
        #[arg(long)]
        image_url: Option<String>,
    },
    /// List episodes, newest first
    List,
    /// Show one episode
    Show { id: i64 },
    /// Change fields of an episode
    Edit {
        id: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        published: Option<String>,
        #[arg(long)]
        image_url: Option<String>,
    },
    /// Delete an episode and unlink it from issues
    Delete { id: i64 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_item_commands() {
        let cli = Cli::parse_from(["lowdown", "--db", "x.db", "article", "move", "4", "2"]);
        assert_eq!(cli.db, Some(PathBuf::from("x.db")));
        assert!(matches!(
            cli.command,
            Commands::Article {
                action: ItemAction::Move { id: 4, position: 2 }
            }
        ));

        let cli = Cli::parse_from(["lowdown", "snapshot", "list", "--status", "highlighted"]);
        assert!(matches!(
            cli.command,
            Commands::Snapshot {
                action: ItemAction::List {
                    archived: false,
                    status: Some(ItemStatus::Highlighted)
                }
            }
        ));
    }

    #[test]
    fn test_summarize_manual_needs_content() {
        assert!(Cli::try_parse_from(["lowdown", "article", "summarize-manual", "1"]).is_err());
        assert!(Cli::try_parse_from([
            "lowdown",
            "article",
            "summarize-manual",
            "1",
            "--content",
            "text"
        ])
        .is_ok());
    }

    #[test]
    fn test_parse_issue_commands() {
        let cli = Cli::parse_from([
            "lowdown", "issue", "create", "Issue 42", "--articles", "3,1,2", "--threat", "5",
        ]);
        match cli.command {
            Commands::Issue {
                action:
                    IssueAction::Create {
                        title,
                        articles,
                        accepted,
                        threat,
                        ..
                    },
            } => {
                assert_eq!(title, "Issue 42");
                assert_eq!(articles, vec![3, 1, 2]);
                assert!(!accepted);
                assert_eq!(threat, Some(5));
            }
            _ => panic!("expected issue create"),
        }

        assert!(Cli::try_parse_from(["lowdown", "issue", "create", "Empty"]).is_err());
        assert!(Cli::try_parse_from(["lowdown", "issue", "create", "All", "--accepted"]).is_ok());
        assert!(Cli::try_parse_from(["lowdown", "issue", "add-articles", "1"]).is_err());
    }

    #[test]
    fn test_export_format_flag() {
        let cli = Cli::parse_from(["lowdown", "article", "export", "--format", "transcript"]);
        assert!(matches!(
            cli.command,
            Commands::Article {
                action: ItemAction::Export {
                    format: Some(ExportFormat::Transcript),
                    ..
                }
            }
        ));
    }
}
