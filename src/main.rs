use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use lowdown::app::AppContext;
use lowdown::cli::{commands, Cli, Commands};
use lowdown::config::Config;
use lowdown::domain::ItemKind;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let mut config = match cli.config {
        Some(ref path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(db) = cli.db {
        config.store.db_path = Some(db);
    }
    if let Some(workers) = cli.workers {
        config.batch.workers = workers;
    }

    let ctx = AppContext::new(config)?;

    match cli.command {
        Commands::Article { action } => {
            commands::run_item(&ctx, ItemKind::Article, action).await?;
        }
        Commands::Snapshot { action } => {
            commands::run_item(&ctx, ItemKind::Snapshot, action).await?;
        }
        Commands::Threat { action } => {
            commands::run_threat(&ctx, action)?;
        }
        Commands::Issue { action } => {
            commands::run_issue(&ctx, action)?;
        }
        Commands::Podcast { action } => {
            commands::run_podcast(&ctx, action)?;
        }
    }

    Ok(())
}
