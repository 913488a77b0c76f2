//! plexgram CLI entry point.
//!
//! Provides `start` to run the bot, `check` to verify the Plex connection,
//! and `search` to run a catalog search from the terminal.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use teloxide::Bot;
use tracing::info;

use plexgram::config::{self, Config, RuntimePaths};
use plexgram::credentials::{self, Credentials};
use plexgram::plex::{CatalogProvider, Category, PlexClient};
use plexgram::reports::ReportLog;
use plexgram::telegram::commands::{BotContext, SearchQuery};
use plexgram::telegram::delivery::{Deliverer, HttpImageProbe};
use plexgram::telegram::{self, TeloxideTransport};

/// plexgram, a Telegram bot for a Plex library.
#[derive(Parser)]
#[command(name = "plexgram", version, about)]
struct Cli {
    /// Path to `config.toml` (default: `~/.plexgram/config.toml`).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Available CLI subcommands.
#[derive(Subcommand)]
enum Command {
    /// Run the Telegram bot.
    Start,
    /// Check the Plex connection and configured sections, then exit.
    Check,
    /// Search the catalog and print the matches.
    Search {
        /// Title to look for, optionally followed by a year.
        query: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let paths = config::runtime_paths()?;

    match cli.command {
        Command::Start => handle_start(&paths, cli.config).await,
        Command::Check => handle_check(&paths, cli.config).await,
        Command::Search { query } => handle_search(&paths, cli.config, &query.join(" ")).await,
    }
}

/// Load config and credentials for any subcommand.
fn load(paths: &RuntimePaths, config_path: Option<PathBuf>) -> anyhow::Result<(Config, Credentials)> {
    let config_path = config_path.unwrap_or_else(|| paths.config_toml.clone());
    let config = config::load_config_or_default(&config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;
    let credentials = credentials::load_credentials(&paths.env_file)?;
    Ok((config, credentials))
}

fn build_catalog(config: &Config, credentials: &Credentials) -> anyhow::Result<PlexClient> {
    let url = config.plex.resolve_url(credentials)?;
    let token = credentials.require(&config.plex.token_env)?;
    PlexClient::new(
        &url,
        token,
        config.catalog.section_names(),
        config.plex.timeout(),
    )
    .context("failed to create Plex client")
}

/// Run the bot until Ctrl+C.
async fn handle_start(paths: &RuntimePaths, config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let _logging_guard = plexgram::logging::init_production(&paths.logs_dir)?;

    let (config, credentials) = load(paths, config_path)?;
    let catalog = Arc::new(build_catalog(&config, &credentials)?);

    let bot_token = credentials.require(&config.telegram.bot_token_env)?;
    let bot = Bot::new(bot_token);

    let probe = HttpImageProbe::new(
        config.delivery.image_timeout(),
        config.delivery.max_image_bytes,
    )
    .context("failed to create image probe")?;
    let deliverer = Deliverer::new(
        Arc::new(TeloxideTransport::new(bot.clone())),
        Arc::new(probe),
    );

    let reports_path = config
        .reports
        .path
        .clone()
        .unwrap_or_else(|| paths.reports_file.clone());
    let reports = Arc::new(ReportLog::new(reports_path));
    info!(path = %reports.path().display(), "report log");

    let mut ctx = BotContext::new(
        catalog,
        deliverer,
        reports,
        config.catalog.search_limits(),
    );
    if let Some(server_id) = config.plex.resolve_server_id(&credentials) {
        ctx = ctx.with_server_id(server_id);
    }

    info!(
        movies = %config.catalog.movies_section,
        shows = %config.catalog.shows_section,
        "plexgram starting"
    );
    telegram::run_telegram(bot, ctx).await
}

/// Verify the Plex connection and print section sizes.
async fn handle_check(paths: &RuntimePaths, config_path: Option<PathBuf>) -> anyhow::Result<()> {
    plexgram::logging::init_cli();

    let (config, credentials) = load(paths, config_path)?;
    let catalog = build_catalog(&config, &credentials)?;

    let server_id = catalog
        .server_id()
        .await
        .context("failed to reach Plex server")?;
    println!("server id: {server_id}");

    for category in Category::ALL {
        let section = catalog.sections().for_category(category);
        let items = catalog
            .list_by_category(category)
            .await
            .with_context(|| format!("failed to list section {section:?}"))?;
        println!("{section}: {} items", items.len());
    }
    Ok(())
}

/// Print exact matches for `query` in both categories.
async fn handle_search(
    paths: &RuntimePaths,
    config_path: Option<PathBuf>,
    query: &str,
) -> anyhow::Result<()> {
    plexgram::logging::init_cli();

    let (config, credentials) = load(paths, config_path)?;
    let catalog = build_catalog(&config, &credentials)?;
    let parsed = SearchQuery::parse(query);

    for category in Category::ALL {
        let items = catalog
            .search(
                category,
                &parsed.title,
                parsed.year,
                config.catalog.search_limit,
            )
            .await
            .context("search failed")?;
        for item in items {
            let year = item.year.map(|y| y.to_string()).unwrap_or_default();
            println!("[{}] {} ({year}) {}", category.as_str(), item.title, item.key);
        }
    }
    Ok(())
}
