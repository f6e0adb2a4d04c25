//! fieldsync library root.
//! Exposes the CLI parser, the high-level `run()` function, and the
//! offline-first core (local store, hybrid writer, sync engine, status).

pub mod cli;
pub mod config;
pub mod core;
pub mod db;
pub mod errors;
pub mod models;
pub mod remote;
pub mod ui;
pub mod utils;

use clap::Parser;
use cli::parser::{Cli, Commands};
use config::Config;
use errors::AppResult;
use tracing_subscriber::EnvFilter;

/// Install the stderr subscriber; `RUST_LOG` overrides `default_filter`.
pub fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    // A second install (tests) is a no-op.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Central command dispatcher
pub async fn dispatch(cli: &Cli, cfg: &Config) -> AppResult<()> {
    match &cli.command {
        Commands::Init => cli::commands::init::handle(cli),
        Commands::Checkin { .. } | Commands::Checkout { .. } => {
            cli::commands::attendance::handle(&cli.command, cfg).await
        }
        Commands::Activity { .. } => cli::commands::activity::handle(&cli.command, cfg).await,
        Commands::Sync => cli::commands::sync::handle(cfg).await,
        Commands::Status => cli::commands::status::handle(cfg).await,
        Commands::Queue { action } => cli::commands::queue::handle(action, cfg),
        Commands::Palms { action } => cli::commands::palms::handle(action, cfg).await,
        Commands::Log { print } => cli::commands::log::handle(*print, cfg),
        Commands::Watch => cli::commands::watch::handle(cfg).await,
    }
}

/// Entry point used by main.rs
pub async fn run() -> AppResult<()> {
    let cli = Cli::parse();

    let default_filter = match cli.command {
        Commands::Watch => "warn,fieldsync=info",
        _ => "warn",
    };
    init_tracing(default_filter);

    // Load the configuration once, then apply command-line overrides.
    let mut cfg = Config::load()?;
    if let Some(custom_db) = &cli.db {
        cfg.database = custom_db.clone();
    }
    if let Some(url) = &cli.api_url {
        cfg.api_base_url = url.clone();
    }

    dispatch(&cli, &cfg).await
}
