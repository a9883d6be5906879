mod commands;

use std::{
    fs::{self, OpenOptions},
    path::Path,
    sync::Mutex,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{prelude::*, EnvFilter};
use mine_idler_core::{
    config::{self, AppConfig},
    AppContext,
};

/// Command-line client for Mine Idler.
#[derive(Debug, Parser)]
#[command(name = "mine-idler", version, about)]
struct Cli {
    /// Override the API endpoint from the configuration.
    #[arg(long, env = "MINE_IDLER_API_BASE_URL", global = true)]
    api: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Log in and store the session token.
    Login { username: String, password: String },
    /// Create an account and store the session token.
    Register { username: String, password: String },
    /// Forget the stored session token.
    Logout,
    /// Load the game state and print a summary.
    Status {
        /// Print machine-readable JSON.
        #[arg(long)]
        json: bool,
    },
    /// Show the public hiscore table.
    Hiscores,
    /// List inventory items.
    Inventory {
        #[arg(long, default_value_t = 20)]
        page_size: u32,
        #[arg(long, default_value_t = 0)]
        page: u32,
        #[arg(long, value_enum, default_value_t = commands::SortKey::Date)]
        sort: commands::SortKey,
        /// Sort ascending instead of descending.
        #[arg(long)]
        ascending: bool,
    },
    /// Show base upgrades.
    Base,
    /// Upgrade storage capacity.
    Upgrade,
    /// Mine at a location and print loot as it arrives.
    Mine {
        location: String,
        /// Stop after this many drops.
        #[arg(long)]
        count: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    config::ensure_default_config()?;
    let mut config = AppConfig::load()?;
    if let Some(api) = cli.api {
        config.api_base_url = api;
    }
    init_logging(&config.data_dir)?;

    let app = AppContext::connect(config)?;
    commands::run(&app, cli.command).await
}

fn init_logging(data_dir: &Path) -> Result<()> {
    let log_dir = data_dir.join("logs");
    fs::create_dir_all(&log_dir)
        .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;
    let log_path = log_dir.join("mine-idler.log");
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open log file {}", log_path.display()))?;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .compact()
        .with_writer(std::io::stderr);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(false)
        .compact()
        .with_writer(Mutex::new(log_file));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Ok(())
}
