//! Application configuration.
//!
//! Values are layered: built-in defaults, then `config.toml` under the user's
//! config directory, then `MINE_IDLER_*` environment variables.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Directory name used under the platform config/data roots.
pub const APP_DIR: &str = "mine-idler";
/// Name of the configuration file inside the config directory.
pub const CONFIG_FILE: &str = "config.toml";
/// Prefix of environment overrides, e.g. `MINE_IDLER_API_BASE_URL`.
pub const ENV_PREFIX: &str = "MINE_IDLER";

const DEFAULT_API_BASE_URL: &str = "http://localhost:5900";
const DEFAULT_IMAGE_BASE_URL: &str = "https://mine-idler.b-cdn.net/";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Runtime configuration for the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Base URL of the game API.
    pub api_base_url: String,
    /// CDN root for item and location artwork.
    pub image_base_url: String,
    /// Directory holding the session token and log files.
    pub data_dir: PathBuf,
    /// Deadline for unary calls, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            image_base_url: DEFAULT_IMAGE_BASE_URL.to_string(),
            data_dir: default_data_dir(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default file location and environment.
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path())
    }

    /// Load configuration layering `path` (if it exists) and the environment
    /// over the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        let defaults = Self::default();
        let settings = config::Config::builder()
            .set_default("api_base_url", defaults.api_base_url)?
            .set_default("image_base_url", defaults.image_base_url)?
            .set_default(
                "data_dir",
                defaults.data_dir.to_string_lossy().into_owned(),
            )?
            .set_default(
                "request_timeout_secs",
                defaults.request_timeout_secs as i64,
            )?
            .add_source(config::File::from(path).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .build()
            .with_context(|| format!("failed to read configuration from {}", path.display()))?;

        settings
            .try_deserialize()
            .context("failed to parse configuration")
    }

    /// Unary call deadline.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Full URL of an artwork asset hosted on the CDN.
    pub fn image_url(&self, asset: &str) -> String {
        format!(
            "{}/{}",
            self.image_base_url.trim_end_matches('/'),
            asset.trim_start_matches('/')
        )
    }
}

/// Default location of `config.toml`.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join(CONFIG_FILE)
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// Write a default `config.toml` if none exists yet.
pub fn ensure_default_config() -> Result<()> {
    write_default_config(&config_path())
}

fn write_default_config(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory {}", parent.display()))?;
    }
    let serialized =
        toml::to_string_pretty(&AppConfig::default()).context("failed to serialize config")?;
    fs::write(path, serialized)
        .with_context(|| format!("failed to write config {}", path.display()))?;
    info!("wrote default configuration to {}", path.display());
    Ok(())
}
