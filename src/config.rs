//! Configuration loading and validation.
//!
//! plexgram uses a split config model:
//! - `config.toml`: server address, section names, limits
//! - `.env`: secrets (bot token, Plex token), see [`crate::credentials`]
//!
//! Every section has defaults, so an absent or empty `config.toml` is valid.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;
use url::Url;

use crate::credentials::Credentials;
use crate::plex::client::SectionNames;
use crate::telegram::commands::SearchLimits;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Plex server connection.
    #[serde(default)]
    pub plex: PlexConfig,

    /// Telegram bot settings.
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Library section names and result limits.
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Image validation bounds.
    #[serde(default)]
    pub delivery: DeliveryConfig,

    /// Report log location.
    #[serde(default)]
    pub reports: ReportsConfig,
}

/// Plex server connection.
#[derive(Debug, Deserialize)]
pub struct PlexConfig {
    /// Server base URL. Falls back to the credential named by `url_env`.
    #[serde(default)]
    pub url: Option<String>,

    /// Credential holding the server URL when `url` is unset.
    #[serde(default = "default_plex_url_env")]
    pub url_env: String,

    /// Credential holding the Plex token.
    #[serde(default = "default_plex_token_env")]
    pub token_env: String,

    /// Server machine identifier for deep links. Fetched from the server when
    /// unset here and in the credential named by `server_id_env`.
    #[serde(default)]
    pub server_id: Option<String>,

    /// Credential holding the server id.
    #[serde(default = "default_plex_server_id_env")]
    pub server_id_env: String,

    /// Request timeout in seconds.
    #[serde(default = "default_plex_timeout")]
    pub timeout_secs: u64,
}

impl Default for PlexConfig {
    fn default() -> Self {
        Self {
            url: None,
            url_env: default_plex_url_env(),
            token_env: default_plex_token_env(),
            server_id: None,
            server_id_env: default_plex_server_id_env(),
            timeout_secs: default_plex_timeout(),
        }
    }
}

impl PlexConfig {
    /// Resolve the server URL from config or credentials.
    ///
    /// # Errors
    ///
    /// Returns an error if no URL is configured or it does not parse.
    pub fn resolve_url(&self, credentials: &Credentials) -> anyhow::Result<Url> {
        let raw = match self.url.as_deref() {
            Some(url) => url.to_owned(),
            None => credentials.require(&self.url_env)?,
        };
        Url::parse(&raw).with_context(|| format!("invalid Plex URL: {raw}"))
    }

    /// Server id from config or credentials, if pinned.
    pub fn resolve_server_id(&self, credentials: &Credentials) -> Option<String> {
        self.server_id
            .clone()
            .or_else(|| credentials.get(&self.server_id_env))
            .filter(|id| !id.trim().is_empty())
    }

    /// Request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Telegram bot settings.
#[derive(Debug, Deserialize)]
pub struct TelegramConfig {
    /// Credential holding the bot token.
    #[serde(default = "default_bot_token_env")]
    pub bot_token_env: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token_env: default_bot_token_env(),
        }
    }
}

/// Library section names and result limits.
///
/// Section names are whatever the server calls them; they are not fixed by Plex.
#[derive(Debug, Deserialize)]
pub struct CatalogConfig {
    /// Section holding movies.
    #[serde(default = "default_movies_section")]
    pub movies_section: String,

    /// Section holding shows.
    #[serde(default = "default_shows_section")]
    pub shows_section: String,

    /// Exact search hits shown per category.
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,

    /// Loose suggestions shown per category.
    #[serde(default = "default_search_limit")]
    pub suggestion_limit: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            movies_section: default_movies_section(),
            shows_section: default_shows_section(),
            search_limit: default_search_limit(),
            suggestion_limit: default_search_limit(),
        }
    }
}

impl CatalogConfig {
    /// Section names for the Plex client.
    pub fn section_names(&self) -> SectionNames {
        SectionNames {
            movies: self.movies_section.clone(),
            shows: self.shows_section.clone(),
        }
    }

    /// Search bounds for the command handlers.
    pub fn search_limits(&self) -> SearchLimits {
        SearchLimits {
            results: self.search_limit,
            suggestions: self.suggestion_limit,
        }
    }
}

/// Image validation bounds.
#[derive(Debug, Deserialize)]
pub struct DeliveryConfig {
    /// Timeout for the thumbnail fetch, in seconds.
    #[serde(default = "default_image_timeout")]
    pub image_timeout_secs: u64,

    /// Largest thumbnail accepted, in bytes.
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: usize,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            image_timeout_secs: default_image_timeout(),
            max_image_bytes: default_max_image_bytes(),
        }
    }
}

impl DeliveryConfig {
    /// Thumbnail fetch timeout.
    pub fn image_timeout(&self) -> Duration {
        Duration::from_secs(self.image_timeout_secs)
    }
}

/// Report log location.
#[derive(Debug, Default, Deserialize)]
pub struct ReportsConfig {
    /// Log file path. Defaults to `reportes.txt` in the runtime directory.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

// Default value functions for serde

fn default_plex_url_env() -> String {
    "PLEX_URL".to_owned()
}
fn default_plex_token_env() -> String {
    "PLEX_TOKEN".to_owned()
}
fn default_plex_server_id_env() -> String {
    "PLEX_SERVER_ID".to_owned()
}
fn default_plex_timeout() -> u64 {
    10
}
fn default_bot_token_env() -> String {
    "TELEGRAM_TOKEN".to_owned()
}
fn default_movies_section() -> String {
    "Películas".to_owned()
}
fn default_shows_section() -> String {
    "Series".to_owned()
}
fn default_search_limit() -> usize {
    3
}
fn default_image_timeout() -> u64 {
    5
}
fn default_max_image_bytes() -> usize {
    10_485_760
}

/// Filesystem locations used at runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimePaths {
    /// Root directory (`~/.plexgram`).
    pub root: PathBuf,
    /// Default `config.toml`.
    pub config_toml: PathBuf,
    /// Default `.env`.
    pub env_file: PathBuf,
    /// Log directory.
    pub logs_dir: PathBuf,
    /// Default report log.
    pub reports_file: PathBuf,
}

impl RuntimePaths {
    /// Lay out runtime paths under `root`.
    pub fn under(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            config_toml: root.join("config.toml"),
            env_file: root.join(".env"),
            logs_dir: root.join("logs"),
            reports_file: root.join("reportes.txt"),
            root,
        }
    }
}

/// Resolve the default config directory (`~/.plexgram/`).
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn config_dir() -> anyhow::Result<PathBuf> {
    let home = directories::BaseDirs::new()
        .ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
    Ok(home.home_dir().join(".plexgram"))
}

/// Runtime paths under [`config_dir`].
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn runtime_paths() -> anyhow::Result<RuntimePaths> {
    Ok(RuntimePaths::under(config_dir()?))
}

/// Load configuration from a TOML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config at {}", path.display()))?;
    let config: Config = toml::from_str(&contents)
        .with_context(|| format!("failed to parse config at {}", path.display()))?;
    Ok(config)
}

/// Load configuration, using defaults when `path` does not exist.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_config_or_default(path: &Path) -> anyhow::Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        Ok(Config::default())
    }
}
