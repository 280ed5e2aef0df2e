use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use chrono_tz::Tz;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::duration::{deserialize_duration, serialize_duration};

/// Largest page the upstream API accepts.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Hard ceiling on pages fetched per collection, whatever `max_pages` says.
pub const PAGE_LIMIT_CEILING: u32 = 10_000;

fn default_einvoice_base_url() -> String {
    "https://api.nes.com.tr/einvoice/v1".to_string()
}

fn default_earchive_base_url() -> String {
    "https://api.nes.com.tr/earchive/v1".to_string()
}

fn default_sort() -> String {
    "CreatedAt desc".to_string()
}

fn default_epoch_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or_default()
}

/// Upstream (Nesten) API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NestenConfig {
    /// Base URL of the e-Invoice API (incoming, outgoing and draft collections).
    pub einvoice_base_url: String,

    /// Base URL of the e-Archive API.
    pub earchive_base_url: String,

    /// Records requested per page. Clamped to `1..=MAX_PAGE_SIZE`.
    pub page_size: u32,

    pub sort: String,

    /// Page requests of one collection in flight at once.
    pub page_concurrency: usize,

    /// Pages fetched per collection at most; a larger upstream `totalCount`
    /// is truncated with a warning.
    pub max_pages: u32,

    /// How far before the last watermark an incremental fetch starts, to catch
    /// records straddling the boundary.
    #[serde(
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub sync_overlap: Duration,

    /// Window start used for a stream that has never been synchronized.
    pub epoch_start: NaiveDate,

    /// Per-request timeout; expiry is reported as an upstream failure.
    #[serde(
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub request_timeout: Duration,
}

impl Default for NestenConfig {
    fn default() -> Self {
        Self {
            einvoice_base_url: default_einvoice_base_url(),
            earchive_base_url: default_earchive_base_url(),
            page_size: MAX_PAGE_SIZE,
            sort: default_sort(),
            page_concurrency: 8,
            max_pages: 1_000,
            sync_overlap: Duration::from_secs(24 * 60 * 60),
            epoch_start: default_epoch_start(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl NestenConfig {
    pub fn effective_page_size(&self) -> u32 {
        self.page_size.clamp(1, MAX_PAGE_SIZE)
    }

    pub fn effective_page_concurrency(&self) -> usize {
        self.page_concurrency.max(1)
    }

    pub fn effective_max_pages(&self) -> u32 {
        self.max_pages.clamp(1, PAGE_LIMIT_CEILING)
    }
}

/// Presentation and heuristic settings for dashboards and reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub currency_symbol: String,

    /// Share of incoming invoices assumed collected. There is no payment
    /// status in the upstream data, so the collection rate is an estimate.
    pub collection_rate_factor: Decimal,

    /// IANA zone used to assign invoices to calendar months.
    pub timezone: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            currency_symbol: "₺".to_string(),
            collection_rate_factor: Decimal::new(92, 2),
            timezone: "Europe/Istanbul".to_string(),
        }
    }
}

impl DisplayConfig {
    pub fn tz(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| anyhow!("Invalid timezone {:?}: {e}", self.timezone))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3202".to_string(),
        }
    }
}

/// Application configuration as written in `faturabia.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage root. If relative, resolved from the config file location.
    pub data_dir: Option<PathBuf>,

    pub nesten: NestenConfig,

    pub display: DisplayConfig,

    pub server: ServerConfig,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn resolve_data_dir(&self, config_dir: &Path) -> PathBuf {
        match &self.data_dir {
            Some(data_dir) if data_dir.is_absolute() => data_dir.clone(),
            Some(data_dir) => config_dir.join(data_dir),
            None => config_dir.join("data"),
        }
    }
}

/// Configuration with paths resolved and environment overrides applied.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedConfig {
    pub data_dir: PathBuf,
    pub nesten: NestenConfig,
    pub display: DisplayConfig,
    pub server: ServerConfig,
}

/// Returns the default config file path.
///
/// `./faturabia.toml` when present, otherwise the XDG data directory.
pub fn default_config_path() -> PathBuf {
    let local_config = PathBuf::from("faturabia.toml");
    if local_config.exists() {
        return local_config;
    }

    if let Some(data_dir) = dirs::data_dir() {
        return data_dir.join("faturabia").join("faturabia.toml");
    }

    local_config
}

impl ResolvedConfig {
    pub fn load(config_path: &Path) -> Result<Self> {
        let config_path = config_path
            .canonicalize()
            .with_context(|| format!("Config file not found: {}", config_path.display()))?;
        let config_dir = config_path
            .parent()
            .context("Config file has no parent directory")?;

        let config = Config::load(&config_path)?;
        Ok(Self::from_config(config, config_dir))
    }

    /// Load the config file, or fall back to defaults rooted at the directory
    /// the file would live in.
    pub fn load_or_default(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            return Self::load(config_path);
        }

        let config_path = if config_path.is_relative() {
            std::env::current_dir()
                .context("Failed to get current directory")?
                .join(config_path)
        } else {
            config_path.to_path_buf()
        };
        let config_dir = config_path
            .parent()
            .context("Config path has no parent directory")?;

        Ok(Self::from_config(Config::default(), config_dir))
    }

    fn from_config(config: Config, config_dir: &Path) -> Self {
        Self {
            data_dir: config.resolve_data_dir(config_dir),
            nesten: config.nesten,
            display: config.display,
            server: config.server,
        }
    }

    /// Apply deployment overrides from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(dir) = lookup("FATURABIA_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(bind) = lookup("FATURABIA_BIND") {
            self.server.bind = bind;
        }
        if let Some(url) = lookup("NESTEN_EINVOICE_URL") {
            self.nesten.einvoice_base_url = url;
        }
        if let Some(url) = lookup("NESTEN_EARCHIVE_URL") {
            self.nesten.earchive_base_url = url;
        }
        self
    }
}
