//! `nvdline.toml`: file defaults for every subcommand.
//!
//! ```toml
//! [output]
//! default_dir = "./data"
//!
//! [nvd]
//! api_key = "${NVD_API_KEY}"
//! page_size = 2000
//! request_delay_secs = 6
//!
//! [database]
//! path = "./data/nvd.db"
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use nvdline_nvd::Feed;
use serde::{Deserialize, Deserializer};

/// Environment variable holding the NVD API key
pub const API_KEY_ENV: &str = "NVD_API_KEY";

const LOCAL_FILE: &str = "nvdline.toml";

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub output: OutputConfig,
    pub nvd: NvdConfig,
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Where data and checkpoint CSVs live
    pub default_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            default_dir: "./data".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NvdConfig {
    pub cve_url: String,
    pub cpe_url: String,
    /// Literal key or `${VAR}`; unset falls back to `NVD_API_KEY`
    #[serde(deserialize_with = "secret")]
    pub api_key: Option<String>,
    pub page_size: u32,
    pub request_delay_secs: u64,
    /// Unset or 0: no whole-request timeout
    pub request_timeout_secs: Option<u64>,
    pub batch_size: usize,
    pub accept_invalid_certs: bool,
}

impl Default for NvdConfig {
    fn default() -> Self {
        Self {
            cve_url: Feed::Cves.default_url().into(),
            cpe_url: Feed::Cpes.default_url().into(),
            api_key: std::env::var(API_KEY_ENV).ok(),
            page_size: nvdline_nvd::fetcher::DEFAULT_PAGE_SIZE,
            request_delay_secs: nvdline_nvd::fetcher::DEFAULT_REQUEST_DELAY.as_secs(),
            request_timeout_secs: None,
            batch_size: nvdline_core::DEFAULT_BATCH_SIZE,
            accept_invalid_certs: false,
        }
    }
}

impl NvdConfig {
    pub fn url_for(&self, feed: Feed) -> &str {
        match feed {
            Feed::Cves => &self.cve_url,
            Feed::Cpes => &self.cpe_url,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "./data/nvd.db".into(),
        }
    }
}

fn secret<'de, D: Deserializer<'de>>(de: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<String>::deserialize(de)?.and_then(|raw| lookup(&raw)))
}

/// `${NAME}` reads the environment; anything else is taken literally.
fn lookup(raw: &str) -> Option<String> {
    match raw.strip_prefix("${").and_then(|rest| rest.strip_suffix('}')) {
        Some(name) => std::env::var(name).ok(),
        None => Some(raw.to_owned()),
    }
}

/// Files consulted when `--config` is absent, in order.
fn search_path() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(LOCAL_FILE)];
    if let Some(dirs) = directories::ProjectDirs::from("", "", "nvdline") {
        paths.push(dirs.config_dir().join("config.toml"));
    }
    paths
}

impl Config {
    /// `explicit` must exist; otherwise the first file on the search path
    /// wins, and with none present the defaults apply.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        match search_path().into_iter().find(|p| p.is_file()) {
            Some(path) => Self::from_file(&path),
            None => {
                log::debug!("No nvdline.toml found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read {}", path.display()))?;
        let config = toml::from_str(&text)
            .with_context(|| format!("Invalid config in {}", path.display()))?;
        log::info!("Using config {}", path.display());
        Ok(config)
    }
}
