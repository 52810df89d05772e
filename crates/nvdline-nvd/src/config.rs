//! NVD fetch configuration

use std::path::PathBuf;
use std::time::Duration;

use nvdline_core::{DEFAULT_BATCH_SIZE, HttpOptions};

use crate::feed::{Feed, Layout, Projection};
use crate::fetcher::{DEFAULT_PAGE_SIZE, DEFAULT_REQUEST_DELAY};

/// CLI-facing arguments for the fetch command (plain struct, no clap derive).
#[derive(Debug, Clone)]
pub struct FetchArgs {
    pub feed: Feed,
    pub projection: Projection,
    /// Overrides the feed's default endpoint
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub output_dir: PathBuf,
    pub page_size: u32,
    pub request_delay_secs: u64,
    /// Whole-request timeout; `None` waits as long as the server keeps the connection
    pub request_timeout_secs: Option<u64>,
    pub batch_size: usize,
    pub accept_invalid_certs: bool,
}

impl Default for FetchArgs {
    fn default() -> Self {
        Self {
            feed: Feed::Cves,
            projection: Projection::default(),
            endpoint: None,
            api_key: None,
            output_dir: PathBuf::from("./data"),
            page_size: DEFAULT_PAGE_SIZE,
            request_delay_secs: DEFAULT_REQUEST_DELAY.as_secs(),
            request_timeout_secs: None,
            batch_size: DEFAULT_BATCH_SIZE,
            accept_invalid_certs: false,
        }
    }
}

/// Rejected before any network activity
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    MissingApiKey,
    InvalidPageSize(u32),
    InvalidBatchSize,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingApiKey => f.write_str(
                "NVD API key is not set (set NVD_API_KEY or [nvd] api_key in the config file)",
            ),
            Self::InvalidPageSize(n) => {
                write!(f, "page size must be between 1 and {DEFAULT_PAGE_SIZE}, got {n}")
            }
            Self::InvalidBatchSize => f.write_str("batch size must be at least 1"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Runtime configuration for one fetch run
#[derive(Clone)]
pub struct Config {
    pub feed: Feed,
    pub projection: Projection,
    pub endpoint: String,
    pub api_key: String,
    pub output_path: PathBuf,
    pub checkpoint_path: PathBuf,
    pub page_size: u32,
    pub request_delay: Duration,
    pub request_timeout: Option<Duration>,
    pub batch_size: usize,
    /// Disables TLS verification; logged loudly when the client is built
    pub accept_invalid_certs: bool,
}

impl Config {
    pub fn layout(&self) -> Layout {
        Layout::new(self.feed, self.projection)
    }

    pub fn http_options(&self) -> HttpOptions {
        HttpOptions {
            accept_invalid_certs: self.accept_invalid_certs,
            request_timeout: self.request_timeout,
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("feed", &self.feed)
            .field("projection", &self.projection)
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .field("output_path", &self.output_path)
            .field("checkpoint_path", &self.checkpoint_path)
            .field("page_size", &self.page_size)
            .field("request_delay", &self.request_delay)
            .field("request_timeout", &self.request_timeout)
            .field("batch_size", &self.batch_size)
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .finish()
    }
}

impl TryFrom<FetchArgs> for Config {
    type Error = ConfigError;

    fn try_from(args: FetchArgs) -> Result<Self, Self::Error> {
        let api_key = args
            .api_key
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or(ConfigError::MissingApiKey)?;
        if args.page_size == 0 || args.page_size > DEFAULT_PAGE_SIZE {
            return Err(ConfigError::InvalidPageSize(args.page_size));
        }
        if args.batch_size == 0 {
            return Err(ConfigError::InvalidBatchSize);
        }

        let layout = Layout::new(args.feed, args.projection);
        Ok(Self {
            feed: args.feed,
            projection: args.projection,
            endpoint: args
                .endpoint
                .unwrap_or_else(|| args.feed.default_url().to_string()),
            api_key,
            output_path: args.output_dir.join(layout.output_file()),
            checkpoint_path: args.output_dir.join(layout.checkpoint_file()),
            page_size: args.page_size,
            request_delay: Duration::from_secs(args.request_delay_secs),
            request_timeout: args
                .request_timeout_secs
                .filter(|&s| s > 0)
                .map(Duration::from_secs),
            batch_size: args.batch_size,
            accept_invalid_certs: args.accept_invalid_certs,
        })
    }
}
