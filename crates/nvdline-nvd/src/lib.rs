//! nvdline NVD - incremental NVD REST API pipeline
//!
//! Fetches CVE (or CPE) records modified since the last successful run,
//! normalizes them into flat rows and appends them to a CSV file, then
//! advances a last-modified checkpoint.
//!
//! # Example
//!
//! ```ignore
//! use nvdline_nvd::{Config, FetchArgs, run};
//!
//! let config = Config::try_from(FetchArgs {
//!     api_key: std::env::var("NVD_API_KEY").ok(),
//!     ..Default::default()
//! })?;
//! let summary = run(&config, &nvdline_core::ProgressContext::hidden())?;
//! println!("{} rows written", summary.rows_written);
//! ```

pub mod api;
pub mod checkpoint;
pub mod config;
pub mod feed;
pub mod fetcher;
pub mod normalize;
pub mod runner;
pub mod schema;
pub mod writer;

// Re-exports
pub use api::{HttpPageSource, Page, PageQuery, PageSource, TimeWindow};
pub use checkpoint::CheckpointStore;
pub use config::{Config, ConfigError, FetchArgs};
pub use feed::{Feed, Layout, Projection};
pub use fetcher::{Pacer, Paginator, SleepPacer};
pub use normalize::{NOT_AVAILABLE, Record, normalize};
pub use runner::{RunError, RunSummary, Stage, run, run_with};
pub use writer::{BatchWriter, WriteSummary};
