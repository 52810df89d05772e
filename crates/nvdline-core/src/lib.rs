//! nvdline Core - Common infrastructure for vulnerability feed pipelines
//!
//! This crate provides reusable components for fetching paginated feeds,
//! handing rows between threads, and appending them to CSV files.

pub mod accumulator;
pub mod error;
pub mod handoff;
pub mod http;
pub mod logging;
pub mod progress;
pub mod sink;

// Re-exports for convenience
pub use accumulator::{DEFAULT_BATCH_SIZE, TextAccumulator};
pub use error::WriteError;
pub use handoff::{HandoffReceiver, HandoffSender, Message, RecvError, channel};
pub use http::{FetchError, HttpOptions, SHARED_RUNTIME, build_client};
pub use logging::{IndicatifLogger, init_logging};
pub use progress::{ProgressContext, SharedProgress};
pub use sink::{CsvSink, read_text_column, text_schema, text_schema_from_header};
