use std::path::PathBuf;

/// Configuration for loading one output CSV into SQLite.
#[derive(Debug, Clone)]
pub struct LoadConfig {
    /// CSV produced by the fetch pipeline (header row, all text)
    pub input: PathBuf,
    /// SQLite database file, created if missing
    pub db_path: PathBuf,
    /// Target table (sanitized before use)
    pub table: String,
}
