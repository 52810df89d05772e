//! Error type for CSV sink writes

use std::path::{Path, PathBuf};

use arrow::error::ArrowError;

/// Error from appending a batch to (or reading back) an output file.
///
/// Always carries the path so the operator can tell which file failed.
#[derive(Debug)]
pub enum WriteError {
    Io { path: PathBuf, source: std::io::Error },
    Arrow { path: PathBuf, source: ArrowError },
    /// Existing file's header names other columns than the rows being appended
    HeaderMismatch {
        path: PathBuf,
        expected: Vec<String>,
        found: Vec<String>,
    },
}

impl WriteError {
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn arrow(path: &Path, source: ArrowError) -> Self {
        Self::Arrow {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::Io { path, .. } | Self::Arrow { path, .. } | Self::HeaderMismatch { path, .. } => {
                path
            }
        }
    }
}

impl std::fmt::Display for WriteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "IO on {}: {source}", path.display()),
            Self::Arrow { path, source } => write!(f, "CSV on {}: {source}", path.display()),
            Self::HeaderMismatch {
                path,
                expected,
                found,
            } => write!(
                f,
                "header of {} has {} columns ({}), rows have {} ({})",
                path.display(),
                found.len(),
                found.join(", "),
                expected.len(),
                expected.join(", ")
            ),
        }
    }
}

impl std::error::Error for WriteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Arrow { source, .. } => Some(source),
            Self::HeaderMismatch { .. } => None,
        }
    }
}
