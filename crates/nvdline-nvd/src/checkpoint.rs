//! Last-modified watermark persisted as a one-row CSV

use std::fs;
use std::path::{Path, PathBuf};

use nvdline_core::{CsvSink, TextAccumulator, WriteError, read_text_column, text_schema};

use crate::normalize::NOT_AVAILABLE;
use crate::schema::LAST_MODIFIED_COLUMN;

/// Single column of the checkpoint file
pub const CHECKPOINT_COLUMN: &str = "last_modified";

/// Reads and overwrites the watermark file.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored watermark; `None` when the file is absent, empty or header-only.
    pub fn load(&self) -> Result<Option<String>, WriteError> {
        let values = read_text_column(&self.path, CHECKPOINT_COLUMN)?.unwrap_or_default();
        Ok(values.into_iter().find(|v| usable(v)))
    }

    /// Overwrite the watermark (tmp file, then rename).
    pub fn save(&self, value: &str) -> Result<(), WriteError> {
        let tmp = self.path.with_extension("csv.tmp");
        match fs::remove_file(&tmp) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(WriteError::io(&tmp, e)),
        }

        let mut acc = TextAccumulator::new(text_schema(&[CHECKPOINT_COLUMN]), 1);
        acc.push([value.to_string()]);
        let batch = acc.take_batch().map_err(|e| WriteError::arrow(&tmp, e))?;
        CsvSink::new(&tmp).append(&batch)?;

        fs::rename(&tmp, &self.path).map_err(|e| WriteError::io(&self.path, e))?;
        log::debug!("Checkpoint {} = {value}", self.path.display());
        Ok(())
    }
}

/// Maximum `Last Modified Date` in an output CSV.
///
/// ISO-8601 strings of one format order lexicographically in time order.
/// Sentinel and empty cells are ignored; `None` when nothing usable remains.
pub fn latest_modified(output: &Path) -> Result<Option<String>, WriteError> {
    let Some(values) = read_text_column(output, LAST_MODIFIED_COLUMN)? else {
        return Ok(None);
    };
    Ok(values.into_iter().filter(|v| usable(v)).max())
}

fn usable(value: &str) -> bool {
    !value.is_empty() && value != NOT_AVAILABLE
}
