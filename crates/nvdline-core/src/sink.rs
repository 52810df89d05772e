//! Append-only CSV sink and read-back helpers

use std::fs::{File, OpenOptions};
use std::io::{BufReader, Seek, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{AsArray, RecordBatch};
use arrow::csv::reader::Format;
use arrow::csv::{ReaderBuilder, WriterBuilder};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};

use crate::error::WriteError;

/// Rows per batch when reading a CSV back
const READ_BATCH_SIZE: usize = 8192;

/// All-`Utf8`, nullable schema for the given column names.
pub fn text_schema(columns: &[&str]) -> SchemaRef {
    Arc::new(Schema::new(
        columns
            .iter()
            .map(|name| Field::new(*name, DataType::Utf8, true))
            .collect::<Vec<_>>(),
    ))
}

/// Appends record batches to a CSV file.
///
/// The header row is written only when the file is absent (or empty) at the
/// moment of the append, so repeated runs against the same file never duplicate it.
/// Appending to a file whose header names other columns is refused before
/// anything is written.
pub struct CsvSink {
    path: PathBuf,
    rows_written: usize,
    flushes: usize,
    header_checked: bool,
}

impl std::fmt::Debug for CsvSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsvSink")
            .field("path", &self.path)
            .field("rows_written", &self.rows_written)
            .finish_non_exhaustive()
    }
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            rows_written: 0,
            flushes: 0,
            header_checked: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a batch as one write.
    ///
    /// The batch is encoded in memory first and then written with a single
    /// `write_all`, so an encoding error never leaves a partial row on disk.
    pub fn append(&mut self, batch: &RecordBatch) -> Result<usize, WriteError> {
        if batch.num_rows() == 0 {
            return Ok(0);
        }
        let needs_header = match std::fs::metadata(&self.path) {
            Ok(meta) => meta.len() == 0,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
            Err(e) => return Err(WriteError::io(&self.path, e)),
        };
        if !needs_header {
            self.check_header(batch.schema_ref())?;
        }

        let mut writer = WriterBuilder::new()
            .with_header(needs_header)
            .build(Vec::with_capacity(batch.get_array_memory_size()));
        writer
            .write(batch)
            .map_err(|e| WriteError::arrow(&self.path, e))?;
        let encoded = writer.into_inner();

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| WriteError::io(&self.path, e))?;
        file.write_all(&encoded)
            .and_then(|()| file.flush())
            .map_err(|e| WriteError::io(&self.path, e))?;

        self.rows_written += batch.num_rows();
        self.flushes += 1;
        self.header_checked = true;
        if needs_header {
            log::debug!("Created {} with header", self.path.display());
        }
        Ok(batch.num_rows())
    }

    /// Compare the existing file's header with the batch columns, once per sink.
    fn check_header(&mut self, schema: &Schema) -> Result<(), WriteError> {
        if self.header_checked {
            return Ok(());
        }
        let existing = text_schema_from_header(&self.path)?;
        let names = |s: &Schema| -> Vec<String> {
            s.fields().iter().map(|f| f.name().clone()).collect()
        };
        let (expected, found) = (names(schema), names(existing.as_ref()));
        if expected != found {
            return Err(WriteError::HeaderMismatch {
                path: self.path.clone(),
                expected,
                found,
            });
        }
        self.header_checked = true;
        Ok(())
    }

    /// Total rows appended through this sink
    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    /// Number of successful appends
    pub fn flushes(&self) -> usize {
        self.flushes
    }
}

/// Build an all-`Utf8` schema from the header row of an existing CSV file.
pub fn text_schema_from_header(path: &Path) -> Result<SchemaRef, WriteError> {
    let mut file = File::open(path).map_err(|e| WriteError::io(path, e))?;
    let (inferred, _) = Format::default()
        .with_header(true)
        .infer_schema(&mut file, Some(1))
        .map_err(|e| WriteError::arrow(path, e))?;
    file.rewind().map_err(|e| WriteError::io(path, e))?;
    let names: Vec<&str> = inferred.fields().iter().map(|f| f.name().as_str()).collect();
    Ok(text_schema(&names))
}

/// Read every batch of a headered CSV file as all-`Utf8` columns.
pub fn read_text_batches(path: &Path) -> Result<(SchemaRef, Vec<RecordBatch>), WriteError> {
    let schema = text_schema_from_header(path)?;
    let file = File::open(path).map_err(|e| WriteError::io(path, e))?;
    let reader = ReaderBuilder::new(schema.clone())
        .with_header(true)
        .with_batch_size(READ_BATCH_SIZE)
        .build(BufReader::new(file))
        .map_err(|e| WriteError::arrow(path, e))?;
    let batches = reader
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| WriteError::arrow(path, e))?;
    Ok((schema, batches))
}

/// Read one named column of a headered CSV file.
///
/// Returns `Ok(None)` when the file does not exist or has no such column.
/// Empty cells are skipped.
pub fn read_text_column(path: &Path, column: &str) -> Result<Option<Vec<String>>, WriteError> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.len() == 0 => return Ok(None),
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(WriteError::io(path, e)),
    }
    let (schema, batches) = read_text_batches(path)?;
    let Ok(idx) = schema.index_of(column) else {
        return Ok(None);
    };
    let values = batches
        .iter()
        .flat_map(|batch| {
            batch
                .column(idx)
                .as_string::<i32>()
                .iter()
                .flatten()
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect();
    Ok(Some(values))
}
