//! Dedicated writer thread: drains the hand-off queue into CSV batches

use std::io;
use std::path::PathBuf;
use std::thread::JoinHandle;

use arrow::datatypes::SchemaRef;
use nvdline_core::{CsvSink, HandoffReceiver, Message, TextAccumulator, WriteError};

use crate::normalize::Record;

/// What the writer flushed before it saw end-of-stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteSummary {
    pub rows: usize,
    pub batches: usize,
}

/// Receives normalized records and appends them to the output CSV.
///
/// Buffers up to `batch_size` rows; flushes when full and once more on
/// end-of-stream. A failed flush is returned as is; its rows are lost.
pub struct BatchWriter {
    rx: HandoffReceiver<Record>,
    sink: CsvSink,
    acc: TextAccumulator,
}

impl BatchWriter {
    pub fn new(
        rx: HandoffReceiver<Record>,
        path: impl Into<PathBuf>,
        schema: SchemaRef,
        batch_size: usize,
    ) -> Self {
        Self {
            rx,
            sink: CsvSink::new(path),
            acc: TextAccumulator::new(schema, batch_size),
        }
    }

    /// Run on a named thread; join to get the summary.
    pub fn spawn(self) -> io::Result<JoinHandle<Result<WriteSummary, WriteError>>> {
        std::thread::Builder::new()
            .name("nvd-writer".into())
            .spawn(move || self.run())
    }

    /// Writer loop. Returns only after end-of-stream (or a failure).
    pub fn run(mut self) -> Result<WriteSummary, WriteError> {
        loop {
            match self.rx.recv() {
                Ok(Message::Item(record)) => {
                    self.acc.push(record.into_values());
                    if self.acc.is_full() {
                        self.flush()?;
                    }
                }
                Ok(Message::EndOfStream) => {
                    self.flush()?;
                    let summary = self.summary();
                    log::debug!(
                        "Writer done: {} rows in {} batches to {}",
                        summary.rows,
                        summary.batches,
                        self.sink.path().display()
                    );
                    return Ok(summary);
                }
                Err(e) => {
                    // Producer vanished; keep what arrived, then report
                    self.flush()?;
                    return Err(WriteError::io(
                        self.sink.path(),
                        io::Error::new(io::ErrorKind::BrokenPipe, e),
                    ));
                }
            }
        }
    }

    fn flush(&mut self) -> Result<(), WriteError> {
        if self.acc.is_empty() {
            return Ok(());
        }
        let batch = self
            .acc
            .take_batch()
            .map_err(|e| WriteError::arrow(self.sink.path(), e))?;
        let rows = self.sink.append(&batch)?;
        log::debug!("Flushed {rows} rows to {}", self.sink.path().display());
        Ok(())
    }

    fn summary(&self) -> WriteSummary {
        WriteSummary {
            rows: self.sink.rows_written(),
            batches: self.sink.flushes(),
        }
    }
}
