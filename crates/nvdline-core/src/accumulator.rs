//! Row accumulator: buffers text rows and emits Arrow `RecordBatch`es

use std::sync::Arc;

use arrow::array::{ArrayRef, RecordBatch, StringArray};
use arrow::datatypes::SchemaRef;
use arrow::error::ArrowError;

/// Default number of rows per flushed batch.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Column-oriented buffer of string cells for a fixed all-`Utf8` schema.
pub struct TextAccumulator {
    schema: SchemaRef,
    columns: Vec<Vec<String>>,
    capacity: usize,
}

impl TextAccumulator {
    pub fn new(schema: SchemaRef, capacity: usize) -> Self {
        let width = schema.fields().len();
        Self {
            schema,
            columns: (0..width).map(|_| Vec::with_capacity(capacity)).collect(),
            capacity: capacity.max(1),
        }
    }

    /// Push a row. Cells are matched to columns by position.
    ///
    /// Missing trailing cells are filled with empty strings; extra cells are dropped.
    pub fn push(&mut self, row: impl IntoIterator<Item = String>) {
        let mut cells = row.into_iter();
        for col in &mut self.columns {
            col.push(cells.next().unwrap_or_default());
        }
    }

    /// Number of rows currently buffered
    pub fn len(&self) -> usize {
        self.columns.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Buffer reached batch capacity and should be flushed
    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity
    }

    /// Take buffered rows as a RecordBatch, resetting internal state
    pub fn take_batch(&mut self) -> Result<RecordBatch, ArrowError> {
        let arrays: Vec<ArrayRef> = self
            .columns
            .iter_mut()
            .map(|col| {
                let values = std::mem::replace(col, Vec::with_capacity(self.capacity));
                Arc::new(StringArray::from(values)) as ArrayRef
            })
            .collect();
        RecordBatch::try_new(self.schema.clone(), arrays)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::text_schema;

    #[test]
    fn full_at_capacity() {
        let mut acc = TextAccumulator::new(text_schema(&["a", "b"]), 2);
        assert!(acc.is_empty());
        acc.push(["1".to_string(), "x".to_string()]);
        assert!(!acc.is_full());
        acc.push(["2".to_string(), "y".to_string()]);
        assert!(acc.is_full());
        assert_eq!(acc.len(), 2);
    }

    #[test]
    fn take_batch_resets() {
        let mut acc = TextAccumulator::new(text_schema(&["a", "b"]), 10);
        acc.push(["1".to_string(), "x".to_string()]);
        acc.push(["2".to_string(), "y".to_string()]);
        let batch = acc.take_batch().unwrap();
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.num_columns(), 2);
        assert!(acc.is_empty());

        let col = batch
            .column(1)
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(col.value(0), "x");
        assert_eq!(col.value(1), "y");
    }

    #[test]
    fn short_row_padded() {
        let mut acc = TextAccumulator::new(text_schema(&["a", "b", "c"]), 10);
        acc.push(["only".to_string()]);
        let batch = acc.take_batch().unwrap();
        let col = batch
            .column(2)
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(col.value(0), "");
    }
}
