//! nvdline-load: SQLite loader for fetched NVD CSV files
//!
//! Upserts every row of an output CSV into a table keyed by its first
//! column (last write wins), and reads the top rows back for display.

mod config;
mod sql;

pub use config::LoadConfig;
pub use sql::sanitize_identifier;

use std::path::Path;

use anyhow::{Context, Result};
use arrow::array::{Array, AsArray};
use nvdline_core::sink::read_text_batches;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, params_from_iter};

/// Rows shown by default
pub const DEFAULT_SHOW_LIMIT: usize = 10;

/// Summary of one load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadSummary {
    /// Data rows read from the CSV (duplicates included)
    pub rows_read: usize,
    /// Rows in the table after the upsert
    pub rows_in_table: u64,
}

/// Top rows of a table, rendered as text.
#[derive(Debug, Clone, Default)]
pub struct TableView {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Load the CSV into SQLite in a single transaction.
pub fn run(config: &LoadConfig) -> Result<LoadSummary> {
    if let Some(dir) = config.db_path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create database dir: {}", dir.display()))?;
    }
    let mut conn = Connection::open(&config.db_path)
        .with_context(|| format!("Failed to open {}", config.db_path.display()))?;
    load_csv(&mut conn, &config.input, &config.table)
}

/// Upsert every row of `input` into `table` on an open connection.
pub fn load_csv(conn: &mut Connection, input: &Path, table: &str) -> Result<LoadSummary> {
    log::info!("Reading {}", input.display());
    let (schema, batches) = read_text_batches(input)
        .with_context(|| format!("Failed to read CSV {}", input.display()))?;
    anyhow::ensure!(
        !schema.fields().is_empty(),
        "CSV has no columns: {}",
        input.display()
    );

    let table = sanitize_identifier(table);
    let columns: Vec<String> = schema
        .fields()
        .iter()
        .map(|f| sanitize_identifier(f.name()))
        .collect();

    let tx = conn.transaction().context("Failed to begin transaction")?;
    tx.execute_batch(&sql::create_table(&table, &columns))
        .with_context(|| format!("Failed to create table {table}"))?;

    let mut rows_read = 0usize;
    {
        let mut stmt = tx
            .prepare(&sql::upsert(&table, &columns))
            .context("Failed to prepare upsert")?;
        for batch in &batches {
            let cols: Vec<_> = batch.columns().iter().map(|c| c.as_string::<i32>()).collect();
            for row in 0..batch.num_rows() {
                let values = cols
                    .iter()
                    .map(|c| (!c.is_null(row)).then(|| c.value(row)));
                stmt.execute(params_from_iter(values))
                    .with_context(|| format!("Failed to upsert row {}", rows_read + 1))?;
                rows_read += 1;
            }
        }
    }
    tx.commit().context("Failed to commit")?;

    let rows_in_table = count_rows(conn, &table)?;
    log::info!("{table}: {rows_read} rows loaded, {rows_in_table} rows in table");
    Ok(LoadSummary {
        rows_read,
        rows_in_table,
    })
}

fn count_rows(conn: &Connection, table: &str) -> Result<u64> {
    let n: i64 = conn
        .query_row(&sql::count(table), [], |row| row.get(0))
        .with_context(|| format!("Failed to count {table}"))?;
    Ok(n as u64)
}

/// First `limit` rows of `table`.
pub fn show(db_path: &Path, table: &str, limit: usize) -> Result<TableView> {
    let conn = Connection::open_with_flags(db_path, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .with_context(|| format!("Failed to open {}", db_path.display()))?;
    let table = sanitize_identifier(table);

    let mut stmt = conn
        .prepare(&sql::top_rows(&table, limit))
        .with_context(|| format!("Failed to query {table}"))?;
    let columns: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
    let width = columns.len();
    let rows = stmt
        .query_map([], |row| {
            (0..width)
                .map(|i| row.get_ref(i).map(render))
                .collect::<rusqlite::Result<Vec<_>>>()
        })?
        .collect::<rusqlite::Result<Vec<_>>>()
        .with_context(|| format!("Failed to read rows of {table}"))?;
    drop(stmt);

    if rows.is_empty() {
        let total = count_rows(&conn, &table)?;
        log::info!("{table}: no rows to show (total {total})");
    }
    Ok(TableView { columns, rows })
}

fn render(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => String::new(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(t) => String::from_utf8_lossy(t).into_owned(),
        ValueRef::Blob(b) => format!("<{} bytes>", b.len()),
    }
}
