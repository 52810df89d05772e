//! Show subcommand - print the top rows of a loaded table

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use comfy_table::Cell;

use super::new_table;
use crate::config::Config;

/// Cells longer than this are cut for display
const MAX_CELL_CHARS: usize = 60;

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// SQLite database file
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Table to show
    #[arg(short, long, default_value = "nvd_cves")]
    pub table: String,

    /// Number of rows
    #[arg(short, long, default_value_t = nvdline_load::DEFAULT_SHOW_LIMIT)]
    pub limit: usize,
}

fn truncate(s: &str) -> String {
    if s.chars().count() <= MAX_CELL_CHARS {
        return s.to_string();
    }
    let cut: String = s.chars().take(MAX_CELL_CHARS - 1).collect();
    format!("{cut}…")
}

pub fn run(args: ShowArgs, config: &Config) -> Result<()> {
    let db = args.db.unwrap_or_else(|| config.database.path.clone());
    let view = nvdline_load::show(&db, &args.table, args.limit)?;

    if view.rows.is_empty() {
        eprintln!("{} is empty", args.table);
        return Ok(());
    }

    let mut table = new_table(view.columns.iter().map(String::as_str).collect());
    for row in &view.rows {
        table.add_row(row.iter().map(|v| Cell::new(truncate(v))));
    }
    println!("{table}");
    Ok(())
}
