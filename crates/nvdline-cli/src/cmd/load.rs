//! Load subcommand - upsert a fetched CSV into SQLite

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use super::{FeedArg, ProjectionArg, print_summary};
use crate::config::Config;

#[derive(Args, Debug)]
pub struct LoadArgs {
    /// Feed whose default CSV and table are used
    #[arg(short, long, value_enum, default_value = "cves")]
    pub feed: FeedArg,

    /// Projection the CSV was fetched with (picks the default CSV and table)
    #[arg(short, long, value_enum, default_value = "compact")]
    pub projection: ProjectionArg,

    /// CSV to load (default: the fetch output for this feed and projection)
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// SQLite database file
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Target table (default: nvd_<feed>, or nvd_cves_flattened)
    #[arg(short, long)]
    pub table: Option<String>,
}

fn load_config(args: LoadArgs, config: &Config) -> nvdline_load::LoadConfig {
    let layout = nvdline_nvd::Layout::new(args.feed.into(), args.projection.into());
    nvdline_load::LoadConfig {
        input: args
            .input
            .unwrap_or_else(|| config.output.default_dir.join(layout.output_file())),
        db_path: args.db.unwrap_or_else(|| config.database.path.clone()),
        table: args.table.unwrap_or_else(|| layout.table_name()),
    }
}

pub fn run(args: LoadArgs, config: &Config) -> Result<()> {
    let load_config = load_config(args, config);

    log::info!("Loading {}", load_config.input.display());
    log::info!("  Database: {}", load_config.db_path.display());
    log::info!("  Table: {}", load_config.table);

    let summary = nvdline_load::run(&load_config)?;

    print_summary(
        "SQLite",
        &[
            ("Table", nvdline_load::sanitize_identifier(&load_config.table)),
            ("Rows read", summary.rows_read.to_string()),
            ("Rows in table", summary.rows_in_table.to_string()),
        ],
    );
    Ok(())
}
