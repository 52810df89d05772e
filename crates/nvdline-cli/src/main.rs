//! nvdline: keep a local copy of the NVD CVE and CPE feeds current.
//!
//! `fetch` pulls whatever changed since the last checkpoint into a CSV,
//! `load` upserts that CSV into SQLite, `show` prints the top of a table.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use nvdline_core::{ProgressContext, SharedProgress};

mod cmd;
mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "nvdline", version, about = "Incremental NVD feed fetcher and loader")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log at debug level, with module targets
    #[arg(long, global = true)]
    debug: bool,

    /// Read settings from this file instead of the search path
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch records modified since the last checkpoint
    Fetch(cmd::fetch::FetchArgs),
    /// Upsert a fetched CSV into SQLite
    Load(cmd::load::LoadArgs),
    /// Print the first rows of a loaded table
    Show(cmd::show::ShowArgs),
    /// Print the effective settings
    Config,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let progress: SharedProgress = Arc::new(ProgressContext::new());

    // With bars on screen only warnings get through, unless --debug
    let bars = progress.is_tty().then(|| progress.multi());
    nvdline_core::init_logging(bars.is_some() && !cli.debug, cli.debug, bars);

    if let Err(e) = dispatch(cli, &progress) {
        log::error!("{e:#}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn dispatch(cli: Cli, progress: &SharedProgress) -> Result<()> {
    let config = Config::resolve(cli.config.as_deref())?;
    match cli.command {
        Command::Fetch(args) => cmd::fetch::run(args, &config, progress),
        Command::Load(args) => cmd::load::run(args, &config),
        Command::Show(args) => cmd::show::run(args, &config),
        Command::Config => {
            show_settings(&config);
            Ok(())
        }
    }
}

fn show_settings(config: &Config) {
    let nvd = &config.nvd;
    let key = match nvd.api_key {
        Some(_) => "configured",
        None => "not set",
    };
    let tls = if nvd.accept_invalid_certs {
        "DISABLED"
    } else {
        "enabled"
    };

    cmd::print_summary(
        "Setting",
        &[
            ("Output directory", config.output.default_dir.display().to_string()),
            ("CVE API URL", nvd.cve_url.clone()),
            ("CPE API URL", nvd.cpe_url.clone()),
            ("NVD API key", key.to_string()),
            ("Page size", nvd.page_size.to_string()),
            ("Request delay", format!("{}s", nvd.request_delay_secs)),
            (
                "Request timeout",
                nvd.request_timeout_secs
                    .filter(|&s| s > 0)
                    .map_or_else(|| "none".to_string(), |s| format!("{s}s")),
            ),
            ("Batch size", nvd.batch_size.to_string()),
            ("TLS verification", tls.to_string()),
            ("Database", config.database.path.display().to_string()),
        ],
    );
}
