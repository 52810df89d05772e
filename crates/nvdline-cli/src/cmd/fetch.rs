//! Fetch subcommand - pull the NVD delta since the last checkpoint

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use nvdline_core::SharedProgress;
use nvdline_core::progress::fmt_num;

use super::{FeedArg, ProjectionArg, print_summary};
use crate::config::Config;

#[derive(Args, Debug)]
pub struct FetchArgs {
    /// NVD collection to fetch
    #[arg(short, long, value_enum, default_value = "cves")]
    pub feed: FeedArg,

    /// How CVSS metrics land in the CSV (ignored for cpes)
    #[arg(short, long, value_enum, default_value = "compact")]
    pub projection: ProjectionArg,

    /// Output directory for the data and checkpoint files
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Results per request (max 2000)
    #[arg(long)]
    pub page_size: Option<u32>,

    /// Seconds to wait between requests
    #[arg(long)]
    pub delay_secs: Option<u64>,

    /// Accept invalid TLS certificates (insecure)
    #[arg(long)]
    pub insecure: bool,
}

/// Merge file config with CLI overrides
fn fetch_args(args: FetchArgs, config: &Config) -> nvdline_nvd::FetchArgs {
    let feed: nvdline_nvd::Feed = args.feed.into();
    nvdline_nvd::FetchArgs {
        feed,
        projection: args.projection.into(),
        endpoint: Some(config.nvd.url_for(feed).to_string()),
        api_key: config.nvd.api_key.clone(),
        output_dir: args
            .output
            .unwrap_or_else(|| config.output.default_dir.clone()),
        page_size: args.page_size.unwrap_or(config.nvd.page_size),
        request_delay_secs: args.delay_secs.unwrap_or(config.nvd.request_delay_secs),
        request_timeout_secs: config.nvd.request_timeout_secs,
        batch_size: config.nvd.batch_size,
        accept_invalid_certs: args.insecure || config.nvd.accept_invalid_certs,
    }
}

pub fn run(args: FetchArgs, config: &Config, progress: &SharedProgress) -> Result<()> {
    // Missing key fails here, before any request
    let nvd_config = nvdline_nvd::Config::try_from(fetch_args(args, config))?;

    log::info!("Fetching NVD {}", nvd_config.layout());
    log::info!("  Endpoint: {}", nvd_config.endpoint);
    log::info!("  Output: {}", nvd_config.output_path.display());

    let summary = nvdline_nvd::run(&nvd_config, progress)
        .with_context(|| format!("NVD {} fetch failed", nvd_config.feed))?;

    print_summary(
        "NVD",
        &[
            ("Feed", nvd_config.layout().to_string()),
            (
                "Window",
                summary
                    .window
                    .as_ref()
                    .map_or_else(|| "full load".to_string(), |w| format!("{} .. {}", w.start, w.end)),
            ),
            ("Pages", summary.pages.to_string()),
            (
                "Rows",
                format!(
                    "{} in {} batches",
                    fmt_num(summary.rows_written),
                    summary.batches
                ),
            ),
            (
                "Checkpoint",
                match (&summary.checkpoint, summary.checkpoint_advanced()) {
                    (Some(cp), true) => cp.clone(),
                    (Some(cp), false) => format!("{cp} (unchanged)"),
                    (None, _) => "none".to_string(),
                },
            ),
            ("Time", format!("{:.1}s", summary.elapsed.as_secs_f64())),
        ],
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> FetchArgs {
        FetchArgs {
            feed: FeedArg::Cpes,
            projection: ProjectionArg::Compact,
            output: None,
            page_size: None,
            delay_secs: Some(0),
            insecure: false,
        }
    }

    #[test]
    fn cli_overrides_file_config() {
        let mut config = Config::default();
        config.nvd.api_key = Some("k".into());
        config.nvd.page_size = 500;
        config.nvd.cpe_url = "http://localhost/cpes".into();
        config.nvd.request_timeout_secs = Some(30);

        let merged = fetch_args(
            FetchArgs {
                output: Some(PathBuf::from("/tmp/out")),
                ..args()
            },
            &config,
        );
        assert_eq!(merged.feed, nvdline_nvd::Feed::Cpes);
        assert_eq!(merged.endpoint.as_deref(), Some("http://localhost/cpes"));
        assert_eq!(merged.page_size, 500);
        assert_eq!(merged.request_delay_secs, 0);
        assert_eq!(merged.request_timeout_secs, Some(30));
        assert_eq!(merged.output_dir, PathBuf::from("/tmp/out"));
        assert!(!merged.accept_invalid_certs);
    }

    #[test]
    fn insecure_flag_or_config_enables_downgrade() {
        let mut config = Config::default();
        assert!(fetch_args(FetchArgs { insecure: true, ..args() }, &config).accept_invalid_certs);
        config.nvd.accept_invalid_certs = true;
        assert!(fetch_args(args(), &config).accept_invalid_certs);
    }

    #[test]
    fn missing_key_is_fatal_before_network() {
        let mut config = Config::default();
        config.nvd.api_key = None;
        // Endpoint is unroutable: reaching the network would hang or fail differently
        config.nvd.cpe_url = "http://192.0.2.1/unreachable".into();
        let progress = std::sync::Arc::new(nvdline_core::ProgressContext::hidden());
        let err = run(args(), &config, &progress).unwrap_err();
        assert!(err.to_string().contains("API key"));
    }
}
