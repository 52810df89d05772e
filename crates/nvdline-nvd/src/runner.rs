//! Run coordinator: checkpoint → fetch → write → checkpoint
//!
//! One run walks a fixed sequence of [`Stage`]s. The fetcher runs on the
//! calling thread; the writer runs on its own thread and is joined before
//! the checkpoint is touched.

use std::fmt;
use std::time::{Duration, Instant};

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use indicatif::ProgressBar;
use nvdline_core::progress::{fmt_num, note_request, set_total};
use nvdline_core::{FetchError, HandoffSender, ProgressContext, WriteError, channel};

use crate::api::{HttpPageSource, PageSource, TimeWindow};
use crate::checkpoint::{CheckpointStore, latest_modified};
use crate::config::Config;
use crate::feed::Layout;
use crate::fetcher::{Pacer, Paginator, SleepPacer};
use crate::normalize::{Record, normalize};
use crate::writer::BatchWriter;

/// Longest `lastMod` range the NVD API accepts in one query
const MAX_WINDOW_DAYS: i64 = 120;

/// Coordinator states, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Init,
    ReadCheckpoint,
    ConfigureFilter,
    SpawnWriter,
    FetchAndEnqueue,
    AwaitWriterDrain,
    RecomputeCheckpoint,
    PersistCheckpoint,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "INIT",
            Self::ReadCheckpoint => "READ_CHECKPOINT",
            Self::ConfigureFilter => "CONFIGURE_FILTER",
            Self::SpawnWriter => "SPAWN_WRITER",
            Self::FetchAndEnqueue => "FETCH_AND_ENQUEUE",
            Self::AwaitWriterDrain => "AWAIT_WRITER_DRAIN",
            Self::RecomputeCheckpoint => "RECOMPUTE_CHECKPOINT",
            Self::PersistCheckpoint => "PERSIST_CHECKPOINT",
            Self::Done => "DONE",
        };
        f.write_str(name)
    }
}

fn enter(stage: Stage) {
    log::debug!("-> {stage}");
}

/// Fatal run failure
#[derive(Debug)]
pub enum RunError {
    /// HTTP client could not be built
    Http(FetchError),
    /// A page request failed; rows from earlier pages are on disk
    Fetch {
        start_index: u64,
        source: FetchError,
    },
    /// Output directory or batch flush failed
    Write(WriteError),
    /// Checkpoint file could not be read or written
    Checkpoint(WriteError),
    Spawn(std::io::Error),
    WriterPanicked,
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(e) => write!(f, "cannot build HTTP client: {e}"),
            Self::Fetch {
                start_index,
                source,
            } => write!(f, "fetch failed at startIndex {start_index}: {source}"),
            Self::Write(e) => write!(f, "write failed: {e}"),
            Self::Checkpoint(e) => write!(f, "checkpoint failed: {e}"),
            Self::Spawn(e) => write!(f, "cannot spawn writer thread: {e}"),
            Self::WriterPanicked => f.write_str("writer thread panicked"),
        }
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Http(e) | Self::Fetch { source: e, .. } => Some(e),
            Self::Write(e) | Self::Checkpoint(e) => Some(e),
            Self::Spawn(e) => Some(e),
            Self::WriterPanicked => None,
        }
    }
}

/// Outcome of a successful run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub pages: usize,
    /// Records handed to the writer
    pub records: usize,
    pub rows_written: usize,
    pub batches: usize,
    /// `None` on a full load
    pub window: Option<TimeWindow>,
    pub previous_checkpoint: Option<String>,
    /// Watermark after the run (unchanged when nothing usable was written)
    pub checkpoint: Option<String>,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn checkpoint_advanced(&self) -> bool {
        self.checkpoint != self.previous_checkpoint
    }
}

/// Why the fetch step stopped early
enum FetchStop {
    Upstream { start_index: u64, error: FetchError },
    WriterGone,
}

struct Fetched {
    pages: usize,
}

/// Run against the real NVD API with wall-clock pacing.
pub fn run(config: &Config, progress: &ProgressContext) -> Result<RunSummary, RunError> {
    let source = HttpPageSource::new(&config.endpoint, &config.api_key, &config.http_options())
        .map_err(RunError::Http)?;
    let pb = progress.feed_bar(config.feed.name());
    let result = run_with(config, source, SleepPacer, &pb);
    pb.finish_and_clear();
    result
}

/// Run with an injected page source and pacer.
pub fn run_with<S: PageSource, P: Pacer>(
    config: &Config,
    source: S,
    pacer: P,
    pb: &ProgressBar,
) -> Result<RunSummary, RunError> {
    let start = Instant::now();
    let layout = config.layout();
    enter(Stage::Init);
    if let Some(dir) = config.output_path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|e| RunError::Write(WriteError::io(dir, e)))?;
    }

    enter(Stage::ReadCheckpoint);
    let store = CheckpointStore::new(&config.checkpoint_path);
    let previous = store.load().map_err(RunError::Checkpoint)?;
    match &previous {
        Some(cp) => log::info!("{layout}: last checkpoint {cp}"),
        None => log::info!("{layout}: no checkpoint, full load"),
    }

    enter(Stage::ConfigureFilter);
    let window = previous.as_ref().map(|cp| TimeWindow {
        start: cp.clone(),
        end: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    });
    if let Some(w) = &window {
        log::info!("Filter window {} .. {}", w.start, w.end);
        warn_if_window_too_wide(w);
    }

    enter(Stage::SpawnWriter);
    let (mut tx, rx) = channel::<Record>();
    let writer = BatchWriter::new(
        rx,
        &config.output_path,
        layout.schema(),
        config.batch_size,
    )
    .spawn()
    .map_err(RunError::Spawn)?;

    enter(Stage::FetchAndEnqueue);
    let pages = Paginator::new(
        source,
        pacer,
        config.feed,
        config.page_size,
        config.request_delay,
        window.clone(),
    );
    let fetched = fetch_and_enqueue(pages, layout, &mut tx, pb);
    let records = tx.finish();

    enter(Stage::AwaitWriterDrain);
    let written = writer.join().map_err(|_| RunError::WriterPanicked)?;
    let fetched = match fetched {
        Ok(f) => f,
        Err(FetchStop::Upstream { start_index, error }) => {
            if let Err(e) = &written {
                log::error!("Writer also failed: {e}");
            }
            return Err(RunError::Fetch {
                start_index,
                source: error,
            });
        }
        Err(FetchStop::WriterGone) => Fetched { pages: 0 },
    };
    let written = written.map_err(RunError::Write)?;
    log::info!(
        "{layout}: {} pages, {} rows written to {}",
        fetched.pages,
        fmt_num(written.rows),
        config.output_path.display()
    );

    enter(Stage::RecomputeCheckpoint);
    let latest = latest_modified(&config.output_path).map_err(RunError::Checkpoint)?;

    enter(Stage::PersistCheckpoint);
    let checkpoint = match latest {
        Some(value) => {
            store.save(&value).map_err(RunError::Checkpoint)?;
            log::info!("Checkpoint persisted: {value}");
            Some(value)
        }
        None => {
            log::info!("No usable last-modified values; checkpoint unchanged");
            previous.clone()
        }
    };

    enter(Stage::Done);
    Ok(RunSummary {
        pages: fetched.pages,
        records,
        rows_written: written.rows,
        batches: written.batches,
        window,
        previous_checkpoint: previous,
        checkpoint,
        elapsed: start.elapsed(),
    })
}

/// Drive the paginator, pushing every normalized record into the queue.
///
/// Stops at the first upstream error, or as soon as the writer has gone away.
fn fetch_and_enqueue<S: PageSource, P: Pacer>(
    mut pages: Paginator<S, P>,
    layout: Layout,
    tx: &mut HandoffSender<Record>,
    pb: &ProgressBar,
) -> Result<Fetched, FetchStop> {
    let mut fetched = Fetched { pages: 0 };
    while let Some(page) = pages.next() {
        let page = match page {
            Ok(page) => page,
            Err(error) => {
                // Cursor is not advanced past a failed request
                let start_index = pages.cursor();
                return Err(FetchStop::Upstream { start_index, error });
            }
        };
        if fetched.pages == 0 {
            log::info!("{layout}: {} total results", fmt_num(page.total_results as usize));
            set_total(pb, page.total_results);
        }
        fetched.pages += 1;
        note_request(pb, pages.cursor());
        log::debug!(
            "Page at {}: {} items",
            page.start_index,
            page.items.len()
        );
        for item in &page.items {
            if tx.send(normalize(layout, item)).is_err() {
                log::debug!("Writer stopped, abandoning fetch");
                return Err(FetchStop::WriterGone);
            }
            pb.inc(1);
        }
    }
    Ok(fetched)
}

/// Log a warning when the NVD would reject the `lastMod` range.
fn warn_if_window_too_wide(window: &TimeWindow) {
    let (Some(start), Some(end)) = (parse_timestamp(&window.start), parse_timestamp(&window.end))
    else {
        return;
    };
    let days = (end - start).num_days();
    if days > MAX_WINDOW_DAYS {
        log::warn!(
            "Filter window spans {days} days; the NVD API accepts at most {MAX_WINDOW_DAYS}"
        );
    }
}

/// NVD timestamps carry no zone (`2024-03-04T05:06:07.890`); ours carry `Z`.
fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.naive_utc()))
}
