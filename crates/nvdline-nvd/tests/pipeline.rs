//! End-to-end runs of the NVD pipeline against an in-memory upstream
//!
//! The upstream and the pacer share a virtual clock, so pacing is checked
//! without sleeping. The live test at the bottom needs network access and
//! an API key; run with:
//! NVD_API_KEY=... cargo test -p nvdline-nvd --test pipeline -- --ignored

use std::cell::Cell;
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

use indicatif::ProgressBar;
use nvdline_core::{FetchError, HandoffReceiver, Message, channel, read_text_column};
use nvdline_nvd::{
    CheckpointStore, Config, Feed, FetchArgs, Layout, NOT_AVAILABLE, Pacer, PageQuery, PageSource,
    Paginator, Projection, Record, RunError, normalize, run_with,
};
use serde_json::{Value, json};
use tempfile::TempDir;

type Clock = Rc<Cell<Duration>>;

/// Serves a fixed list of items, paginated by the query's cursor
struct FakeNvd {
    items: Vec<Value>,
    fail_at: Option<u64>,
    clock: Clock,
    queries: Vec<(Duration, PageQuery)>,
}

impl FakeNvd {
    fn new(items: Vec<Value>, clock: &Clock) -> Self {
        Self {
            items,
            fail_at: None,
            clock: clock.clone(),
            queries: Vec::new(),
        }
    }

    fn start_indices(&self) -> Vec<u64> {
        self.queries.iter().map(|(_, q)| q.start_index).collect()
    }
}

impl PageSource for FakeNvd {
    fn fetch(&mut self, q: &PageQuery) -> Result<Option<Value>, FetchError> {
        self.queries.push((self.clock.get(), q.clone()));
        if self.fail_at == Some(q.start_index) {
            return Err(FetchError::Transport {
                status: Some(503),
                message: "Service Unavailable".into(),
            });
        }
        let start = (q.start_index as usize).min(self.items.len());
        let end = (start + q.results_per_page as usize).min(self.items.len());
        let page = self.items[start..end].to_vec();
        Ok(Some(json!({
            "resultsPerPage": page.len(),
            "startIndex": q.start_index,
            "totalResults": self.items.len(),
            "format": "NVD_CVE",
            "version": "2.0",
            "vulnerabilities": page,
        })))
    }
}

/// Advances the shared clock instead of sleeping
struct VirtualPacer(Clock);

impl Pacer for VirtualPacer {
    fn pause(&mut self, delay: Duration) {
        self.0.set(self.0.get() + delay);
    }
}

fn cve(i: usize) -> Value {
    json!({
        "cve": {
            "id": format!("CVE-2024-{i:05}"),
            "sourceIdentifier": "cve@mitre.org",
            "vulnStatus": "Analyzed",
            "published": "2024-01-01T00:00:00.000",
            "lastModified": format!("2024-{:02}-{:02}T{:02}:00:00.000", 1 + i % 12, 1 + i % 28, i % 24),
            "descriptions": [{"lang": "en", "value": format!("issue {i}")}],
            "references": [{"url": format!("https://example.com/{i}")}]
        }
    })
}

fn config(dir: &Path, page_size: u32) -> Config {
    config_for(dir, page_size, Projection::Compact)
}

fn config_for(dir: &Path, page_size: u32, projection: Projection) -> Config {
    Config::try_from(FetchArgs {
        feed: Feed::Cves,
        projection,
        api_key: Some("test-key".into()),
        output_dir: dir.to_path_buf(),
        page_size,
        ..Default::default()
    })
    .unwrap()
}

fn last_modified(item: &Value) -> String {
    item["cve"]["lastModified"].as_str().unwrap().to_string()
}

fn header_lines(path: &Path) -> usize {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .filter(|l| l.starts_with("CVE ID,"))
        .count()
}

fn data_lines(path: &Path) -> usize {
    std::fs::read_to_string(path).unwrap().lines().count() - header_lines(path)
}

fn header_width(path: &Path) -> usize {
    let text = std::fs::read_to_string(path).unwrap();
    text.lines().next().unwrap().split(',').count()
}

/// Counts items and end-of-stream markers until the producer is gone
fn drain(rx: &HandoffReceiver<Record>) -> (usize, usize) {
    let (mut items, mut ends) = (0, 0);
    while let Ok(msg) = rx.recv() {
        match msg {
            Message::Item(_) => items += 1,
            Message::EndOfStream => ends += 1,
        }
    }
    (items, ends)
}

/// Same fetch-and-enqueue loop as a run, with the queue read here
fn enqueue_all(upstream: &mut FakeNvd, clock: &Clock, page_size: u32) -> (usize, usize) {
    let layout = Layout::new(Feed::Cves, Projection::Compact);
    let (mut tx, rx) = channel::<Record>();
    let pages = Paginator::new(
        &mut *upstream,
        VirtualPacer(clock.clone()),
        Feed::Cves,
        page_size,
        Duration::from_secs(6),
        None,
    );
    for page in pages {
        let Ok(page) = page else {
            // Early exit drops the sender without finish()
            drop(tx);
            return drain(&rx);
        };
        for item in &page.items {
            tx.send(normalize(layout, item)).unwrap();
        }
    }
    assert_eq!(tx.finish(), upstream.items.len());
    drain(&rx)
}

#[test]
fn full_load_end_to_end() {
    let dir = TempDir::new().unwrap();
    let cfg = config(dir.path(), 100);
    let clock = Clock::default();
    let items: Vec<Value> = (0..250).map(cve).collect();
    let mut upstream = FakeNvd::new(items.clone(), &clock);

    let summary = run_with(
        &cfg,
        &mut upstream,
        VirtualPacer(clock.clone()),
        &ProgressBar::hidden(),
    )
    .unwrap();

    // ceil(250 / 100) requests at 0, 100, 200
    assert_eq!(upstream.start_indices(), vec![0, 100, 200]);
    assert!(upstream.queries.iter().all(|(_, q)| q.window.is_none()));
    assert_eq!(summary.pages, 3);
    // The writer only returns Ok after end-of-stream, so every enqueued
    // record was drained into the file before the checkpoint was computed
    assert_eq!(summary.records, 250);
    assert_eq!(summary.rows_written, summary.records);
    assert_eq!(summary.batches, 3);

    assert_eq!(header_lines(&cfg.output_path), 1);
    assert_eq!(data_lines(&cfg.output_path), 250);

    let expected = items.iter().map(last_modified).max();
    assert_eq!(summary.checkpoint, expected);
    assert_eq!(CheckpointStore::new(&cfg.checkpoint_path).load().unwrap(), expected);
    assert!(summary.checkpoint_advanced());
}

#[test]
fn requests_are_paced() {
    let dir = TempDir::new().unwrap();
    let cfg = config(dir.path(), 10);
    let clock = Clock::default();
    let mut upstream = FakeNvd::new((0..45).map(cve).collect(), &clock);

    run_with(
        &cfg,
        &mut upstream,
        VirtualPacer(clock.clone()),
        &ProgressBar::hidden(),
    )
    .unwrap();

    assert_eq!(upstream.queries.len(), 5);
    assert_eq!(upstream.queries[0].0, Duration::ZERO);
    for pair in upstream.queries.windows(2) {
        assert!(pair[1].0 - pair[0].0 >= cfg.request_delay);
    }
}

#[test]
fn writer_sees_fetch_order() {
    let dir = TempDir::new().unwrap();
    let cfg = config(dir.path(), 7);
    let clock = Clock::default();
    let items: Vec<Value> = (0..60).rev().map(cve).collect();
    let mut upstream = FakeNvd::new(items.clone(), &clock);

    run_with(&cfg, &mut upstream, VirtualPacer(clock), &ProgressBar::hidden()).unwrap();

    let ids = read_text_column(&cfg.output_path, "CVE ID").unwrap().unwrap();
    let expected: Vec<String> = items
        .iter()
        .map(|v| v["cve"]["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids, expected);
}

#[test]
fn sparse_records_fill_sentinel() {
    let dir = TempDir::new().unwrap();
    let cfg = config(dir.path(), 100);
    let clock = Clock::default();
    let items = vec![
        json!({"cve": {"id": "CVE-2024-0001", "lastModified": "2024-05-01T00:00:00.000"}}),
        json!({"cve": {"lastModified": "2024-05-02T00:00:00.000"}}),
    ];
    let mut upstream = FakeNvd::new(items, &clock);

    run_with(&cfg, &mut upstream, VirtualPacer(clock), &ProgressBar::hidden()).unwrap();

    for column in ["Description", "References", "Metrics", "CISA Action Due"] {
        let values = read_text_column(&cfg.output_path, column).unwrap().unwrap();
        assert_eq!(values, vec![NOT_AVAILABLE; 2], "column {column}");
    }
    let ids = read_text_column(&cfg.output_path, "CVE ID").unwrap().unwrap();
    assert_eq!(ids, vec!["CVE-2024-0001", NOT_AVAILABLE]);
}

#[test]
fn second_run_appends_without_header_and_uses_window() {
    let dir = TempDir::new().unwrap();
    let cfg = config(dir.path(), 2);
    let clock = Clock::default();

    let first = vec![
        json!({"cve": {"id": "CVE-1", "lastModified": "2024-01-01T00:00:00.000"}}),
        json!({"cve": {"id": "CVE-2", "lastModified": "2024-01-03T00:00:00.000"}}),
        json!({"cve": {"id": "CVE-3", "lastModified": "2024-01-02T00:00:00.000"}}),
    ];
    let mut upstream = FakeNvd::new(first, &clock);
    let s1 = run_with(&cfg, &mut upstream, VirtualPacer(clock.clone()), &ProgressBar::hidden())
        .unwrap();
    assert_eq!(s1.checkpoint.as_deref(), Some("2024-01-03T00:00:00.000"));

    let second = vec![
        json!({"cve": {"id": "CVE-2", "lastModified": "2024-01-05T00:00:00.000"}}),
        json!({"cve": {"id": "CVE-4", "lastModified": "2024-01-04T00:00:00.000"}}),
    ];
    let mut upstream = FakeNvd::new(second, &clock);
    let s2 = run_with(&cfg, &mut upstream, VirtualPacer(clock), &ProgressBar::hidden())
        .unwrap();

    let window = upstream.queries[0].1.window.clone().unwrap();
    assert_eq!(window.start, "2024-01-03T00:00:00.000");
    assert!(window.end.ends_with('Z'));
    // End is captured once per run
    assert!(upstream.queries.iter().all(|(_, q)| q.window.as_ref() == Some(&window)));

    assert_eq!(header_lines(&cfg.output_path), 1);
    assert_eq!(data_lines(&cfg.output_path), 5);
    assert_eq!(s2.previous_checkpoint.as_deref(), Some("2024-01-03T00:00:00.000"));
    assert_eq!(s2.checkpoint.as_deref(), Some("2024-01-05T00:00:00.000"));
}

#[test]
fn empty_delta_keeps_checkpoint() {
    let dir = TempDir::new().unwrap();
    let cfg = config(dir.path(), 100);
    let store = CheckpointStore::new(&cfg.checkpoint_path);
    store.save("2024-06-01T00:00:00.000").unwrap();

    let clock = Clock::default();
    let mut upstream = FakeNvd::new(Vec::new(), &clock);
    let summary = run_with(&cfg, &mut upstream, VirtualPacer(clock), &ProgressBar::hidden())
        .unwrap();

    assert_eq!(upstream.queries.len(), 1);
    assert_eq!(summary.rows_written, 0);
    assert!(!cfg.output_path.exists());
    assert!(!summary.checkpoint_advanced());
    assert_eq!(store.load().unwrap().as_deref(), Some("2024-06-01T00:00:00.000"));
}

#[test]
fn transport_error_still_drains_writer() {
    let dir = TempDir::new().unwrap();
    let cfg = config(dir.path(), 100);
    let clock = Clock::default();
    let mut upstream = FakeNvd::new((0..300).map(cve).collect(), &clock);
    upstream.fail_at = Some(100);

    let err = run_with(&cfg, &mut upstream, VirtualPacer(clock), &ProgressBar::hidden())
        .unwrap_err();

    match err {
        RunError::Fetch {
            start_index,
            source,
        } => {
            assert_eq!(start_index, 100);
            assert_eq!(source.status(), Some(503));
        }
        other => panic!("expected fetch error, got {other}"),
    }
    assert_eq!(upstream.start_indices(), vec![0, 100]);
    assert_eq!(header_lines(&cfg.output_path), 1);
    assert_eq!(data_lines(&cfg.output_path), 100);
    assert!(!cfg.checkpoint_path.exists());
}

#[test]
fn cpe_feed_uses_products() {
    let dir = TempDir::new().unwrap();
    let cfg = Config::try_from(FetchArgs {
        feed: Feed::Cpes,
        api_key: Some("test-key".into()),
        output_dir: dir.path().to_path_buf(),
        ..Default::default()
    })
    .unwrap();

    struct Products;
    impl PageSource for Products {
        fn fetch(&mut self, _: &PageQuery) -> Result<Option<Value>, FetchError> {
            Ok(Some(json!({
                "totalResults": 1,
                "products": [{"cpe": {
                    "cpeName": "cpe:2.3:a:vendor:product:1.0:*:*:*:*:*:*:*",
                    "lastModified": "2024-02-02T02:02:02.000",
                    "deprecated": false
                }}]
            })))
        }
    }

    let summary = run_with(
        &cfg,
        Products,
        VirtualPacer(Clock::default()),
        &ProgressBar::hidden(),
    )
    .unwrap();
    assert_eq!(summary.rows_written, 1);
    assert_eq!(summary.checkpoint.as_deref(), Some("2024-02-02T02:02:02.000"));
    let names = read_text_column(&cfg.output_path, "CPE Name").unwrap().unwrap();
    assert_eq!(names, vec!["cpe:2.3:a:vendor:product:1.0:*:*:*:*:*:*:*"]);
}

#[test]
fn flattened_projection_writes_cvss_columns() {
    let dir = TempDir::new().unwrap();
    let cfg = Config::try_from(FetchArgs {
        projection: Projection::Flattened,
        api_key: Some("test-key".into()),
        output_dir: dir.path().to_path_buf(),
        ..Default::default()
    })
    .unwrap();
    let clock = Clock::default();
    let item = json!({"cve": {
        "id": "CVE-2024-9999",
        "lastModified": "2024-07-07T07:07:07.000",
        "metrics": {"cvssMetricV31": [{"cvssData": {"baseScore": 7.5, "baseSeverity": "HIGH"}}]}
    }});
    let mut upstream = FakeNvd::new(vec![item], &clock);

    run_with(&cfg, &mut upstream, VirtualPacer(clock), &ProgressBar::hidden()).unwrap();

    let score = read_text_column(&cfg.output_path, "CVSSv3 Base Score").unwrap().unwrap();
    assert_eq!(score, vec!["7.5"]);
    assert!(read_text_column(&cfg.output_path, "Metrics").unwrap().is_none());
}

#[test]
fn end_of_stream_enqueued_once() {
    let clock = Clock::default();
    let mut upstream = FakeNvd::new((0..250).map(cve).collect(), &clock);
    assert_eq!(enqueue_all(&mut upstream, &clock, 100), (250, 1));
    assert_eq!(upstream.start_indices(), vec![0, 100, 200]);

    // A failed request ends the stream the same way
    let mut upstream = FakeNvd::new((0..250).map(cve).collect(), &clock);
    upstream.fail_at = Some(200);
    assert_eq!(enqueue_all(&mut upstream, &clock, 100), (200, 1));

    let mut upstream = FakeNvd::new(Vec::new(), &clock);
    assert_eq!(enqueue_all(&mut upstream, &clock, 100), (0, 1));
}

#[test]
fn projections_share_output_dir_without_mixing() {
    let dir = TempDir::new().unwrap();
    let compact = config_for(dir.path(), 100, Projection::Compact);
    let flattened = config_for(dir.path(), 100, Projection::Flattened);
    assert_ne!(compact.output_path, flattened.output_path);
    assert_ne!(compact.checkpoint_path, flattened.checkpoint_path);

    let clock = Clock::default();
    let mut upstream = FakeNvd::new((0..30).map(cve).collect(), &clock);
    let first = run_with(&compact, &mut upstream, VirtualPacer(clock.clone()), &ProgressBar::hidden())
        .unwrap();
    assert!(first.checkpoint_advanced());

    // The compact watermark must not turn the flattened run into a delta
    let mut upstream = FakeNvd::new((0..30).map(cve).collect(), &clock);
    let second = run_with(&flattened, &mut upstream, VirtualPacer(clock), &ProgressBar::hidden())
        .unwrap();
    assert!(second.window.is_none());
    assert!(upstream.queries.iter().all(|(_, q)| q.window.is_none()));
    assert_eq!(second.previous_checkpoint, None);
    assert_eq!(second.rows_written, 30);

    for (cfg, width) in [(&compact, 19), (&flattened, 45)] {
        assert_eq!(header_lines(&cfg.output_path), 1);
        assert_eq!(data_lines(&cfg.output_path), 30);
        assert_eq!(header_width(&cfg.output_path), width);
        assert_eq!(cfg.layout().columns().len(), width);
    }
    assert!(read_text_column(&compact.output_path, "CVSSv3 Base Score").unwrap().is_none());
    assert!(read_text_column(&flattened.output_path, "Metrics").unwrap().is_none());
    assert_eq!(
        CheckpointStore::new(&flattened.checkpoint_path).load().unwrap(),
        second.checkpoint
    );
}

/// One real page from the NVD API
#[test]
#[ignore]
fn live_single_page() {
    let Ok(api_key) = std::env::var("NVD_API_KEY") else {
        eprintln!("NVD_API_KEY not set, skipping");
        return;
    };
    let dir = TempDir::new().unwrap();
    let cfg = config(dir.path(), 20);
    let cfg = Config {
        api_key,
        ..cfg
    };
    let mut source = nvdline_nvd::HttpPageSource::new(
        &cfg.endpoint,
        &cfg.api_key,
        &cfg.http_options(),
    )
    .expect("client should build");
    let body = source
        .fetch(&PageQuery {
            start_index: 0,
            results_per_page: 20,
            window: None,
        })
        .expect("request should succeed")
        .expect("body should not be empty");
    let page = nvdline_nvd::Page::from_body(Feed::Cves, 0, body).expect("page");
    assert_eq!(page.items.len(), 20);
    assert!(page.total_results > 200_000);
}
