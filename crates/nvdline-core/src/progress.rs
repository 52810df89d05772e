//! Terminal feedback for feed runs.
//!
//! On a terminal each run gets one bar on a shared [`MultiProgress`]: a
//! spinner until the first page reports `totalResults`, then a record
//! counter. Off a terminal every bar is hidden and the log carries progress.

use std::io::IsTerminal;
use std::sync::Arc;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

const TICK: Duration = Duration::from_millis(100);

enum Look {
    Waiting,
    Counting,
}

impl Look {
    fn style(&self) -> ProgressStyle {
        let template = match self {
            Look::Waiting => "{spinner:.cyan} {prefix:<6.bold} {wide_msg:.dim}",
            Look::Counting => {
                "{prefix:<6.bold} [{bar:32.cyan/blue}] {human_pos:>9}/{human_len:<9} {per_sec:>10} {wide_msg:.dim}"
            }
        };
        // Static templates, so the fallback is unreachable in practice
        ProgressStyle::with_template(template)
            .map(|s| s.progress_chars("=> "))
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }
}

/// Record the upstream total on a feed bar, switching it to a counter.
///
/// Called once per page; only the first call with a new total restyles.
pub fn set_total(pb: &ProgressBar, total: u64) {
    if pb.length() != Some(total) {
        pb.set_length(total);
        pb.set_style(Look::Counting.style());
    }
}

/// Show which request window the bar is waiting on.
pub fn note_request(pb: &ProgressBar, start_index: u64) {
    pb.set_message(format!("startIndex={start_index}"));
}

/// Owns the terminal bars for a process.
pub struct ProgressContext {
    multi: MultiProgress,
    draw: bool,
}

impl ProgressContext {
    /// Draws only when stderr is a terminal.
    pub fn new() -> Self {
        Self::with_drawing(std::io::stderr().is_terminal())
    }

    /// Never draws.
    pub fn hidden() -> Self {
        Self::with_drawing(false)
    }

    fn with_drawing(draw: bool) -> Self {
        Self {
            multi: MultiProgress::new(),
            draw,
        }
    }

    /// A bar for one run of `feed`, hidden when not drawing.
    pub fn feed_bar(&self, feed: &str) -> ProgressBar {
        if !self.draw {
            return ProgressBar::hidden();
        }
        let pb = self
            .multi
            .add(ProgressBar::no_length().with_style(Look::Waiting.style()))
            .with_prefix(feed.to_string());
        pb.enable_steady_tick(TICK);
        pb
    }

    pub fn is_tty(&self) -> bool {
        self.draw
    }

    /// Shared with the log bridge so log lines suspend the bars.
    pub fn multi(&self) -> &MultiProgress {
        &self.multi
    }
}

impl Default for ProgressContext {
    fn default() -> Self {
        Self::new()
    }
}

pub type SharedProgress = Arc<ProgressContext>;

/// `1234567` as `1,234,567`.
pub fn fmt_num(n: usize) -> String {
    let digits = n.to_string();
    let head = digits.len() % 3;
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    out.push_str(&digits[..head]);
    for (i, chunk) in digits.as_bytes()[head..].chunks(3).enumerate() {
        if head > 0 || i > 0 {
            out.push(',');
        }
        // ASCII digits only
        out.extend(chunk.iter().map(|&b| b as char));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn separators() {
        let cases = [
            (0, "0"),
            (999, "999"),
            (1_000, "1,000"),
            (25_000, "25,000"),
            (250_123, "250,123"),
            (1_234_567, "1,234,567"),
        ];
        for (n, want) in cases {
            assert_eq!(fmt_num(n), want, "{n}");
        }
    }

    #[test]
    fn hidden_context_never_draws() {
        let ctx = ProgressContext::hidden();
        assert!(!ctx.is_tty());
        assert!(ctx.feed_bar("cves").is_hidden());
    }

    #[test]
    fn total_is_recorded_once() {
        let pb = ProgressBar::hidden();
        set_total(&pb, 250);
        pb.inc(10);
        set_total(&pb, 250);
        assert_eq!(pb.length(), Some(250));
        assert_eq!(pb.position(), 10);
    }
}
