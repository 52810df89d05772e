//! stderr logging for the `log` facade.
//!
//! Filtering is env_logger's (`RUST_LOG` overrides the CLI flags). On a
//! terminal, lines go through the progress bars' [`MultiProgress`] so a log
//! line never lands in the middle of a redraw.

use std::fmt;

use indicatif::MultiProgress;
use log::Level;

/// HTTP stack crates that flood `debug` with connection chatter.
const NOISY_TARGETS: &[&str] = &["hyper", "hyper_util", "reqwest", "rustls", "h2"];

/// Filter directive for the given CLI flags.
fn filter_directive(quiet: bool, debug: bool) -> String {
    let base = match (debug, quiet) {
        (true, _) => "debug",
        (false, true) => "warn",
        (false, false) => "info",
    };
    if !debug {
        return base.to_string();
    }
    NOISY_TARGETS
        .iter()
        .fold(base.to_string(), |acc, t| format!("{acc},{t}=info"))
}

/// How one record is laid out on a line.
#[derive(Debug, Clone, Copy)]
struct LineFormat {
    ansi: bool,
    target: bool,
}

impl LineFormat {
    fn tag(level: Level) -> &'static str {
        match level {
            Level::Error => "ERROR",
            Level::Warn => "WARN",
            Level::Info => "INFO",
            Level::Debug => "DEBUG",
            Level::Trace => "TRACE",
        }
    }

    fn color(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1b[1;31m",
            Level::Warn => "\x1b[33m",
            Level::Info => "\x1b[32m",
            Level::Debug => "\x1b[34m",
            Level::Trace => "\x1b[2m",
        }
    }

    fn render(&self, level: Level, target: &str, args: &fmt::Arguments<'_>) -> String {
        let tag = Self::tag(level);
        let mut line = if self.ansi {
            format!("{}{tag:<5}\x1b[0m ", Self::color(level))
        } else {
            format!("{tag:<5} ")
        };
        if self.target {
            line.push_str(target);
            line.push_str(": ");
        }
        line.push_str(&args.to_string());
        line
    }
}

/// Writes records above the progress bars of a [`MultiProgress`].
pub struct IndicatifLogger {
    filter: env_logger::Logger,
    multi: MultiProgress,
    format: LineFormat,
}

impl IndicatifLogger {
    pub fn new(filter: env_logger::Logger, multi: MultiProgress, debug: bool) -> Self {
        Self {
            filter,
            multi,
            format: LineFormat {
                ansi: true,
                target: debug,
            },
        }
    }
}

impl log::Log for IndicatifLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.filter.enabled(metadata)
    }

    fn log(&self, record: &log::Record) {
        if !self.filter.matches(record) {
            return;
        }
        let line = self
            .format
            .render(record.level(), record.target(), record.args());
        self.multi.suspend(|| eprintln!("{line}"));
    }

    fn flush(&self) {}
}

/// Install the global logger.
///
/// `multi` is the bars' handle on a terminal, `None` otherwise. A second
/// call is a no-op.
pub fn init_logging(quiet: bool, debug: bool, multi: Option<&MultiProgress>) {
    use std::io::Write;

    let directive = filter_directive(quiet, debug);
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(directive));

    let Some(multi) = multi else {
        let format = LineFormat {
            ansi: false,
            target: debug,
        };
        let _ = builder
            .format(move |buf, record| {
                let ts = buf.timestamp_millis();
                let line = format.render(record.level(), record.target(), record.args());
                writeln!(buf, "{ts} {line}")
            })
            .try_init();
        return;
    };

    let filter = builder.build();
    let max_level = filter.filter();
    let logger = IndicatifLogger::new(filter, multi.clone(), debug);
    if log::set_boxed_logger(Box::new(logger)).is_ok() {
        log::set_max_level(max_level);
    }
}
