pub mod fetch;
pub mod load;
pub mod show;

use clap::ValueEnum;
use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};

#[derive(Clone, Copy, ValueEnum, Debug)]
pub enum FeedArg {
    Cves,
    Cpes,
}

impl From<FeedArg> for nvdline_nvd::Feed {
    fn from(f: FeedArg) -> Self {
        match f {
            FeedArg::Cves => nvdline_nvd::Feed::Cves,
            FeedArg::Cpes => nvdline_nvd::Feed::Cpes,
        }
    }
}

#[derive(Clone, Copy, ValueEnum, Debug)]
pub enum ProjectionArg {
    Compact,
    Flattened,
}

impl From<ProjectionArg> for nvdline_nvd::Projection {
    fn from(p: ProjectionArg) -> Self {
        match p {
            ProjectionArg::Compact => nvdline_nvd::Projection::Compact,
            ProjectionArg::Flattened => nvdline_nvd::Projection::Flattened,
        }
    }
}

/// Styled table with the shared preset
pub fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(header.into_iter().map(|h| Cell::new(h).fg(Color::Cyan)));
    table
}

/// Print a key-value summary table on stderr
pub fn print_summary(title: &str, rows: &[(&str, String)]) {
    let mut table = new_table(vec![title, "Value"]);
    for (label, value) in rows {
        table.add_row(vec![Cell::new(label), Cell::new(value)]);
    }
    eprintln!("\n{table}");
}
