//! Record normalization: one upstream JSON item → one flat text row
//!
//! Never fails. Absent fields become [`NOT_AVAILABLE`]; values of an
//! unexpected JSON type are kept as their compact JSON text.

use serde_json::{Map, Value};

use crate::feed::{Feed, Layout, Projection};
use crate::schema::{CVE_BASE_FIELDS, CVE_BLOB_FIELDS, CVSS_V3_FIELDS};

/// Sentinel for fields absent from the upstream record
pub const NOT_AVAILABLE: &str = "N/A";

/// A normalized row. Values line up with `layout.columns()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    layout: Layout,
    values: Vec<String>,
}

impl Record {
    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// External key (column 0)
    pub fn id(&self) -> &str {
        &self.values[0]
    }

    pub fn last_modified(&self) -> &str {
        &self.values[self.layout.last_modified_index()]
    }

    /// Value of a named column
    pub fn get(&self, column: &str) -> Option<&str> {
        self.layout
            .columns()
            .iter()
            .position(|c| *c == column)
            .map(|i| self.values[i].as_str())
    }

    /// (column, value) pairs in declared order
    pub fn fields(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.layout
            .columns()
            .iter()
            .copied()
            .zip(self.values.iter().map(String::as_str))
    }

    pub fn into_values(self) -> Vec<String> {
        self.values
    }
}

/// Normalize one page item (`{"cve": {...}}` or `{"cpe": {...}}`).
pub fn normalize(layout: Layout, item: &Value) -> Record {
    let empty = Map::new();
    let obj = item
        .get(layout.feed.object_key())
        .and_then(Value::as_object)
        .unwrap_or(&empty);

    let values = match layout.feed {
        Feed::Cves => cve_row(obj, layout.projection),
        Feed::Cpes => cpe_row(obj),
    };
    debug_assert_eq!(values.len(), layout.columns().len());

    let record = Record { layout, values };
    if record.id() == NOT_AVAILABLE {
        log::warn!(
            "{} item without identifier, kept with {NOT_AVAILABLE}",
            layout.feed
        );
    }
    record
}

fn cve_row(cve: &Map<String, Value>, projection: Projection) -> Vec<String> {
    let mut row: Vec<String> = CVE_BASE_FIELDS
        .iter()
        .map(|(_, key)| text(cve.get(*key)))
        .collect();
    row.push(english(cve.get("descriptions"), "value"));
    row.push(reference_urls(cve.get("references")));

    match projection {
        Projection::Compact => {
            row.extend(CVE_BLOB_FIELDS.iter().map(|(_, key)| text(cve.get(*key))));
        }
        Projection::Flattened => {
            let empty = Map::new();
            let cvss = cve
                .get("metrics")
                .and_then(|m| m.get("cvssMetricV31"))
                .and_then(|list| list.get(0))
                .and_then(|metric| metric.get("cvssData"))
                .and_then(Value::as_object)
                .unwrap_or(&empty);
            row.extend(CVSS_V3_FIELDS.iter().map(|(_, key)| text(cvss.get(*key))));
        }
    }
    row
}

fn cpe_row(cpe: &Map<String, Value>) -> Vec<String> {
    let deprecated = match cpe.get("deprecated") {
        None | Some(Value::Null) => "false".to_string(),
        other => text(other),
    };
    vec![
        text(cpe.get("cpeName")),
        text(cpe.get("cpeNameId")),
        deprecated,
        text(cpe.get("created")),
        text(cpe.get("lastModified")),
        english(cpe.get("titles"), "title"),
    ]
}

/// Field as text: strings verbatim, other JSON as compact JSON, absent as sentinel
fn text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => NOT_AVAILABLE.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// First entry with `lang == "en"` in a localized collection
fn english(entries: Option<&Value>, value_key: &str) -> String {
    entries
        .and_then(Value::as_array)
        .and_then(|list| {
            list.iter()
                .find(|e| e.get("lang").and_then(Value::as_str) == Some("en"))
        })
        .map_or_else(|| NOT_AVAILABLE.to_string(), |e| text(e.get(value_key)))
}

/// All reference URLs joined with ", " (order preserved)
fn reference_urls(references: Option<&Value>) -> String {
    match references.and_then(Value::as_array) {
        Some(list) if !list.is_empty() => list
            .iter()
            .map(|r| text(r.get("url")))
            .collect::<Vec<_>>()
            .join(", "),
        Some(_) | None => NOT_AVAILABLE.to_string(),
    }
}
