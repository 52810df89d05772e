//! Feed kinds and row layouts for NVD data processing

use std::fmt;

use arrow::datatypes::SchemaRef;

use crate::schema;

/// NVD 2.0 collections the pipeline can walk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feed {
    /// CVE records (`/cves/2.0`, items under `vulnerabilities`)
    Cves,
    /// CPE dictionary products (`/cpes/2.0`, items under `products`)
    Cpes,
}

impl Feed {
    pub fn name(self) -> &'static str {
        match self {
            Self::Cves => "cves",
            Self::Cpes => "cpes",
        }
    }

    /// Default REST endpoint
    pub fn default_url(self) -> &'static str {
        match self {
            Self::Cves => "https://services.nvd.nist.gov/rest/json/cves/2.0",
            Self::Cpes => "https://services.nvd.nist.gov/rest/json/cpes/2.0",
        }
    }

    /// Response key holding the page's items
    pub fn items_key(self) -> &'static str {
        match self {
            Self::Cves => "vulnerabilities",
            Self::Cpes => "products",
        }
    }

    /// Key of the record object inside each item
    pub fn object_key(self) -> &'static str {
        match self {
            Self::Cves => "cve",
            Self::Cpes => "cpe",
        }
    }
}

impl fmt::Display for Feed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How nested CVSS metrics are projected into the flat row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Projection {
    /// Keep `metrics`, `weaknesses`, `configurations`, `vendorComments` as JSON text
    #[default]
    Compact,
    /// Flatten `metrics.cvssMetricV31[0].cvssData` into named columns
    Flattened,
}

impl Projection {
    pub fn name(self) -> &'static str {
        match self {
            Self::Compact => "compact",
            Self::Flattened => "flattened",
        }
    }
}

impl fmt::Display for Projection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Feed + projection: fixes the column set of a normalized row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Layout {
    pub feed: Feed,
    pub projection: Projection,
}

impl Layout {
    pub fn new(feed: Feed, projection: Projection) -> Self {
        Self { feed, projection }
    }

    /// Column names in declared order
    pub fn columns(self) -> &'static [&'static str] {
        match (self.feed, self.projection) {
            (Feed::Cves, Projection::Compact) => schema::CVE_COMPACT_COLUMNS.as_slice(),
            (Feed::Cves, Projection::Flattened) => schema::CVE_FLATTENED_COLUMNS.as_slice(),
            (Feed::Cpes, _) => schema::CPE_COLUMNS,
        }
    }

    /// All-text Arrow schema for the CSV sink
    pub fn schema(self) -> SchemaRef {
        match (self.feed, self.projection) {
            (Feed::Cves, Projection::Compact) => schema::CVES_COMPACT.clone(),
            (Feed::Cves, Projection::Flattened) => schema::CVES_FLATTENED.clone(),
            (Feed::Cpes, _) => schema::CPES.clone(),
        }
    }

    /// Common prefix of the files and table for this layout.
    ///
    /// Each column set gets its own files, so a CSV header always matches
    /// its rows and each layout keeps its own watermark.
    fn stem(self) -> String {
        match (self.feed, self.projection) {
            (Feed::Cves, Projection::Flattened) => format!("nvd_{}_flattened", self.feed),
            _ => format!("nvd_{}", self.feed),
        }
    }

    /// Default output CSV filename
    pub fn output_file(self) -> String {
        format!("{}_data.csv", self.stem())
    }

    /// Default checkpoint filename
    pub fn checkpoint_file(self) -> String {
        format!("{}_checkpoint.csv", self.stem())
    }

    /// Default SQLite table name
    pub fn table_name(self) -> String {
        self.stem()
    }

    /// Position of the last-modified column
    pub fn last_modified_index(self) -> usize {
        schema::LAST_MODIFIED_INDEX
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.feed {
            Feed::Cves => write!(f, "{}/{}", self.feed, self.projection),
            Feed::Cpes => write!(f, "{}", self.feed),
        }
    }
}
