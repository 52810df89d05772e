//! Column layouts and Arrow schemas for normalized NVD rows
//!
//! Every column is text: the CSV sink stores what the upstream sent,
//! with `N/A` in place of absent fields.

use std::sync::LazyLock;

use arrow::datatypes::SchemaRef;
use nvdline_core::text_schema;

/// Column every layout uses for the checkpoint watermark
pub const LAST_MODIFIED_COLUMN: &str = "Last Modified Date";

/// Position of [`LAST_MODIFIED_COLUMN`], the same in every layout
pub const LAST_MODIFIED_INDEX: usize = 4;

/// CVE columns shared by both projections: (column, key inside the `cve` object)
pub const CVE_BASE_FIELDS: &[(&str, &str)] = &[
    ("CVE ID", "id"),
    ("Source Identifier", "sourceIdentifier"),
    ("Vulnerability Status", "vulnStatus"),
    ("Published Date", "published"),
    (LAST_MODIFIED_COLUMN, "lastModified"),
    ("Evaluator Comment", "evaluatorComment"),
    ("Evaluator Solution", "evaluatorSolution"),
    ("Evaluator Impact", "evaluatorImpact"),
    ("CISA Exploit Add", "cisaExploitAdd"),
    ("CISA Action Due", "cisaActionDue"),
    ("CISA Required Action", "cisaRequiredAction"),
    ("CISA Vulnerability Name", "cisaVulnerabilityName"),
    ("CVE Tags", "cveTags"),
];

/// Derived CVE columns following the base fields
pub const DESCRIPTION_COLUMN: &str = "Description";
pub const REFERENCES_COLUMN: &str = "References";

/// Nested collections kept as JSON text in the compact projection
pub const CVE_BLOB_FIELDS: &[(&str, &str)] = &[
    ("Metrics", "metrics"),
    ("Weaknesses", "weaknesses"),
    ("Configurations", "configurations"),
    ("Vendor Comments", "vendorComments"),
];

/// `metrics.cvssMetricV31[0].cvssData` keys flattened in the flattened projection
pub const CVSS_V3_FIELDS: &[(&str, &str)] = &[
    ("CVSSv3 Version", "version"),
    ("CVSSv3 Vector String", "vectorString"),
    ("CVSSv3 Attack Vector", "attackVector"),
    ("CVSSv3 Attack Complexity", "attackComplexity"),
    ("CVSSv3 Privileges Required", "privilegesRequired"),
    ("CVSSv3 User Interaction", "userInteraction"),
    ("CVSSv3 Scope", "scope"),
    ("CVSSv3 Confidentiality Impact", "confidentialityImpact"),
    ("CVSSv3 Integrity Impact", "integrityImpact"),
    ("CVSSv3 Availability Impact", "availabilityImpact"),
    ("CVSSv3 Base Score", "baseScore"),
    ("CVSSv3 Base Severity", "baseSeverity"),
    ("CVSSv3 Exploit Code Maturity", "exploitCodeMaturity"),
    ("CVSSv3 Remediation Level", "remediationLevel"),
    ("CVSSv3 Report Confidence", "reportConfidence"),
    ("CVSSv3 Temporal Score", "temporalScore"),
    ("CVSSv3 Temporal Severity", "temporalSeverity"),
    ("CVSSv3 Confidentiality Requirement", "confidentialityRequirement"),
    ("CVSSv3 Integrity Requirement", "integrityRequirement"),
    ("CVSSv3 Availability Requirement", "availabilityRequirement"),
    ("CVSSv3 Modified Attack Vector", "modifiedAttackVector"),
    ("CVSSv3 Modified Attack Complexity", "modifiedAttackComplexity"),
    ("CVSSv3 Modified Privileges Required", "modifiedPrivilegesRequired"),
    ("CVSSv3 Modified User Interaction", "modifiedUserInteraction"),
    ("CVSSv3 Modified Scope", "modifiedScope"),
    ("CVSSv3 Modified Confidentiality Impact", "modifiedConfidentialityImpact"),
    ("CVSSv3 Modified Integrity Impact", "modifiedIntegrityImpact"),
    ("CVSSv3 Modified Availability Impact", "modifiedAvailabilityImpact"),
    ("CVSSv3 Environmental Score", "environmentalScore"),
    ("CVSSv3 Environmental Severity", "environmentalSeverity"),
];

/// CPE product columns
pub const CPE_COLUMNS: &[&str] = &[
    "CPE Name",
    "CPE Name ID",
    "Deprecated",
    "Created Date",
    LAST_MODIFIED_COLUMN,
    "Title",
];

fn cve_columns(tail: &[(&'static str, &'static str)]) -> Vec<&'static str> {
    CVE_BASE_FIELDS
        .iter()
        .map(|(col, _)| *col)
        .chain([DESCRIPTION_COLUMN, REFERENCES_COLUMN])
        .chain(tail.iter().map(|(col, _)| *col))
        .collect()
}

pub static CVE_COMPACT_COLUMNS: LazyLock<Vec<&'static str>> =
    LazyLock::new(|| cve_columns(CVE_BLOB_FIELDS));

pub static CVE_FLATTENED_COLUMNS: LazyLock<Vec<&'static str>> =
    LazyLock::new(|| cve_columns(CVSS_V3_FIELDS));

pub static CVES_COMPACT: LazyLock<SchemaRef> =
    LazyLock::new(|| text_schema(&CVE_COMPACT_COLUMNS));

pub static CVES_FLATTENED: LazyLock<SchemaRef> =
    LazyLock::new(|| text_schema(&CVE_FLATTENED_COLUMNS));

pub static CPES: LazyLock<SchemaRef> = LazyLock::new(|| text_schema(CPE_COLUMNS));
