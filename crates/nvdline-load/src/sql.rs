//! SQL generation for the CSV → SQLite upsert.
//!
//! Every column is TEXT; the first column is the primary key, so
//! `INSERT OR REPLACE` gives last-write-wins by identifier.

/// Make a CSV header usable as an SQL identifier.
///
/// Non-word characters become `_`; a leading digit gets a `_` prefix.
pub fn sanitize_identifier(name: &str) -> String {
    let mut out: String = name
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

fn quote(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// `CREATE TABLE IF NOT EXISTS` with the first column as primary key.
pub fn create_table(table: &str, columns: &[String]) -> String {
    let cols: Vec<String> = columns
        .iter()
        .enumerate()
        .map(|(i, c)| {
            if i == 0 {
                format!("{} TEXT PRIMARY KEY", quote(c))
            } else {
                format!("{} TEXT", quote(c))
            }
        })
        .collect();
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        quote(table),
        cols.join(", ")
    )
}

/// Positional upsert statement for every column.
pub fn upsert(table: &str, columns: &[String]) -> String {
    let names: Vec<String> = columns.iter().map(|c| quote(c)).collect();
    let params: Vec<String> = (1..=columns.len()).map(|i| format!("?{i}")).collect();
    format!(
        "INSERT OR REPLACE INTO {} ({}) VALUES ({})",
        quote(table),
        names.join(", "),
        params.join(", ")
    )
}

pub fn count(table: &str) -> String {
    format!("SELECT COUNT(*) FROM {}", quote(table))
}

/// First `limit` rows in insertion order.
pub fn top_rows(table: &str, limit: usize) -> String {
    format!("SELECT * FROM {} LIMIT {limit}", quote(table))
}
