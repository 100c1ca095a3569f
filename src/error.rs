// ⚠️ Error Types
// Fatal mapping errors vs. recoverable per-row errors

use std::path::PathBuf;

/// Problems with the mapping file. Always fatal: reported before any row is read.
#[derive(Debug, thiserror::Error)]
pub enum MappingError {
    #[error("Failed to read mapping file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Mapping line {line}: {source}")]
    Csv {
        line: u64,
        #[source]
        source: csv::Error,
    },
    #[error("Mapping line {line}: expected at least pattern, payee and account, got {found} field(s)")]
    MissingFields { line: u64, found: usize },
    #[error("Mapping line {line}: empty {field}")]
    EmptyField { line: u64, field: &'static str },
    #[error("Mapping line {line}: invalid regex {pattern:?}: {source}")]
    InvalidRegex {
        line: u64,
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Problems with a single CSV row. The row is skipped and the run continues.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RowError {
    #[error("CSV syntax error: {0}")]
    Syntax(String),
    #[error("column {column} requested but row only has {found} field(s)")]
    MissingColumn { column: usize, found: usize },
    #[error("cannot parse date {text:?} with format {format:?}")]
    BadDate { text: String, format: String },
    #[error("no debit or credit amount")]
    NoAmount,
    #[error("cannot parse amount {0:?}")]
    BadAmount(String),
    #[error("not valid UTF-8 (first bad byte at offset {offset})")]
    InvalidUtf8 { offset: usize },
}
