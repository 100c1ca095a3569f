// csv2ledger - Core Library
// Bank CSV → ledger text: mapping rules, rendering, hash-based dedup

pub mod cli;
pub mod config;
pub mod converter;
pub mod deduplication;
pub mod error;
pub mod parser;
pub mod render;
pub mod rules;
pub mod transaction;

// Re-export commonly used types
pub use cli::Cli;
pub use config::Config;
pub use converter::{append_redirected, ConversionSummary, Converter, ConverterOptions};
pub use deduplication::DeduplicationEngine;
pub use error::{MappingError, RowError};
pub use parser::{CsvOptions, CsvParser, RawLine, RejectedRow};
pub use render::{LedgerEntry, Posting, RenderOptions, RenderedTransaction, Renderer};
pub use rules::{MappingRule, Pattern, RuleEngine};
pub use transaction::{content_hash, Amount, Direction, Transaction};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
