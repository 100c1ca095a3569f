// 🖥️ Command line
// Every option here can also come from the config file or the environment

use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;

fn is_false(value: &bool) -> bool {
    !*value
}

/// Convert a bank CSV export into ledger entries
#[derive(Debug, Default, Parser, Serialize)]
#[command(name = "csv2ledger", version)]
pub struct Cli {
    /// CSV file to read; stdin when absent or `-`
    #[arg(value_name = "INFILE")]
    #[serde(skip)]
    pub infile: Option<PathBuf>,

    /// Ledger file to append to; stdout when absent
    #[arg(short, long, value_name = "FILE")]
    #[serde(skip)]
    pub outfile: Option<PathBuf>,

    /// TOML config file (defaults to ./csv2ledger.toml when present)
    #[arg(short, long, value_name = "FILE")]
    #[serde(skip)]
    pub config: Option<PathBuf>,

    /// Config section to use, typically one per bank account
    #[arg(short, long, default_value = "default")]
    #[serde(skip)]
    pub section: String,

    /// Only report warnings and errors
    #[arg(short, long)]
    #[serde(skip)]
    pub quiet: bool,

    /// Log every match and dedup decision
    #[arg(short, long, conflicts_with = "quiet")]
    #[serde(skip)]
    pub verbose: bool,

    // ------------------------------------------------------------------
    // Config overrides
    // ------------------------------------------------------------------
    /// Bank account the CSV belongs to
    #[arg(short, long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,

    /// Pattern → payee/account mapping file
    #[arg(short, long, value_name = "FILE")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mapping_file: Option<PathBuf>,

    /// Existing ledger scanned for already-imported rows
    #[arg(short, long, value_name = "FILE")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ledger_file: Option<PathBuf>,

    /// Skip rows whose hash is already in the ledger file
    #[arg(long)]
    #[serde(skip_serializing_if = "is_false")]
    pub skip_dupes: bool,

    /// CSV field delimiter
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<char>,

    /// Lines to skip at the start of the CSV (headers)
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_lines: Option<usize>,

    /// Date column (1-based)
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<usize>,

    /// Effective date column (1-based, 0 for none)
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_date: Option<usize>,

    /// Description columns, e.g. `2` or `2,5`
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,

    /// Debit column (1-based, 0 for none)
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debit: Option<usize>,

    /// Credit column (1-based, 0 for none)
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credit: Option<usize>,

    /// chrono format of CSV dates, e.g. `%d/%m/%Y`
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub csv_date_format: Option<String>,

    /// chrono format for ledger dates; CSV text is kept when unset
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ledger_date_format: Option<String>,

    /// CSV amounts use a decimal comma
    #[arg(long)]
    #[serde(skip_serializing_if = "is_false")]
    pub csv_decimal_comma: bool,

    /// Write amounts with a decimal comma
    #[arg(long)]
    #[serde(skip_serializing_if = "is_false")]
    pub ledger_decimal_comma: bool,

    /// Commodity written before amounts
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,

    /// Clear mark after the date
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cleared_character: Option<String>,

    /// Payee for rows no rule matches
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_payee: Option<String>,

    /// Account for unmatched outgoing rows
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_expense: Option<String>,

    /// Account for unmatched incoming rows
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_income: Option<String>,

    /// Match rules against the whole CSV row
    #[arg(long)]
    #[serde(skip_serializing_if = "is_false")]
    pub match_full_row: bool,

    /// Process rows last-first
    #[arg(long)]
    #[serde(skip_serializing_if = "is_false")]
    pub reverse: bool,

    /// Ignore rows older than this many days
    #[arg(long, value_name = "DAYS")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_older_than: Option<i64>,
}

impl Cli {
    /// Input path, with `-` meaning stdin
    pub fn input_path(&self) -> Option<&PathBuf> {
        self.infile.as_ref().filter(|path| path.as_os_str() != "-")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flags() {
        let cli = Cli::parse_from([
            "csv2ledger",
            "bank.csv",
            "--delimiter",
            ";",
            "--csv-decimal-comma",
            "--debit",
            "0",
            "-m",
            "mapping.csv",
        ]);

        assert_eq!(cli.infile, Some(PathBuf::from("bank.csv")));
        assert_eq!(cli.delimiter, Some(';'));
        assert!(cli.csv_decimal_comma);
        assert_eq!(cli.debit, Some(0));
        assert_eq!(cli.mapping_file, Some(PathBuf::from("mapping.csv")));
        assert_eq!(cli.section, "default");
    }

    #[test]
    fn test_dash_means_stdin() {
        let cli = Cli::parse_from(["csv2ledger", "-"]);
        assert_eq!(cli.input_path(), None);
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["csv2ledger", "-q", "-v"]).is_err());
    }
}
