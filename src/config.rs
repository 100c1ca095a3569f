// ⚙️ Configuration - defaults ← TOML section ← environment ← CLI
// One TOML table per bank account; the CLI picks the table with --section

use crate::cli::Cli;
use crate::converter::ConverterOptions;
use crate::parser::CsvOptions;
use crate::render::RenderOptions;
use anyhow::{bail, Context, Result};
use chrono::format::{Item, StrftimeItems};
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file picked up from the working directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = "csv2ledger.toml";

/// Environment variable prefix, e.g. `CSV2LEDGER_ACCOUNT`
pub const ENV_PREFIX: &str = "CSV2LEDGER_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub account: String,
    pub mapping_file: Option<PathBuf>,
    pub ledger_file: Option<PathBuf>,
    pub skip_dupes: bool,

    // CSV dialect
    pub delimiter: char,
    pub skip_lines: usize,
    pub date: usize,
    pub effective_date: usize,
    pub desc: String,
    pub debit: usize,
    pub credit: usize,
    pub csv_date_format: String,
    pub csv_decimal_comma: bool,

    // Output
    pub ledger_date_format: Option<String>,
    pub ledger_decimal_comma: bool,
    pub currency: String,
    pub cleared_character: String,

    // Matching
    pub default_payee: String,
    pub default_expense: String,
    pub default_income: String,
    pub match_full_row: bool,
    pub reverse: bool,
    pub skip_older_than: Option<i64>,
}

impl Default for Config {
    fn default() -> Self {
        let csv = CsvOptions::default();
        let render = RenderOptions::default();
        let convert = ConverterOptions::default();

        Config {
            account: render.account,
            mapping_file: None,
            ledger_file: None,
            skip_dupes: convert.skip_dupes,
            delimiter: csv.delimiter,
            skip_lines: csv.skip_lines,
            date: csv.date_column,
            effective_date: csv.effective_date_column,
            desc: "2".to_string(),
            debit: csv.debit_column,
            credit: csv.credit_column,
            csv_date_format: csv.csv_date_format,
            csv_decimal_comma: csv.decimal_comma,
            ledger_date_format: render.ledger_date_format,
            ledger_decimal_comma: render.ledger_decimal_comma,
            currency: csv.currency,
            cleared_character: render.cleared_character,
            default_payee: convert.default_payee,
            default_expense: convert.default_expense,
            default_income: convert.default_income,
            match_full_row: convert.match_full_row,
            reverse: convert.reverse,
            skip_older_than: convert.skip_older_than,
        }
    }
}

impl Config {
    /// Layered provider chain; CLI values win over everything
    pub fn figment(config_file: Option<&Path>, cli: &Cli) -> Figment {
        let file = config_file.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));

        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(file).nested())
            .merge(Env::prefixed(ENV_PREFIX).global())
            .merge(Serialized::globals(cli))
    }

    /// Load and validate the configuration for one section
    pub fn load(cli: &Cli) -> Result<Self> {
        if let Some(path) = &cli.config {
            if !path.exists() {
                bail!("Config file not found: {}", path.display());
            }
        }

        let config: Config = Self::figment(cli.config.as_deref(), cli)
            .select(cli.section.as_str())
            .extract()
            .context("Invalid configuration")?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.delimiter.is_ascii() {
            bail!("Delimiter must be a single ASCII character, got {:?}", self.delimiter);
        }
        self.desc_columns()?;
        check_date_format("csv_date_format", &self.csv_date_format)?;
        if let Some(format) = &self.ledger_date_format {
            check_date_format("ledger_date_format", format)?;
        }
        if self.skip_older_than.is_some_and(|days| days < 0) {
            bail!("skip_older_than must not be negative");
        }
        Ok(())
    }

    /// `"2,5"` → `[2, 5]`
    pub fn desc_columns(&self) -> Result<Vec<usize>> {
        let columns = self
            .desc
            .split(',')
            .map(|part| {
                part.trim()
                    .parse::<usize>()
                    .with_context(|| format!("Invalid description column: {:?}", part))
            })
            .collect::<Result<Vec<_>>>()?;

        if columns.iter().any(|&column| column == 0) {
            bail!("Description columns are 1-based, got {:?}", self.desc);
        }
        Ok(columns)
    }

    pub fn csv_options(&self) -> Result<CsvOptions> {
        Ok(CsvOptions {
            delimiter: self.delimiter,
            skip_lines: self.skip_lines,
            date_column: self.date,
            effective_date_column: self.effective_date,
            desc_columns: self.desc_columns()?,
            debit_column: self.debit,
            credit_column: self.credit,
            csv_date_format: self.csv_date_format.clone(),
            decimal_comma: self.csv_decimal_comma,
            currency: self.currency.clone(),
        })
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            account: self.account.clone(),
            cleared_character: self.cleared_character.clone(),
            ledger_date_format: self.ledger_date_format.clone(),
            ledger_decimal_comma: self.ledger_decimal_comma,
        }
    }

    pub fn converter_options(&self) -> ConverterOptions {
        ConverterOptions {
            match_full_row: self.match_full_row,
            skip_dupes: self.skip_dupes,
            reverse: self.reverse,
            skip_older_than: self.skip_older_than,
            default_payee: self.default_payee.clone(),
            default_expense: self.default_expense.clone(),
            default_income: self.default_income.clone(),
        }
    }
}

fn check_date_format(name: &str, format: &str) -> Result<()> {
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        bail!("Invalid {}: {:?}", name, format);
    }
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
