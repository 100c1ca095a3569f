// 🔁 Converter - read row → match → dedup-check → render → write
// Single pass, input order, a bad row never stops the run

use crate::deduplication::DeduplicationEngine;
use crate::parser::{CsvParser, RejectedRow};
use crate::render::Renderer;
use crate::rules::{MappingRule, Pattern, RuleEngine};
use anyhow::{Context, Result};
use chrono::{Duration, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::{BufRead, Write};
use tracing::{debug, info, warn};

// ============================================================================
// OPTIONS & RESULTS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConverterOptions {
    /// Match rules against the whole raw row instead of the description
    pub match_full_row: bool,

    /// Skip rows whose hash is already known
    pub skip_dupes: bool,

    /// Process rows last-first (for banks exporting newest first)
    pub reverse: bool,

    /// Ignore rows older than this many days
    pub skip_older_than: Option<i64>,

    pub default_payee: String,
    pub default_expense: String,
    pub default_income: String,
}

impl Default for ConverterOptions {
    fn default() -> Self {
        ConverterOptions {
            match_full_row: false,
            skip_dupes: false,
            reverse: false,
            skip_older_than: None,
            default_payee: "Unknown Transfer".to_string(),
            default_expense: "Expenses:Unknown".to_string(),
            default_income: "Income:Unknown".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConversionSummary {
    /// Non-blank data lines seen
    pub rows_read: usize,

    /// Entries written to the main output, mirrors included
    pub entries_written: usize,

    pub duplicates_skipped: usize,
    pub too_old_skipped: usize,

    /// Rows that fell back to the default rule
    pub unmatched: usize,

    pub rejected: Vec<RejectedRow>,

    /// Mirror entries per `transfer_to_file`, in output order
    pub redirected: BTreeMap<String, String>,
}

// ============================================================================
// CONVERTER
// ============================================================================

pub struct Converter {
    parser: CsvParser,
    rules: RuleEngine,
    renderer: Renderer,
    dedup: DeduplicationEngine,
    options: ConverterOptions,
    today: NaiveDate,
    unknown_expense: MappingRule,
    unknown_income: MappingRule,
}

impl Converter {
    pub fn new(
        parser: CsvParser,
        rules: RuleEngine,
        renderer: Renderer,
        options: ConverterOptions,
    ) -> Self {
        let fallback = |account: &str| {
            MappingRule::new(
                Pattern::Substring(String::new()),
                options.default_payee.clone(),
                account,
            )
        };
        let unknown_expense = fallback(&options.default_expense);
        let unknown_income = fallback(&options.default_income);

        Converter {
            parser,
            rules,
            renderer,
            dedup: DeduplicationEngine::new(),
            options,
            today: Local::now().date_naive(),
            unknown_expense,
            unknown_income,
        }
    }

    /// Builder pattern: hashes of an existing ledger
    pub fn with_dedup(mut self, dedup: DeduplicationEngine) -> Self {
        self.dedup = dedup;
        self
    }

    /// Builder pattern: reference date for `skip_older_than`
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Convert every row of `input`, writing ledger text to `out`
    pub fn convert<R: BufRead, W: Write>(&mut self, input: R, out: &mut W) -> Result<ConversionSummary> {
        let mut lines = self.parser.read_lines(input)?;
        if self.options.reverse {
            lines.reverse();
        }

        info!(
            rows = lines.len(),
            rules = self.rules.rule_count(),
            known_hashes = self.dedup.len(),
            "converting"
        );

        // Out-of-range ages mean no cutoff
        let cutoff = self.options.skip_older_than.and_then(|days| {
            Duration::try_days(days).and_then(|age| self.today.checked_sub_signed(age))
        });
        let mut summary = ConversionSummary::default();

        for line in lines {
            summary.rows_read += 1;

            let line = match line {
                Ok(line) => line,
                Err(rejected) => {
                    warn!(line = rejected.line_number, error = %rejected.error, "skipping unreadable row");
                    summary.rejected.push(rejected);
                    continue;
                }
            };

            let tx = match self.parser.parse(&line) {
                Ok(tx) => tx,
                Err(error) => {
                    warn!(line = line.line_number, error = %error, "skipping malformed row");
                    summary.rejected.push(RejectedRow {
                        line_number: line.line_number,
                        raw_line: line.text.clone(),
                        error,
                    });
                    continue;
                }
            };

            if cutoff.is_some_and(|cutoff| tx.date < cutoff) {
                debug!(line = tx.line_number, date = %tx.date, "skipping old row");
                summary.too_old_skipped += 1;
                continue;
            }

            let hash = tx.content_hash();
            if self.options.skip_dupes && self.dedup.is_duplicate(&hash) {
                debug!(line = tx.line_number, hash = %hash, "skipping duplicate");
                summary.duplicates_skipped += 1;
                continue;
            }

            let rule = match self.rules.find_match(tx.match_text(self.options.match_full_row)) {
                Some(rule) => rule,
                None => {
                    summary.unmatched += 1;
                    if tx.is_inflow() {
                        &self.unknown_income
                    } else {
                        &self.unknown_expense
                    }
                }
            };
            debug!(line = tx.line_number, payee = %tx.payee, account = %rule.account, "matched");

            let rendered = self.renderer.render(&tx, rule);

            write_entry(out, &rendered.entry.to_string())?;
            summary.entries_written += 1;

            if let Some(mirror) = rendered.transfer {
                match rendered.transfer_file {
                    Some(file) => summary
                        .redirected
                        .entry(file)
                        .or_default()
                        .push_str(&mirror.to_string()),
                    None => {
                        write_entry(out, &mirror.to_string())?;
                        summary.entries_written += 1;
                    }
                }
            }

            if self.options.skip_dupes {
                self.dedup.record(&hash);
            }
        }

        info!(
            written = summary.entries_written,
            duplicates = summary.duplicates_skipped,
            unmatched = summary.unmatched,
            rejected = summary.rejected.len(),
            "conversion finished"
        );

        Ok(summary)
    }
}

fn write_entry<W: Write>(out: &mut W, text: &str) -> Result<()> {
    out.write_all(text.as_bytes())
        .context("Failed to write ledger output")
}

/// Append mirrored transfer entries to their own files
pub fn append_redirected(summary: &ConversionSummary) -> Result<()> {
    for (file, text) in &summary.redirected {
        let mut handle = OpenOptions::new()
            .create(true)
            .append(true)
            .open(file)
            .with_context(|| format!("Failed to open transfer file: {}", file))?;
        handle
            .write_all(text.as_bytes())
            .with_context(|| format!("Failed to write transfer file: {}", file))?;
        debug!(file = %file, bytes = text.len(), "appended transfer entries");
    }
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
