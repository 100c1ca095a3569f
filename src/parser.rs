// 🏗️ CSV Parser - Bank export dialects
// Delimiter, skip-lines and column layout are configuration, not code

use crate::error::RowError;
use crate::transaction::{Amount, Direction, Transaction};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::io::BufRead;

// ============================================================================
// DIALECT OPTIONS
// ============================================================================

/// How to read one bank's CSV export. Columns are 1-based, 0 means "absent".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsvOptions {
    pub delimiter: char,
    pub skip_lines: usize,
    pub date_column: usize,
    pub effective_date_column: usize,
    pub desc_columns: Vec<usize>,
    pub debit_column: usize,
    pub credit_column: usize,
    pub csv_date_format: String,
    pub decimal_comma: bool,
    pub currency: String,
}

impl Default for CsvOptions {
    fn default() -> Self {
        CsvOptions {
            delimiter: ',',
            skip_lines: 0,
            date_column: 1,
            effective_date_column: 0,
            desc_columns: vec![2],
            debit_column: 3,
            credit_column: 4,
            csv_date_format: "%Y-%m-%d".to_string(),
            decimal_comma: false,
            currency: String::new(),
        }
    }
}

/// One non-blank input record, before field splitting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLine {
    /// 1-based line the record starts on
    pub line_number: u64,
    pub text: String,
}

/// A row that was reported and skipped
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedRow {
    pub line_number: u64,
    pub raw_line: String,
    pub error: RowError,
}

// ============================================================================
// PARSER
// ============================================================================

pub struct CsvParser {
    options: CsvOptions,
}

impl CsvParser {
    pub fn new(options: CsvOptions) -> Self {
        CsvParser { options }
    }

    /// Read every data record, dropping the first `skip_lines` lines and blank lines.
    ///
    /// Records may span lines when a quoted field holds a newline. Each one
    /// keeps its exact text (trimmed) because the content hash is taken over
    /// it. A record that is not valid UTF-8 comes back as a rejection so the
    /// caller can report it and keep going.
    pub fn read_lines<R: BufRead>(&self, mut reader: R) -> Result<Vec<Result<RawLine, RejectedRow>>> {
        let mut data = Vec::new();
        reader
            .read_to_end(&mut data)
            .context("Failed to read input")?;

        let body = &data[skip_lines_offset(&data, self.options.skip_lines)..];
        let mut records = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(self.delimiter_byte())
            .from_reader(body);

        let mut lines = Vec::new();
        let mut record = csv::ByteRecord::new();
        loop {
            let start = records.position().byte() as usize;
            let more = records
                .read_byte_record(&mut record)
                .with_context(|| format!("Failed to read input record at byte {}", start))?;
            if !more {
                break;
            }
            let end = (records.position().byte() as usize).min(body.len());

            let raw = &body[start..end];
            let text = raw.trim_ascii();
            if text.is_empty() {
                continue;
            }

            // Leading whitespace may hold blank lines the reader skipped
            let leading = raw.len() - raw.trim_ascii_start().len();
            let newlines = body[..start + leading].iter().filter(|&&b| b == b'\n').count();
            let line_number = (self.options.skip_lines + newlines + 1) as u64;

            lines.push(match std::str::from_utf8(text) {
                Ok(text) => Ok(RawLine {
                    line_number,
                    text: text.to_string(),
                }),
                Err(err) => Err(RejectedRow {
                    line_number,
                    raw_line: String::from_utf8_lossy(text).into_owned(),
                    error: RowError::InvalidUtf8 {
                        offset: err.valid_up_to(),
                    },
                }),
            });
        }

        Ok(lines)
    }

    /// Split one line into trimmed fields using the configured delimiter
    pub fn split_fields(&self, line: &str) -> Result<Vec<String>, RowError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(self.delimiter_byte())
            .trim(csv::Trim::All)
            .from_reader(line.as_bytes());

        let mut record = csv::StringRecord::new();
        match reader.read_record(&mut record) {
            Ok(true) => Ok(record.iter().map(str::to_string).collect()),
            Ok(false) => Ok(Vec::new()),
            Err(err) => Err(RowError::Syntax(err.to_string())),
        }
    }

    /// Turn one raw line into a transaction
    pub fn parse(&self, line: &RawLine) -> Result<Transaction, RowError> {
        let opts = &self.options;
        let fields = self.split_fields(&line.text)?;

        let date_text = field(&fields, opts.date_column)?.to_string();
        let date = self.parse_date(&date_text)?;

        let (effective_date, effective_date_text) = if opts.effective_date_column > 0 {
            let text = field(&fields, opts.effective_date_column)?.to_string();
            (Some(self.parse_date(&text)?), Some(text))
        } else {
            (None, None)
        };

        let mut parts = Vec::with_capacity(opts.desc_columns.len());
        for column in &opts.desc_columns {
            let part = field(&fields, *column)?;
            if !part.is_empty() {
                parts.push(part);
            }
        }
        let payee = parts.join(" ");

        let (amount, direction) = self.pick_amount(&fields)?;

        Ok(Transaction {
            line_number: line.line_number,
            date,
            date_text,
            effective_date,
            effective_date_text,
            payee,
            raw_fields: fields,
            raw_line: line.text.clone(),
            amount,
            direction,
            currency: opts.currency.clone(),
        })
    }

    /// A non-zero debit wins; otherwise the credit column is used
    fn pick_amount(&self, fields: &[String]) -> Result<(Amount, Direction), RowError> {
        let opts = &self.options;

        let debit = match opts.debit_column {
            0 => None,
            column => Amount::parse(field(fields, column)?, opts.decimal_comma)?,
        };
        let credit = match opts.credit_column {
            0 => None,
            column => Amount::parse(field(fields, column)?, opts.decimal_comma)?,
        };

        match (debit, credit) {
            (Some(debit), _) if !debit.is_zero() => Ok((debit, Direction::Debit)),
            (_, Some(credit)) => Ok((credit, Direction::Credit)),
            (Some(debit), None) => Ok((debit, Direction::Debit)),
            (None, None) => Err(RowError::NoAmount),
        }
    }

    fn parse_date(&self, text: &str) -> Result<NaiveDate, RowError> {
        NaiveDate::parse_from_str(text, &self.options.csv_date_format).map_err(|_| {
            RowError::BadDate {
                text: text.to_string(),
                format: self.options.csv_date_format.clone(),
            }
        })
    }

    fn delimiter_byte(&self) -> u8 {
        u8::try_from(self.options.delimiter).unwrap_or(b',')
    }
}

/// Byte offset just past the first `skip_lines` physical lines
fn skip_lines_offset(data: &[u8], skip_lines: usize) -> usize {
    if skip_lines == 0 {
        return 0;
    }
    data.iter()
        .enumerate()
        .filter(|&(_, &b)| b == b'\n')
        .nth(skip_lines - 1)
        .map_or(data.len(), |(index, _)| index + 1)
}

/// 1-based column lookup
fn field(fields: &[String], column: usize) -> Result<&str, RowError> {
    column
        .checked_sub(1)
        .and_then(|index| fields.get(index))
        .map(String::as_str)
        .ok_or(RowError::MissingColumn {
            column,
            found: fields.len(),
        })
}

// ============================================================================
// TESTS
// ============================================================================
