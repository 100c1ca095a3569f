// 💶 Transaction Model - One CSV row, parsed
// Amounts stay decimal end to end; the content hash identifies the raw row

use crate::error::RowError;
use bigdecimal::{BigDecimal, RoundingMode, Signed, Zero};
use chrono::NaiveDate;
use md5::{Digest, Md5};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// AMOUNT
// ============================================================================

/// Decimal amount as found in a debit or credit column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Amount(BigDecimal);

impl Amount {
    /// Clean up a bank amount and parse it.
    ///
    /// `(12.50)` means `-12.50`. Anything other than digits, `-` and the
    /// decimal separator is dropped, so `$1,250.00` and `1 250,00 €` both
    /// work. Returns `Ok(None)` when nothing numeric is left.
    pub fn parse(raw: &str, decimal_comma: bool) -> Result<Option<Self>, RowError> {
        let raw = raw.trim();
        let negated;
        let raw = if raw.len() >= 2 && raw.starts_with('(') && raw.ends_with(')') {
            negated = format!("-{}", &raw[1..raw.len() - 1]);
            negated.as_str()
        } else {
            raw
        };

        let separator = if decimal_comma { ',' } else { '.' };
        let cleaned: String = raw
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '-' || *c == separator)
            .map(|c| if c == ',' { '.' } else { c })
            .collect();

        if cleaned.is_empty() || cleaned == "-" {
            return Ok(None);
        }

        BigDecimal::from_str(&cleaned)
            .map(|value| Some(Amount(value)))
            .map_err(|_| RowError::BadAmount(raw.to_string()))
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_negative()
    }

    /// Fixed two decimal places, decimal point or comma
    pub fn format(&self, decimal_comma: bool) -> String {
        let text = self
            .0
            .with_scale_round(2, RoundingMode::HalfEven)
            .to_string();
        if decimal_comma {
            text.replace('.', ",")
        } else {
            text
        }
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format(false))
    }
}

// ============================================================================
// TRANSACTION
// ============================================================================

/// Which column the amount came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Debit column: the amount lands on the matched account
    Debit,

    /// Credit column: the amount lands on the bank account
    Credit,
}

#[derive(Debug, Clone)]
pub struct Transaction {
    /// 1-based line in the input file
    pub line_number: u64,

    pub date: NaiveDate,

    /// Date exactly as written in the CSV
    pub date_text: String,

    pub effective_date: Option<NaiveDate>,
    pub effective_date_text: Option<String>,

    /// Description columns joined with a space
    pub payee: String,

    pub raw_fields: Vec<String>,

    /// The row exactly as read, without line terminator
    pub raw_line: String,

    pub amount: Amount,
    pub direction: Direction,
    pub currency: String,
}

impl Transaction {
    /// MD5 of the raw row, written into the `; MD5Sum:` comment
    pub fn content_hash(&self) -> String {
        content_hash(&self.raw_line)
    }

    /// True when money flows into the bank account
    pub fn is_inflow(&self) -> bool {
        match self.direction {
            Direction::Credit => !self.amount.is_negative(),
            Direction::Debit => self.amount.is_negative(),
        }
    }

    /// Text the mapping rules are matched against
    pub fn match_text(&self, full_row: bool) -> &str {
        if full_row {
            &self.raw_line
        } else {
            &self.payee
        }
    }
}

pub fn content_hash(raw_line: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(raw_line.as_bytes());
    format!("{:x}", hasher.finalize())
}

// ============================================================================
// TESTS
// ============================================================================
