// 🖨️ Ledger Renderer - Transaction + rule → ledger text
// Output is deterministic: same row, same rule, same options → same bytes

use crate::deduplication::HASH_TAG;
use crate::rules::MappingRule;
use crate::transaction::{Direction, Transaction};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write as _};

/// Width the account column is padded to
pub const ACCOUNT_WIDTH: usize = 60;

const INDENT: &str = "    ";

// ============================================================================
// RENDER OPTIONS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderOptions {
    /// Bank account the CSV belongs to (the balancing posting)
    pub account: String,

    /// Clear mark after the date; empty for none
    pub cleared_character: String,

    /// Re-format dates with this chrono format; `None` keeps the CSV text
    pub ledger_date_format: Option<String>,

    pub ledger_decimal_comma: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions {
            account: "Assets:Bank:Current".to_string(),
            cleared_character: "*".to_string(),
            ledger_date_format: None,
            ledger_decimal_comma: false,
        }
    }
}

// ============================================================================
// LEDGER ENTRY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Posting {
    pub account: String,

    /// Formatted amount; `None` lets ledger balance the entry
    pub amount: Option<String>,

    pub currency: String,
}

impl Posting {
    fn write_line(&self, out: &mut String) -> fmt::Result {
        match &self.amount {
            Some(amount) => {
                let line = format!(
                    "{INDENT}{:<width$}{INDENT}{} {}",
                    self.account,
                    self.currency,
                    amount,
                    width = ACCOUNT_WIDTH
                );
                writeln!(out, "{}", line.trim_end())
            }
            None => writeln!(out, "{INDENT}{}", self.account),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    /// `date` or `date=effective_date`, already formatted
    pub date: String,
    pub cleared: String,
    pub payee: String,
    pub comment_lines: Vec<String>,
    pub postings: Vec<Posting>,
}

impl fmt::Display for LedgerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();

        if self.cleared.is_empty() {
            writeln!(out, "{} {}", self.date, self.payee)?;
        } else {
            writeln!(out, "{} {} {}", self.date, self.cleared, self.payee)?;
        }
        for comment in &self.comment_lines {
            writeln!(out, "{INDENT}; {}", comment)?;
        }
        for posting in &self.postings {
            posting.write_line(&mut out)?;
        }
        out.push('\n');

        f.write_str(&out)
    }
}

/// What one transaction turns into
#[derive(Debug, Clone)]
pub struct RenderedTransaction {
    pub entry: LedgerEntry,

    /// Mirror entry for transfer rules
    pub transfer: Option<LedgerEntry>,

    /// Where the mirror goes; `None` means the main output
    pub transfer_file: Option<String>,
}

// ============================================================================
// RENDERER
// ============================================================================

pub struct Renderer {
    options: RenderOptions,
}

impl Renderer {
    pub fn new(options: RenderOptions) -> Self {
        Renderer { options }
    }

    /// Entry for the bank side plus, for transfer rules, its mirror
    pub fn render(&self, tx: &Transaction, rule: &MappingRule) -> RenderedTransaction {
        let entry = self.build_entry(tx, rule, &rule.account, &self.options.account);

        let transfer = rule
            .transfer_to
            .as_deref()
            .map(|target| self.build_entry(tx, rule, target, &rule.account));

        RenderedTransaction {
            entry,
            transfer,
            transfer_file: rule.transfer_to_file.clone(),
        }
    }

    /// `matched` takes the debit side, `balancing` the credit side
    fn build_entry(
        &self,
        tx: &Transaction,
        rule: &MappingRule,
        matched: &str,
        balancing: &str,
    ) -> LedgerEntry {
        let mut comment_lines = vec![
            format!("{} {}", HASH_TAG, tx.content_hash()),
            format!("CSV: {}", tx.raw_line.lines().collect::<Vec<_>>().join(" ")),
        ];
        if !rule.tags.is_empty() {
            comment_lines.push(format!(":{}:", rule.tags.join(":")));
        }

        let amount = Some(tx.amount.format(self.options.ledger_decimal_comma));
        let (matched_amount, balancing_amount) = match tx.direction {
            Direction::Debit => (amount, None),
            Direction::Credit => (None, amount),
        };

        let postings = vec![
            Posting {
                account: matched.to_string(),
                amount: matched_amount,
                currency: tx.currency.clone(),
            },
            Posting {
                account: balancing.to_string(),
                amount: balancing_amount,
                currency: tx.currency.clone(),
            },
        ];

        LedgerEntry {
            date: self.header_date(tx),
            cleared: self.options.cleared_character.clone(),
            payee: rule.payee.clone(),
            comment_lines,
            postings,
        }
    }

    fn header_date(&self, tx: &Transaction) -> String {
        let date = self.format_date(tx.date, &tx.date_text);
        match (tx.effective_date, tx.effective_date_text.as_deref()) {
            (Some(effective), Some(text)) => format!("{}={}", date, self.format_date(effective, text)),
            _ => date,
        }
    }

    /// Falls back to the CSV text if the format cannot be rendered
    fn format_date(&self, date: NaiveDate, csv_text: &str) -> String {
        let Some(format) = self.options.ledger_date_format.as_deref() else {
            return csv_text.to_string();
        };

        let mut out = String::new();
        match write!(out, "{}", date.format(format)) {
            Ok(()) => out,
            Err(_) => csv_text.to_string(),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{CsvOptions, CsvParser, RawLine};
    use crate::rules::Pattern;

    fn transaction(line: &str) -> Transaction {
        let parser = CsvParser::new(CsvOptions {
            delimiter: ';',
            debit_column: 0,
            csv_date_format: "%d/%m/%Y".to_string(),
            decimal_comma: true,
            ..CsvOptions::default()
        });
        parser
            .parse(&RawLine {
                line_number: 1,
                text: line.to_string(),
            })
            .unwrap()
    }

    fn rule(payee: &str, account: &str) -> MappingRule {
        MappingRule::new(Pattern::parse(payee).unwrap(), payee, account)
    }

    #[test]
    fn test_render_credit_row() {
        let renderer = Renderer::new(RenderOptions::default());
        let tx = transaction("15/03/2019;CREDIT CARD 15/12/2018 MY RESTAURANT;;-92,90;EUR");

        let rendered = renderer.render(&tx, &rule("My Restaurant", "Expenses:Dining"));

        assert_eq!(
            rendered.entry.to_string(),
            "15/03/2019 * My Restaurant
    ; MD5Sum: 480955ce2244c6242cbd93f0fa4607de
    ; CSV: 15/03/2019;CREDIT CARD 15/12/2018 MY RESTAURANT;;-92,90;EUR
    Expenses:Dining
    Assets:Bank:Current                                              -92.90

"
        );
        assert!(rendered.transfer.is_none());
    }

    #[test]
    fn test_render_debit_row_with_ledger_date_format() {
        let parser = CsvParser::new(CsvOptions {
            delimiter: ';',
            csv_date_format: "%d %b %Y".to_string(),
            ..CsvOptions::default()
        });
        let tx = parser
            .parse(&RawLine {
                line_number: 1,
                text: "10 Dec 2018 ; To John Doe  ; 20.75 ;  ".to_string(),
            })
            .unwrap();
        let renderer = Renderer::new(RenderOptions {
            ledger_date_format: Some("%Y/%m/%d".to_string()),
            ..RenderOptions::default()
        });

        let entry = renderer.render(&tx, &rule("Unknown Transfer", "Expenses:Unknown")).entry;
        let text = entry.to_string();

        assert!(text.starts_with("2018/12/10 * Unknown Transfer\n"));
        assert!(text.contains(
            "\n    Expenses:Unknown                                                 20.75\n    Assets:Bank:Current\n"
        ));
    }

    #[test]
    fn test_amount_column_is_fixed() {
        let renderer = Renderer::new(RenderOptions::default());
        let tx = transaction("16/03/2019;TRANSFER RECEIVED MR UNKNOWN;;250,73;EUR");

        let text = renderer.render(&tx, &rule("Unknown Transfer", "Income:Unknown")).entry.to_string();
        let amount_line = text.lines().find(|l| l.ends_with("250.73")).unwrap();

        assert_eq!(amount_line.find("250.73"), Some(4 + ACCOUNT_WIDTH + 4 + 1));
    }

    #[test]
    fn test_transfer_mirror_swaps_accounts() {
        let renderer = Renderer::new(RenderOptions::default());
        let tx = transaction("17/03/2019;TRANSFER SENT SAVINGS ACC;;-100,00;EUR");
        let rule = rule("Savings", "Transfers:Savings").with_transfer_to("Assets:Bank:Savings");

        let rendered = renderer.render(&tx, &rule);
        let mirror = rendered.transfer.unwrap();

        assert_eq!(rendered.entry.postings[0].account, "Transfers:Savings");
        assert_eq!(rendered.entry.postings[1].account, "Assets:Bank:Current");
        assert_eq!(mirror.postings[0].account, "Assets:Bank:Savings");
        assert_eq!(mirror.postings[1].account, "Transfers:Savings");
        assert_eq!(mirror.postings[1].amount.as_deref(), Some("-100.00"));
        assert_eq!(mirror.comment_lines, rendered.entry.comment_lines);
        assert_eq!(rendered.transfer_file, None);
    }

    #[test]
    fn test_tags_and_currency() {
        let renderer = Renderer::new(RenderOptions {
            cleared_character: String::new(),
            ..RenderOptions::default()
        });
        let mut tx = transaction("15/03/2019;CREDIT CARD MY RESTAURANT;;-92,90;EUR");
        tx.currency = "EUR".to_string();
        let rule = rule("My Restaurant", "Expenses:Dining").with_tags(["food", "eating-out"]);

        let text = renderer.render(&tx, &rule).entry.to_string();

        assert!(text.starts_with("15/03/2019 My Restaurant\n"));
        assert!(text.contains("\n    ; :food:eating-out:\n"));
        assert!(text.contains("    EUR -92.90\n"));
    }

    #[test]
    fn test_effective_date_in_header() {
        let parser = CsvParser::new(CsvOptions {
            effective_date_column: 5,
            ..CsvOptions::default()
        });
        let tx = parser
            .parse(&RawLine {
                line_number: 1,
                text: "2019-03-15,COFFEE,3.50,,2019-03-17".to_string(),
            })
            .unwrap();
        let renderer = Renderer::new(RenderOptions::default());

        let entry = renderer.render(&tx, &rule("Coffee", "Expenses:Coffee")).entry;
        assert_eq!(entry.date, "2019-03-15=2019-03-17");
    }
}
