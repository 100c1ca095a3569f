// 🏷️ Mapping Rules - Rules as Data
// Ordered pattern → payee/account mapping. First match in file order wins.

use crate::error::MappingError;
use regex::{Regex, RegexBuilder};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

// ============================================================================
// PATTERN
// ============================================================================

/// How a rule recognises a transaction description
#[derive(Debug, Clone)]
pub enum Pattern {
    /// Case-insensitive substring (stored lowercased)
    Substring(String),

    /// Case-insensitive regex, written as `/.../` in the mapping file
    Regex(Regex),
}

impl Pattern {
    /// Parse the pattern column of a mapping row
    pub fn parse(raw: &str) -> Result<Self, regex::Error> {
        let raw = raw.trim();

        if raw.len() >= 2 && raw.starts_with('/') && raw.ends_with('/') {
            let regex = RegexBuilder::new(&raw[1..raw.len() - 1])
                .case_insensitive(true)
                .build()?;
            return Ok(Pattern::Regex(regex));
        }

        Ok(Pattern::Substring(raw.to_lowercase()))
    }

    /// Check if pattern matches the given text
    pub fn matches(&self, text: &str) -> bool {
        match self {
            Pattern::Substring(needle) => text.to_lowercase().contains(needle.as_str()),
            Pattern::Regex(regex) => regex.is_match(text),
        }
    }

    /// Pattern as it would be written in a mapping file
    pub fn as_written(&self) -> String {
        match self {
            Pattern::Substring(needle) => needle.clone(),
            Pattern::Regex(regex) => format!("/{}/", regex.as_str()),
        }
    }
}

// ============================================================================
// RULE DEFINITION
// ============================================================================

#[derive(Debug, Clone)]
pub struct MappingRule {
    /// Pattern to match against the description
    pub pattern: Pattern,

    /// Payee written on the entry header
    pub payee: String,

    /// Account the transaction is booked against
    pub account: String,

    /// Ledger tags, in file order
    pub tags: Vec<String>,

    /// Account receiving the mirrored transfer entry
    pub transfer_to: Option<String>,

    /// File the mirrored entry goes to instead of the main output
    pub transfer_to_file: Option<String>,
}

impl MappingRule {
    pub fn new(pattern: Pattern, payee: impl Into<String>, account: impl Into<String>) -> Self {
        MappingRule {
            pattern,
            payee: payee.into(),
            account: account.into(),
            tags: Vec::new(),
            transfer_to: None,
            transfer_to_file: None,
        }
    }

    /// Builder pattern: add tags
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Builder pattern: mirror the entry into another account
    pub fn with_transfer_to(mut self, account: impl Into<String>) -> Self {
        self.transfer_to = Some(account.into());
        self
    }

    /// Builder pattern: send the mirrored entry to its own file
    pub fn with_transfer_to_file(mut self, file: impl Into<String>) -> Self {
        self.transfer_to_file = Some(file.into());
        self
    }

    pub fn matches(&self, text: &str) -> bool {
        self.pattern.matches(text)
    }
}

// ============================================================================
// RULE ENGINE
// ============================================================================

/// Immutable, ordered rule list loaded once per run
#[derive(Debug, Clone, Default)]
pub struct RuleEngine {
    rules: Vec<MappingRule>,
}

impl RuleEngine {
    /// Create a new empty rule engine
    pub fn new() -> Self {
        RuleEngine { rules: Vec::new() }
    }

    /// Load rules from a mapping file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, MappingError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| MappingError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let engine = Self::from_reader(file)?;
        debug!(path = %path.display(), rules = engine.rule_count(), "loaded mapping file");
        Ok(engine)
    }

    /// Parse mapping rows: `pattern,payee,account[,tags[,transfer_to[,transfer_to_file]]]`
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, MappingError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .comment(Some(b'#'))
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut rules = Vec::new();

        for result in reader.records() {
            let record = result.map_err(|source| MappingError::Csv {
                line: source.position().map(|p| p.line()).unwrap_or(0),
                source,
            })?;
            let line = record.position().map(|p| p.line()).unwrap_or(0);

            if record.len() < 3 {
                return Err(MappingError::MissingFields {
                    line,
                    found: record.len(),
                });
            }

            let raw_pattern = &record[0];
            if raw_pattern.is_empty() {
                return Err(MappingError::EmptyField { line, field: "pattern" });
            }
            if record[2].is_empty() {
                return Err(MappingError::EmptyField { line, field: "account" });
            }

            let pattern = Pattern::parse(raw_pattern).map_err(|source| {
                MappingError::InvalidRegex {
                    line,
                    pattern: raw_pattern.to_string(),
                    source,
                }
            })?;

            let mut rule = MappingRule::new(pattern, &record[1], &record[2]);
            rule.tags = record
                .get(3)
                .map(split_tags)
                .unwrap_or_default();
            rule.transfer_to = non_empty(record.get(4));
            rule.transfer_to_file = non_empty(record.get(5));

            rules.push(rule);
        }

        Ok(RuleEngine::from_rules(rules))
    }

    /// Create engine from a list of rules (order is kept)
    pub fn from_rules(rules: Vec<MappingRule>) -> Self {
        RuleEngine { rules }
    }

    /// Append a rule; it only wins when no earlier rule matches
    pub fn add_rule(&mut self, rule: MappingRule) {
        self.rules.push(rule);
    }

    /// First rule matching `text`, in file order
    pub fn find_match(&self, text: &str) -> Option<&MappingRule> {
        self.rules.iter().find(|rule| rule.matches(text))
    }

    /// First matching rule, or the caller's fallback
    pub fn classify<'a>(&'a self, text: &str, fallback: &'a MappingRule) -> &'a MappingRule {
        self.find_match(text).unwrap_or(fallback)
    }

    /// Get number of rules loaded
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn rules(&self) -> &[MappingRule] {
        &self.rules
    }
}

fn split_tags(field: &str) -> Vec<String> {
    field
        .split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

fn non_empty(field: Option<&str>) -> Option<String> {
    field.filter(|f| !f.is_empty()).map(str::to_string)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn substring(text: &str) -> Pattern {
        Pattern::parse(text).unwrap()
    }

    #[test]
    fn test_substring_pattern_is_case_insensitive() {
        let rule = MappingRule::new(substring("My Restaurant"), "My Restaurant", "Expenses:Dining");

        assert!(rule.matches("CREDIT CARD 15/12/2018 MY RESTAURANT"));
        assert!(rule.matches("my restaurant"));
        assert!(!rule.matches("RESTAURANT MY"));
    }

    #[test]
    fn test_regex_pattern() {
        let pattern = Pattern::parse("/^transfer (sent|received)/").unwrap();

        assert!(matches!(pattern, Pattern::Regex(_)));
        assert!(pattern.matches("TRANSFER SENT SAVINGS ACC"));
        assert!(pattern.matches("Transfer received MR UNKNOWN"));
        assert!(!pattern.matches("CARD TRANSFER SENT"));
        assert_eq!(pattern.as_written(), "/^transfer (sent|received)/");
    }

    #[test]
    fn test_single_slash_is_a_substring() {
        let pattern = Pattern::parse("/").unwrap();
        assert!(matches!(pattern, Pattern::Substring(_)));
        assert!(pattern.matches("15/03/2019"));
    }

    #[test]
    fn test_first_match_wins_in_file_order() {
        let mut engine = RuleEngine::new();
        engine.add_rule(MappingRule::new(substring("CARD"), "Card", "Expenses:Card"));
        engine.add_rule(MappingRule::new(substring("MY RESTAURANT"), "My Restaurant", "Expenses:Dining"));

        let rule = engine.find_match("CREDIT CARD 15/12/2018 MY RESTAURANT").unwrap();
        assert_eq!(rule.account, "Expenses:Card");
    }

    #[test]
    fn test_classify_falls_back() {
        let engine = RuleEngine::new();
        let fallback = MappingRule::new(substring(""), "Unknown Transfer", "Income:Unknown");

        let rule = engine.classify("TRANSFER RECEIVED MR UNKNOWN", &fallback);
        assert_eq!(rule.payee, "Unknown Transfer");
        assert_eq!(rule.account, "Income:Unknown");
    }

    #[test]
    fn test_tag_mapping() {
        let mapping = "\
RESTAURANT,My Restaurant,Expenses:Dining
SUPERMARKET,Groceries,Expenses:Food,\"tag1,tag2\"
";
        let engine = RuleEngine::from_reader(mapping.as_bytes()).unwrap();

        assert_eq!(engine.rule_count(), 2);
        assert!(engine.rules()[0].tags.is_empty());
        assert_eq!(engine.rules()[1].tags, vec!["tag1", "tag2"]);
    }

    #[test]
    fn test_transfer_mapping() {
        let mapping = "\
# comments and blank lines are ignored

RESTAURANT,My Restaurant,Expenses:Dining
SUPERMARKET,Groceries,Expenses:Food,\"tag1,tag2\"
SAVINGS,Savings,Transfers:Savings,\"tag3, tag4\",Assets:Bank:Savings
/^salary/,Employer,Income:Salary,tag1,Assets:Bank:Savings,savings.dat
";
        let engine = RuleEngine::from_reader(mapping.as_bytes()).unwrap();
        let rules = engine.rules();

        assert_eq!(rules.len(), 4);
        assert_eq!(rules[2].tags, vec!["tag3", "tag4"]);
        assert_eq!(rules[2].transfer_to.as_deref(), Some("Assets:Bank:Savings"));
        assert_eq!(rules[2].transfer_to_file, None);
        assert_eq!(rules[3].tags, vec!["tag1"]);
        assert_eq!(rules[3].transfer_to_file.as_deref(), Some("savings.dat"));
    }

    #[test]
    fn test_empty_optional_columns() {
        let engine = RuleEngine::from_reader("SAVINGS,Savings,Transfers:Savings,,,".as_bytes()).unwrap();
        let rule = &engine.rules()[0];

        assert!(rule.tags.is_empty());
        assert_eq!(rule.transfer_to, None);
        assert_eq!(rule.transfer_to_file, None);
    }

    #[test]
    fn test_missing_fields_rejected() {
        let mapping = "RESTAURANT,My Restaurant,Expenses:Dining\nBROKEN,Payee\n";
        let err = RuleEngine::from_reader(mapping.as_bytes()).unwrap_err();

        assert!(matches!(err, MappingError::MissingFields { line: 2, found: 2 }));
    }

    #[test]
    fn test_invalid_regex_rejected() {
        let err = RuleEngine::from_reader("/([a-z/,Payee,Expenses:Misc".as_bytes()).unwrap_err();
        assert!(matches!(err, MappingError::InvalidRegex { line: 1, .. }));
    }

    #[test]
    fn test_demo_mapping() {
        let engine = RuleEngine::from_file("demos/mapping.csv").unwrap();

        assert_eq!(engine.rule_count(), 3);
        assert_eq!(engine.rules()[0].tags, vec!["food", "eating-out"]);
        assert_eq!(
            engine.find_match("GROCER ON MAIN ST").map(|r| r.account.as_str()),
            Some("Expenses:Food")
        );
    }

    #[test]
    fn test_missing_file() {
        let err = RuleEngine::from_file("does/not/exist.csv").unwrap_err();
        assert!(matches!(err, MappingError::Io { .. }));
    }
}
