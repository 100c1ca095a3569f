// 🔍 Deduplication Engine - Skip rows already in the ledger
// Identity is the MD5 of the raw CSV row, recorded as a `; MD5Sum:` comment

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Comment tag carrying the content hash in rendered entries
pub const HASH_TAG: &str = "MD5Sum:";

// ============================================================================
// DEDUPLICATION ENGINE
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct DeduplicationEngine {
    seen: HashSet<String>,
}

impl DeduplicationEngine {
    /// Create an empty index (nothing is a duplicate)
    pub fn new() -> Self {
        DeduplicationEngine {
            seen: HashSet::new(),
        }
    }

    /// Index every hash comment of an existing ledger file.
    ///
    /// A missing or unreadable file means "no prior entries".
    pub fn from_ledger_file<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(text) => {
                let engine = Self::from_ledger_text(&text);
                debug!(path = %path.display(), hashes = engine.len(), "indexed existing ledger");
                engine
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "cannot read ledger file, assuming no prior entries");
                Self::new()
            }
        }
    }

    /// Index every hash comment found in ledger text
    pub fn from_ledger_text(text: &str) -> Self {
        let seen = text.lines().filter_map(parse_hash_comment).map(str::to_string).collect();
        DeduplicationEngine { seen }
    }

    pub fn is_duplicate(&self, hash: &str) -> bool {
        self.seen.contains(hash)
    }

    /// Remember a hash; false if it was already known
    pub fn record(&mut self, hash: &str) -> bool {
        self.seen.insert(hash.to_string())
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// `    ; MD5Sum: ade6e0...` → `ade6e0...`
fn parse_hash_comment(line: &str) -> Option<&str> {
    let comment = line.trim_start().strip_prefix(';')?;
    let hash = comment.trim_start().strip_prefix(HASH_TAG)?.trim();

    if hash.is_empty() || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    Some(hash)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const LEDGER: &str = "\
15/03/2019 * My Restaurant
    ; MD5Sum: ade6e00119fe2b145ecddb30e50e2d4c
    ; CSV: 15/03/2019;CREDIT CARD 15/12/2018 MY RESTAURANT;;-92,90;EUR
    Expenses:Dining
    Assets:Bank:Current                                              -92.90

16/03/2019 * Unknown Transfer
    ; MD5Sum: 2313495c75e0d4794c1f445d585f34c4
    ; CSV: 16/03/2019;TRANSFER RECEIVED MR UNKNOWN;;250,73;EUR
    Income:Unknown
    Assets:Bank:Current                                              250.73
";

    #[test]
    fn test_index_from_ledger_text() {
        let engine = DeduplicationEngine::from_ledger_text(LEDGER);

        assert_eq!(engine.len(), 2);
        assert!(engine.is_duplicate("ade6e00119fe2b145ecddb30e50e2d4c"));
        assert!(engine.is_duplicate("2313495c75e0d4794c1f445d585f34c4"));
        assert!(!engine.is_duplicate("6b8159889e4f408c39dd85f19e3eab1a"));
    }

    #[test]
    fn test_other_comments_ignored() {
        let engine = DeduplicationEngine::from_ledger_text(
            "; MD5Sum:\n; CSV: MD5Sum: abc\n; MD5Sum: not-a-hash\n  ;MD5Sum:   abc123  \n",
        );

        assert_eq!(engine.len(), 1);
        assert!(engine.is_duplicate("abc123"));
    }

    #[test]
    fn test_record() {
        let mut engine = DeduplicationEngine::new();

        assert!(engine.is_empty());
        assert!(engine.record("abc"));
        assert!(!engine.record("abc"));
        assert!(engine.is_duplicate("abc"));
    }

    #[test]
    fn test_missing_ledger_fails_open() {
        let engine = DeduplicationEngine::from_ledger_file("does/not/exist.ledger");
        assert!(engine.is_empty());
    }

    #[test]
    fn test_ledger_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(LEDGER.as_bytes()).unwrap();

        let engine = DeduplicationEngine::from_ledger_file(file.path());
        assert_eq!(engine.len(), 2);
    }
}
