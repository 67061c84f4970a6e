use regex::bytes::Regex;

use crate::errors::{ScanError, ScanResult};

/// Substring matcher for a literal pattern over raw line bytes
///
/// The pattern is escaped before compilation, so characters such as `.` or
/// `*` only ever match themselves. Lines are matched as bytes and do not need
/// to be valid UTF-8.
#[derive(Debug, Clone)]
pub struct LiteralMatcher {
    pattern: String,
    regex: Regex,
}

impl LiteralMatcher {
    /// Creates a matcher for `pattern`. An empty pattern is rejected.
    pub fn new(pattern: &str) -> ScanResult<Self> {
        if pattern.is_empty() {
            return Err(ScanError::invalid_pattern("pattern must not be empty"));
        }
        let regex = Regex::new(&regex::escape(pattern))
            .map_err(|e| ScanError::invalid_pattern(e.to_string()))?;
        Ok(Self {
            pattern: pattern.to_string(),
            regex,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Returns `true` if `line` contains the pattern
    pub fn is_match(&self, line: &[u8]) -> bool {
        self.regex.is_match(line)
    }
}
