//! Wildcard name matching.
//!
//! Formula names are matched against character entries case-insensitively
//! from the start of the entry name. `*` matches any run of characters;
//! every other character is literal. So `"Sword"` matches
//! `"Sword (Thrust)"` and `"*Thrust*"` matches it too.

use crate::error::OtfError;
use regex_lite::{Regex, RegexBuilder};

/// A compiled, case-insensitive wildcard pattern.
///
/// # Examples
///
/// ```rust
/// use otf_engine::NameMatcher;
///
/// let matcher = NameMatcher::new("broad*").unwrap();
/// assert!(matcher.is_match("Broadsword (Swing)"));
/// assert!(!matcher.is_match("Shortsword"));
/// ```
#[derive(Debug, Clone)]
pub struct NameMatcher {
    pattern: String,
    regex: Regex,
}

impl NameMatcher {
    /// Compile a wildcard pattern.
    pub fn new(pattern: &str) -> Result<Self, OtfError> {
        let body = pattern
            .split('*')
            .map(regex_lite::escape)
            .collect::<Vec<_>>()
            .join(".*?");
        let regex = RegexBuilder::new(&format!("^{}", body))
            .case_insensitive(true)
            .build()
            .map_err(|_| OtfError::InvalidPattern(pattern.to_string()))?;
        Ok(Self {
            pattern: pattern.to_string(),
            regex,
        })
    }

    /// Whether `name` matches this pattern.
    pub fn is_match(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }

    /// The pattern as written.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}
