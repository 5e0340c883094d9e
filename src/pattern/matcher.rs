//! Pattern matcher implementations

use crate::result::PatternError;
use memchr::memmem::Finder;
use regex::bytes::Regex;

/// Result of a pattern match
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    /// Start position of the match
    pub start: usize,
    /// End position of the match
    pub end: usize,
    /// Captured groups (for regex)
    pub captures: Vec<String>,
}

/// Trait for pattern matching
pub trait Matcher: Send + Sync {
    /// Find the first match in the buffer
    fn find(&self, buffer: &[u8]) -> Option<Match>;
}

/// Literal substring matcher backed by `memchr::memmem`.
pub struct ExactMatcher {
    finder: Finder<'static>,
    len: usize,
}

impl ExactMatcher {
    /// Create a new exact matcher
    pub fn new(pattern: impl AsRef<[u8]>) -> Result<Self, PatternError> {
        let pattern = pattern.as_ref();
        if pattern.is_empty() {
            return Err(PatternError::EmptyPattern);
        }

        Ok(Self {
            finder: Finder::new(pattern).into_owned(),
            len: pattern.len(),
        })
    }
}

impl Matcher for ExactMatcher {
    fn find(&self, buffer: &[u8]) -> Option<Match> {
        self.finder.find(buffer).map(|start| Match {
            start,
            end: start + self.len,
            captures: vec![],
        })
    }
}

/// Regex matcher over raw bytes, so stray non-UTF-8 output does not hide a match.
pub struct RegexMatcher {
    regex: Regex,
}

impl RegexMatcher {
    /// Compile a new regex matcher
    pub fn new(pattern: &str) -> Result<Self, PatternError> {
        Ok(Self {
            regex: Regex::new(pattern)?,
        })
    }

    /// Wrap an already compiled regex
    pub fn from_regex(regex: Regex) -> Self {
        Self { regex }
    }
}

impl Matcher for RegexMatcher {
    fn find(&self, buffer: &[u8]) -> Option<Match> {
        let captures = self.regex.captures(buffer)?;
        let full_match = captures.get(0)?;

        let capture_strings = captures
            .iter()
            .map(|group| {
                group
                    .map(|g| String::from_utf8_lossy(g.as_bytes()).into_owned())
                    .unwrap_or_default()
            })
            .collect();

        Some(Match {
            start: full_match.start(),
            end: full_match.end(),
            captures: capture_strings,
        })
    }
}
