//! Pattern matching for expect operations

mod matcher;

pub use matcher::{Match, Matcher};

use crate::result::PatternError;
use matcher::{ExactMatcher, RegexMatcher};
use regex::bytes::Regex;

/// Pattern types for matching process output.
///
/// Patterns passed to `expect_any` are tested in the order they are given.
/// The first pattern whose condition holds wins, even if a later pattern's
/// text starts earlier in the output.
///
/// # Examples
///
/// ```
/// use expectflow::Pattern;
///
/// let prompt = Pattern::exact("password");
/// let artifact = Pattern::regex(r"target/debian/\S+\.deb").unwrap();
///
/// // Sentinels turn stream end and timeouts into ordinary alternatives
/// let done = Pattern::Eof;
/// let stalled = Pattern::Timeout;
/// ```
#[derive(Debug, Clone)]
pub enum Pattern {
    /// Literal substring match.
    Exact(String),

    /// Regular expression match over raw bytes.
    ///
    /// The matched text and all capture groups are returned in the `MatchResult`.
    Regex(Regex),

    /// Matches once the child closed its output stream and everything it
    /// wrote has been read.
    Eof,

    /// Matches when the wait deadline expires.
    Timeout,
}

impl Pattern {
    /// Create a literal pattern.
    pub fn exact(s: impl Into<String>) -> Self {
        Pattern::Exact(s.into())
    }

    /// Create a regex pattern.
    ///
    /// # Errors
    ///
    /// Returns a regex error if the pattern is invalid.
    pub fn regex(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Pattern::Regex(Regex::new(pattern)?))
    }

    /// Convert a textual pattern into a matcher. Sentinels have none.
    pub fn to_matcher(&self) -> Result<Option<Box<dyn Matcher>>, PatternError> {
        match self {
            Pattern::Exact(s) => Ok(Some(Box::new(ExactMatcher::new(s)?))),
            Pattern::Regex(r) => Ok(Some(Box::new(RegexMatcher::from_regex(r.clone())))),
            Pattern::Eof | Pattern::Timeout => Ok(None),
        }
    }

    /// Check if this is a sentinel pattern (EOF or timeout)
    pub fn is_special(&self) -> bool {
        matches!(self, Pattern::Eof | Pattern::Timeout)
    }
}

impl std::fmt::Display for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Pattern::Exact(s) => write!(f, "{:?}", s),
            Pattern::Regex(r) => write!(f, "/{}/", r.as_str()),
            Pattern::Eof => f.write_str("EOF"),
            Pattern::Timeout => f.write_str("TIMEOUT"),
        }
    }
}

enum Entry {
    Text(Box<dyn Matcher>),
    Eof,
    Timeout,
}

/// Which registered pattern won, and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Selection {
    Text { index: usize, found: Match },
    Sentinel { index: usize },
}

/// A pattern list compiled once per `expect` call.
pub(crate) struct PatternSet {
    entries: Vec<Entry>,
}

impl PatternSet {
    pub(crate) fn compile(patterns: &[Pattern]) -> Result<Self, PatternError> {
        let entries = patterns
            .iter()
            .map(|pattern| {
                Ok::<_, PatternError>(match pattern.to_matcher()? {
                    Some(matcher) => Entry::Text(matcher),
                    None if matches!(pattern, Pattern::Eof) => Entry::Eof,
                    None => Entry::Timeout,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { entries })
    }

    /// Evaluate every pattern in registration order and return the first
    /// whose condition holds for `buffer` given the stream state.
    pub(crate) fn select(&self, buffer: &[u8], eof: bool, timed_out: bool) -> Option<Selection> {
        self.entries
            .iter()
            .enumerate()
            .find_map(|(index, entry)| match entry {
                Entry::Text(matcher) => matcher
                    .find(buffer)
                    .map(|found| Selection::Text { index, found }),
                Entry::Eof if eof => Some(Selection::Sentinel { index }),
                Entry::Timeout if timed_out => Some(Selection::Sentinel { index }),
                _ => None,
            })
    }
}
