//! Result types for expect operations

mod error;

pub use error::{ExpectError, PatternError};

/// Outcome of a resolved `expect` call.
///
/// For textual patterns `matched` holds the matched text and `before` the
/// unconsumed output that preceded it. For the sentinel patterns
/// (`Pattern::Eof`, `Pattern::Timeout`) `matched` is empty and `before`
/// holds everything that was still unconsumed when the condition fired.
///
/// # Regex Captures
///
/// ```no_run
/// use expectflow::{Session, Pattern};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// # let mut session = Session::spawn("cargo deb -p syspixel")?;
/// let pattern = Pattern::regex(r"target/debian/syspixel_(\S*)\.deb")?;
/// let result = session.expect(pattern).await?;
///
/// // captures[0] is the full match, captures[1] the version part
/// println!("Artifact: {}", result.captures[0]);
/// println!("Version: {}", result.captures[1]);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    /// Index of the winning pattern in the slice passed to `expect_any`.
    ///
    /// For `expect` with a single pattern, this is always 0.
    pub pattern_index: usize,

    /// The matched text (empty for sentinel outcomes).
    pub matched: String,

    /// Start of the match in the session buffer (byte offset).
    pub start: usize,

    /// End of the match in the session buffer (byte offset).
    pub end: usize,

    /// Unconsumed output that appeared before the match.
    pub before: String,

    /// Regex capture groups; index 0 is the full match. Empty for literals.
    pub captures: Vec<String>,
}

impl MatchResult {
    /// Build the result for a sentinel pattern firing at `position`.
    pub(crate) fn sentinel(pattern_index: usize, position: usize, before: String) -> Self {
        Self {
            pattern_index,
            matched: String::new(),
            start: position,
            end: position,
            before,
            captures: vec![],
        }
    }

    /// The first capture group if present, otherwise the whole match.
    pub fn captured(&self) -> &str {
        self.captures
            .get(1)
            .or_else(|| self.captures.first())
            .map(String::as_str)
            .unwrap_or(&self.matched)
    }
}
