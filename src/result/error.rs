//! Error types for session operations

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while driving a [`Session`](crate::Session).
///
/// `expect_any` only returns [`ExpectError::Timeout`] or [`ExpectError::Eof`]
/// when the corresponding sentinel pattern was not registered. Registering
/// `Pattern::Timeout` or `Pattern::Eof` turns those conditions into ordinary
/// match results instead.
///
/// # Examples
///
/// ```no_run
/// use expectflow::{ExpectError, Pattern, Session};
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mut session = Session::builder()
///     .timeout(Duration::from_secs(5))
///     .spawn("cargo --version")?;
///
/// match session.expect(Pattern::exact("cargo")).await {
///     Ok(result) => println!("Matched: {}", result.matched),
///     Err(ExpectError::Timeout { duration }) => {
///         eprintln!("Timed out after {:?}", duration);
///     }
///     Err(ExpectError::Eof) => eprintln!("Process exited before printing a version"),
///     Err(e) => return Err(e.into()),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Error, Debug)]
pub enum ExpectError {
    /// No registered pattern matched before the deadline.
    #[error("Timeout waiting for pattern (after {duration:?})")]
    Timeout {
        /// Deadline that expired, measured from the start of the wait
        duration: Duration,
    },

    /// The output stream closed before a registered pattern matched.
    #[error("Stream closed before pattern matched")]
    Eof,

    /// Invalid pattern.
    #[error("Invalid pattern: {0}")]
    PatternError(#[from] PatternError),

    /// Underlying I/O failure on the PTY.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// PTY creation or manipulation failed.
    #[error("PTY error: {0}")]
    PtyError(String),

    /// The command could not be started (not found, empty, process table full).
    #[error("Failed to spawn process: {0}")]
    SpawnError(String),

    /// Writing to the child failed, typically because it already exited.
    #[error("Failed to write to process: {0}")]
    WriteError(String),

    /// The process handle is gone (terminated or already reaped).
    #[error("Process has already exited")]
    ProcessExited,
}

/// Errors related to pattern creation.
#[derive(Error, Debug)]
pub enum PatternError {
    /// Invalid regex pattern.
    #[error("Invalid regex: {0}")]
    InvalidRegex(#[from] regex::Error),

    /// Empty literal pattern.
    #[error("Pattern cannot be empty")]
    EmptyPattern,
}
