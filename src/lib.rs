//! expectflow: expect-style process automation and workflow driving
//!
//! expectflow spawns interactive programs on a pseudo-terminal, waits for
//! their output to match one of several patterns, and answers prompts. On top
//! of that primitive it sequences multi-step workflows that need a privileged
//! credential exactly once, such as building a Debian package and installing
//! it with `sudo apt`.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use expectflow::{Session, Pattern};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut session = Session::builder()
//!         .timeout(Duration::from_secs(30))
//!         .spawn("sh -c \"cargo --version\"")?;
//!
//!     let patterns = [
//!         Pattern::regex(r"cargo \d+\.\d+\.\d+")?,
//!         Pattern::exact("not found"),
//!         Pattern::Eof,
//!     ];
//!     match session.expect_any(&patterns).await?.pattern_index {
//!         0 => println!("cargo is installed"),
//!         _ => println!("cargo is missing"),
//!     }
//!
//!     let status = session.wait().await?;
//!     println!("exit code {}", status.exit_code());
//!     Ok(())
//! }
//! ```
//!
//! # Pattern Order
//!
//! Patterns given to `expect_any` are tested in order after every read, and
//! the first one whose condition holds wins. `Pattern::Eof` and
//! `Pattern::Timeout` take part in that order like any other pattern; when
//! they are not registered, stream end and timeouts are errors.
//!
//! # Workflows
//!
//! See [`workflow::Driver`] for step sequencing and [`install`] for the
//! build-and-install workflow used by the `expectflow` binary.

#![warn(missing_docs)]

mod buffer;
mod pattern;
mod result;
mod session;

pub mod install;
pub mod workflow;

// Public API exports
pub use pattern::Pattern;
pub use result::{ExpectError, MatchResult, PatternError};
pub use session::{parse_command, Session, SessionBuilder};

// Re-export commonly used types
pub use portable_pty::ExitStatus;
