//! Results of a workflow run

use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// Process exit codes reported for each failure class.
pub mod exit_code {
    /// Workflow completed
    pub const SUCCESS: i32 = 0;
    /// A command could not run or failed
    pub const COMMAND_FAILED: i32 = 1;
    /// Timed out waiting for a prompt or marker
    pub const TIMED_OUT: i32 = 2;
    /// The credential was rejected
    pub const AUTHENTICATION_FAILED: i32 = 3;
    /// The user declined a confirmation
    pub const DECLINED: i32 = 4;
    /// Interrupted by a shutdown request
    pub const CANCELLED: i32 = 130;
}

/// Why a workflow stopped early.
///
/// Diagnostic strings never contain the credential.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AbortReason {
    /// The step's command could not be started
    #[error("SpawnFailed: {0}")]
    SpawnFailed(String),

    /// Writing to the child failed
    #[error("WriteFailed: {0}")]
    WriteFailed(String),

    /// No registered pattern matched before the deadline
    #[error("TimedOut: waiting for {waiting_for}")]
    TimedOut {
        /// The patterns that were being waited on
        waiting_for: String,
    },

    /// The child closed its output before a registered pattern matched
    #[error("StreamClosed: waiting for {waiting_for}")]
    StreamClosed {
        /// The patterns that were being waited on
        waiting_for: String,
    },

    /// The credential was rejected
    #[error("AuthenticationFailed")]
    AuthenticationFailed,

    /// The command reported a failure
    #[error("CommandFailed: {0}")]
    CommandFailed(String),

    /// The command references a value no earlier step extracted
    #[error("UnresolvedPlaceholder: {{{0}}}")]
    UnresolvedPlaceholder(String),

    /// The credential could not be obtained
    #[error("CredentialUnavailable: {0}")]
    CredentialUnavailable(String),

    /// The user declined a confirmation
    #[error("Declined")]
    Declined,

    /// A shutdown was requested while the step was running
    #[error("Cancelled")]
    Cancelled,
}

impl AbortReason {
    /// Process exit code for this failure class
    pub fn exit_code(&self) -> i32 {
        match self {
            AbortReason::TimedOut { .. } => exit_code::TIMED_OUT,
            AbortReason::AuthenticationFailed | AbortReason::CredentialUnavailable(_) => {
                exit_code::AUTHENTICATION_FAILED
            }
            AbortReason::Declined => exit_code::DECLINED,
            AbortReason::Cancelled => exit_code::CANCELLED,
            AbortReason::SpawnFailed(_)
            | AbortReason::WriteFailed(_)
            | AbortReason::StreamClosed { .. }
            | AbortReason::CommandFailed(_)
            | AbortReason::UnresolvedPlaceholder(_) => exit_code::COMMAND_FAILED,
        }
    }
}

/// What happened in one executed step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    /// Step name
    pub name: String,
    /// Rendered command line
    pub command: String,
    /// Index of the winning primary pattern
    pub matched_index: Option<usize>,
    /// Text matched by the last decisive pattern (empty for sentinels)
    pub matched: String,
    /// Exit code, when the child was reaped normally
    pub exit_code: Option<u32>,
    /// Wall time spent in the step
    pub elapsed: Duration,
}

/// Everything a run produced, complete or not.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    /// Executed steps, in execution order (branch steps included)
    pub steps: Vec<StepReport>,
    /// Extracted values keyed by step name
    pub captures: HashMap<String, String>,
}

impl Summary {
    /// Value extracted by the step called `name`
    pub fn capture(&self, name: &str) -> Option<&str> {
        self.captures.get(name).map(String::as_str)
    }
}

/// Details of an aborted run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Abort {
    /// The failure
    pub reason: AbortReason,
    /// Position of the failed step in execution order
    pub step_index: usize,
    /// Name of the failed step
    pub step: String,
    /// Steps completed before the failure
    pub summary: Summary,
}

/// Final result of [`Driver::run`](crate::workflow::Driver::run).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Every step continued
    Completed(Summary),
    /// A step failed; nothing after it ran
    Aborted(Abort),
}

impl Outcome {
    /// Whether the run completed
    pub fn is_completed(&self) -> bool {
        matches!(self, Outcome::Completed(_))
    }

    /// Process exit code for this outcome
    pub fn exit_code(&self) -> i32 {
        match self {
            Outcome::Completed(_) => exit_code::SUCCESS,
            Outcome::Aborted(abort) => abort.reason.exit_code(),
        }
    }

    /// Summary of the steps that ran
    pub fn summary(&self) -> &Summary {
        match self {
            Outcome::Completed(summary) => summary,
            Outcome::Aborted(abort) => &abort.summary,
        }
    }
}
