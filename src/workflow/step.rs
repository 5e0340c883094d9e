//! Step descriptions: what to run, what to expect, how to react

use crate::pattern::Pattern;
use crate::workflow::outcome::AbortReason;
use std::path::PathBuf;
use std::time::Duration;

/// Default timeout for a step's primary wait
pub const DEFAULT_STEP_TIMEOUT: Duration = Duration::from_secs(30);

/// What the driver does when an expectation's pattern wins.
#[derive(Debug, Clone)]
pub enum Reaction {
    /// Let the command run to completion and go on with the next step.
    Continue,

    /// Send the cached credential, then wait on the follow-up expectations.
    SendCredential(FollowUp),

    /// Record the matched text under the step's name, then continue.
    ///
    /// Later steps reference it as `{step-name}` in their command.
    Extract,

    /// Run these steps first, then continue with the main sequence.
    Branch(Vec<Step>),

    /// Stop the workflow.
    Abort(AbortReason),
}

/// One alternative of a wait: a pattern and the reaction to it.
#[derive(Debug, Clone)]
pub struct Expectation {
    /// Pattern to test
    pub pattern: Pattern,
    /// What to do when it wins
    pub reaction: Reaction,
}

impl Expectation {
    /// Pair a pattern with a reaction
    pub fn new(pattern: Pattern, reaction: Reaction) -> Self {
        Self { pattern, reaction }
    }
}

/// The second wait of a credential exchange.
#[derive(Debug, Clone)]
pub struct FollowUp {
    /// Alternatives after the credential was sent
    pub expect: Vec<Expectation>,
    /// Deadline for this wait
    pub timeout: Duration,
}

impl FollowUp {
    /// Wait up to `timeout` for one of `expect`
    pub fn new(expect: Vec<Expectation>, timeout: Duration) -> Self {
        Self { expect, timeout }
    }
}

/// One command execution within a workflow.
///
/// # Examples
///
/// ```
/// use expectflow::workflow::{Reaction, Step};
/// use expectflow::Pattern;
/// use std::time::Duration;
///
/// let build = Step::new("build", "cargo deb -p syspixel")
///     .timeout(Duration::from_secs(600))
///     .on(Pattern::regex(r"target/debian/syspixel_\S*\.deb").unwrap(), Reaction::Extract);
///
/// let show = Step::new("show", "dpkg-deb --info ../{build}")
///     .on(Pattern::Eof, Reaction::Continue);
/// ```
#[derive(Debug, Clone)]
pub struct Step {
    /// Name used in reports and as the key for extracted values
    pub name: String,
    /// Command line template; `{name}` is replaced by an earlier extraction
    pub command: String,
    /// Directory to run in; the driver's default when `None`
    pub working_dir: Option<PathBuf>,
    /// Primary alternatives, in priority order
    pub expect: Vec<Expectation>,
    /// Deadline for the primary wait
    pub timeout: Duration,
    /// Deadline for the command to finish after a continuing match;
    /// `timeout` when `None`
    pub completion_timeout: Option<Duration>,
    /// Ask the user before running this step
    pub confirm: Option<String>,
    /// Abort with `CommandFailed` when the command exits non-zero
    pub require_success: bool,
}

impl Step {
    /// A step running `command` with no expectations yet
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            working_dir: None,
            expect: Vec::new(),
            timeout: DEFAULT_STEP_TIMEOUT,
            completion_timeout: None,
            confirm: None,
            require_success: false,
        }
    }

    /// Register an alternative; earlier registrations take priority
    pub fn on(mut self, pattern: Pattern, reaction: Reaction) -> Self {
        self.expect.push(Expectation::new(pattern, reaction));
        self
    }

    /// Set the deadline for this step
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Allow the command `timeout` to run to completion once a pattern
    /// has let the step continue.
    ///
    /// Use this when the primary wait is for an early prompt but the command
    /// itself runs much longer.
    pub fn completion_timeout(mut self, timeout: Duration) -> Self {
        self.completion_timeout = Some(timeout);
        self
    }

    /// Deadline used while draining the command to its end
    pub fn finish_timeout(&self) -> Duration {
        self.completion_timeout.unwrap_or(self.timeout)
    }

    /// Run in `dir`
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Ask for confirmation with `message` before running
    pub fn confirm(mut self, message: impl Into<String>) -> Self {
        self.confirm = Some(message.into());
        self
    }

    /// Treat a non-zero exit status as a failure of the step
    pub fn require_success(mut self) -> Self {
        self.require_success = true;
        self
    }

    /// Patterns of the primary wait, in registration order
    pub fn patterns(&self) -> Vec<Pattern> {
        patterns_of(&self.expect)
    }
}

pub(crate) fn patterns_of(expect: &[Expectation]) -> Vec<Pattern> {
    expect.iter().map(|e| e.pattern.clone()).collect()
}
