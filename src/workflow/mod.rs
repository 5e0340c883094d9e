//! Sequencing of interactive steps on top of [`Session`]
//!
//! A [`Driver`] runs [`Step`]s strictly in order. Each step spawns one
//! session, waits for the step's patterns and dispatches on the winning
//! pattern's [`Reaction`]. The first failure aborts the whole run; steps that
//! already completed are not rolled back.
//!
//! ```no_run
//! use expectflow::workflow::{Driver, FollowUp, Reaction, Step, TerminalPrompter, AbortReason};
//! use expectflow::Pattern;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let install = Step::new("install", "sudo apt install -y ./pkg.deb").on(
//!     Pattern::exact("password"),
//!     Reaction::SendCredential(FollowUp::new(
//!         vec![
//!             expectflow::workflow::Expectation::new(
//!                 Pattern::exact("try again"),
//!                 Reaction::Abort(AbortReason::AuthenticationFailed),
//!             ),
//!             expectflow::workflow::Expectation::new(Pattern::Eof, Reaction::Continue),
//!         ],
//!         Duration::from_secs(120),
//!     )),
//! );
//!
//! let mut driver = Driver::new(TerminalPrompter::default());
//! let outcome = driver.run(vec![install]).await;
//! std::process::exit(outcome.exit_code());
//! # }
//! ```

mod credential;
mod outcome;
mod step;
mod template;

pub use credential::{restore_terminal, Credential, Prompter, TerminalPrompter};
pub use outcome::{exit_code, Abort, AbortReason, Outcome, StepReport, Summary};
pub use step::{Expectation, FollowUp, Reaction, Step, DEFAULT_STEP_TIMEOUT};
pub use template::render;

use crate::pattern::Pattern;
use crate::result::{ExpectError, MatchResult};
use crate::session::{Session, SessionBuilder};
use log::{debug, error, info, warn};
use secrecy::ExposeSecret;
use std::collections::{HashMap, VecDeque};
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use step::patterns_of;
use tokio::sync::watch;

/// Bytes of trailing output included in failure diagnostics
const DIAGNOSTIC_TAIL: usize = 512;

/// Settings shared by every session the driver spawns.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Directory for steps that do not name one; the current directory when `None`
    pub working_dir: Option<PathBuf>,
    /// Strip terminal escape sequences before matching
    pub strip_ansi: bool,
    /// Echo child output to stdout while it is read
    pub tee_output: bool,
    /// Per-session buffer limit
    pub max_buffer_size: usize,
    /// Extra environment variables for every command
    pub env: Vec<(String, String)>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            working_dir: None,
            strip_ansi: true,
            tee_output: false,
            max_buffer_size: 64 * 1024,
            env: Vec::new(),
        }
    }
}

/// Per-step state, logged as the step advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    NotStarted,
    Spawned,
    AwaitingPrimary,
    AwaitingSecondary,
    Continuing,
}

struct StepDone {
    report: StepReport,
    capture: Option<String>,
    branch: Vec<Step>,
}

/// Runs a workflow and owns the credential for its lifetime.
pub struct Driver {
    config: DriverConfig,
    prompter: Arc<Mutex<Box<dyn Prompter>>>,
    credential: Credential,
    shutdown: Option<watch::Receiver<bool>>,
}

impl Driver {
    /// A driver that asks `prompter` for credentials and confirmations.
    pub fn new(prompter: impl Prompter + 'static) -> Self {
        Self {
            config: DriverConfig::default(),
            prompter: Arc::new(Mutex::new(Box::new(prompter))),
            credential: Credential::new(),
            shutdown: None,
        }
    }

    /// Replace the session settings
    pub fn with_config(mut self, config: DriverConfig) -> Self {
        self.config = config;
        self
    }

    /// Start with an already known credential
    pub fn with_credential(mut self, credential: Credential) -> Self {
        self.credential = credential;
        self
    }

    /// Abort the run with [`AbortReason::Cancelled`] once `shutdown` becomes `true`.
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// The credential holder
    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    /// Run `steps` in order until all continue or one aborts.
    pub async fn run(&mut self, steps: Vec<Step>) -> Outcome {
        let mut queue: VecDeque<Step> = steps.into();
        let mut summary = Summary::default();
        let mut index = 0;

        while let Some(step) = queue.pop_front() {
            info!("step {}: {}", index, step.name);

            let result = if self.shutdown_requested() {
                Err(AbortReason::Cancelled)
            } else {
                self.run_step(&step, &summary.captures).await
            };

            match result {
                Ok(done) => {
                    if let Some(value) = done.capture {
                        info!("step {}: extracted {:?}", step.name, value);
                        summary.captures.insert(step.name.clone(), value);
                    }
                    summary.steps.push(done.report);
                    for branch_step in done.branch.into_iter().rev() {
                        queue.push_front(branch_step);
                    }
                }
                Err(reason) => {
                    error!("step {} ({}) aborted: {}", index, step.name, reason);
                    return Outcome::Aborted(Abort {
                        reason,
                        step_index: index,
                        step: step.name,
                        summary,
                    });
                }
            }

            index += 1;
        }

        info!("workflow completed ({} steps)", summary.steps.len());
        Outcome::Completed(summary)
    }

    async fn run_step(
        &mut self,
        step: &Step,
        captures: &HashMap<String, String>,
    ) -> Result<StepDone, AbortReason> {
        let started = Instant::now();
        let mut phase = Phase::NotStarted;
        debug!("{}: {:?}", step.name, phase);

        if let Some(message) = step.confirm.clone() {
            let accepted = self
                .prompt(move |prompter| prompter.confirm(&message))
                .await?
                .unwrap_or_else(|e| {
                    warn!("{}: confirmation failed: {}", step.name, e);
                    false
                });
            if !accepted {
                return Err(AbortReason::Declined);
            }
        }

        let argv = render(&step.command, captures)?;
        let command = argv.join(" ");
        let mut session = self
            .session_builder(step)
            .spawn_args(&argv)
            .map_err(|e| AbortReason::SpawnFailed(e.to_string()))?;

        phase = Phase::Spawned;
        debug!("{}: {:?}", step.name, phase);

        let mut stage: &[Expectation] = &step.expect;
        let mut timeout = step.timeout;
        let mut matched_index = None;
        phase = Phase::AwaitingPrimary;

        loop {
            debug!("{}: {:?}", step.name, phase);

            let patterns = patterns_of(stage);
            let result = match self.wait_for(&mut session, &patterns, timeout).await {
                Ok(result) => result,
                Err(reason) => return Err(self.fail(&mut session, step, phase, reason)),
            };
            matched_index.get_or_insert(result.pattern_index);

            let (capture, branch) = match &stage[result.pattern_index].reaction {
                Reaction::Continue => (None, Vec::new()),
                Reaction::Extract => (Some(result.matched.clone()), Vec::new()),
                Reaction::Branch(steps) => {
                    info!("{}: branching into {} step(s)", step.name, steps.len());
                    (None, steps.clone())
                }
                Reaction::Abort(reason) => {
                    return Err(self.fail(&mut session, step, phase, reason.clone()));
                }
                Reaction::SendCredential(follow_up) => {
                    if let Err(reason) = self.send_credential(&mut session).await {
                        return Err(self.fail(&mut session, step, phase, reason));
                    }
                    stage = &follow_up.expect;
                    timeout = follow_up.timeout;
                    phase = Phase::AwaitingSecondary;
                    continue;
                }
            };

            phase = Phase::Continuing;
            debug!("{}: {:?}", step.name, phase);

            let exit_code = match self.finish(&mut session, step).await {
                Ok(code) => code,
                Err(reason) => return Err(self.fail(&mut session, step, phase, reason)),
            };

            return Ok(StepDone {
                report: StepReport {
                    name: step.name.clone(),
                    command,
                    matched_index,
                    matched: result.matched,
                    exit_code,
                    elapsed: started.elapsed(),
                },
                capture,
                branch,
            });
        }
    }

    fn session_builder(&self, step: &Step) -> SessionBuilder {
        let builder = Session::builder()
            .timeout(step.finish_timeout())
            .strip_ansi(self.config.strip_ansi)
            .tee_output(self.config.tee_output)
            .max_buffer_size(self.config.max_buffer_size);

        let builder = self
            .config
            .env
            .iter()
            .fold(builder, |builder, (key, value)| builder.env(key, value));

        match step.working_dir.as_ref().or(self.config.working_dir.as_ref()) {
            Some(dir) => builder.cwd(dir),
            None => builder,
        }
    }

    async fn send_credential(&mut self, session: &mut Session) -> Result<(), AbortReason> {
        if !self.credential.is_cached() {
            debug!("fetching credential");
            let secret = self
                .prompt(|prompter| prompter.get_secret())
                .await?
                .map_err(|e| AbortReason::CredentialUnavailable(e.to_string()))?;
            self.credential.set(secret);
        }

        let secret = self
            .credential
            .get()
            .ok_or_else(|| AbortReason::CredentialUnavailable("not cached".to_string()))?;

        if self.shutdown_requested() {
            return Err(AbortReason::Cancelled);
        }

        session.mask_output(secret);
        debug!("sending credential to `{}`", session.command());
        session
            .send_line(secret.expose_secret())
            .await
            .map_err(|e| AbortReason::WriteFailed(e.to_string()))
    }

    /// Ask the prompter on a blocking thread, giving up on shutdown.
    ///
    /// Returns `Cancelled` if shutdown was requested while the prompt was
    /// open, even when the answer arrived first. The prompter thread is left
    /// to finish on its own.
    async fn prompt<T, F>(&mut self, ask: F) -> Result<io::Result<T>, AbortReason>
    where
        T: Send + 'static,
        F: FnOnce(&mut Box<dyn Prompter>) -> io::Result<T> + Send + 'static,
    {
        let prompter = Arc::clone(&self.prompter);
        let task = tokio::task::spawn_blocking(move || {
            let mut prompter = prompter
                .lock()
                .map_err(|_| io::Error::other("prompter lock poisoned"))?;
            ask(&mut *prompter)
        });

        let joined = match self.shutdown.as_mut() {
            Some(shutdown) => tokio::select! {
                biased;
                _ = cancelled(shutdown) => return Err(AbortReason::Cancelled),
                joined = task => joined,
            },
            None => task.await,
        };

        if self.shutdown_requested() {
            return Err(AbortReason::Cancelled);
        }
        Ok(joined.unwrap_or_else(|e| Err(io::Error::other(e))))
    }

    /// Let the command run to its end and collect the exit status.
    async fn finish(
        &mut self,
        session: &mut Session,
        step: &Step,
    ) -> Result<Option<u32>, AbortReason> {
        if !session.is_eof() {
            self.wait_for(session, &[Pattern::Eof], step.finish_timeout())
                .await?;
        }

        let code = match session.wait().await {
            Ok(status) => Some(status.exit_code()),
            Err(e) => {
                warn!("{}: no exit status: {}", step.name, e);
                None
            }
        };

        match code {
            Some(code) if step.require_success && code != 0 => Err(AbortReason::CommandFailed(
                format!("`{}` exited with status {}", session.command(), code),
            )),
            _ => Ok(code),
        }
    }

    async fn wait_for(
        &mut self,
        session: &mut Session,
        patterns: &[Pattern],
        timeout: Duration,
    ) -> Result<MatchResult, AbortReason> {
        let expect = session.expect_any_timeout(patterns, timeout);

        let result = match self.shutdown.as_mut() {
            Some(shutdown) => tokio::select! {
                result = expect => result,
                _ = cancelled(shutdown) => return Err(AbortReason::Cancelled),
            },
            None => expect.await,
        };

        result.map_err(|e| match e {
            ExpectError::Timeout { .. } => AbortReason::TimedOut {
                waiting_for: describe(patterns),
            },
            ExpectError::Eof => AbortReason::StreamClosed {
                waiting_for: describe(patterns),
            },
            other => AbortReason::CommandFailed(other.to_string()),
        })
    }

    fn fail(
        &self,
        session: &mut Session,
        step: &Step,
        phase: Phase,
        reason: AbortReason,
    ) -> AbortReason {
        warn!(
            "{}: {} while {:?}; last output: {:?}",
            step.name,
            reason,
            phase,
            self.credential.redact(&session.output_tail(DIAGNOSTIC_TAIL))
        );
        session.terminate();
        reason
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown.as_ref().is_some_and(|rx| *rx.borrow())
    }
}

impl std::fmt::Debug for Driver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Driver")
            .field("config", &self.config)
            .field("credential", &self.credential)
            .finish()
    }
}

/// Resolves once shutdown is requested; never if the sender is gone.
async fn cancelled(shutdown: &mut watch::Receiver<bool>) {
    if shutdown.wait_for(|requested| *requested).await.is_err() {
        std::future::pending::<()>().await;
    }
}

fn describe(patterns: &[Pattern]) -> String {
    patterns
        .iter()
        .map(Pattern::to_string)
        .collect::<Vec<_>>()
        .join(" | ")
}
