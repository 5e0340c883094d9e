//! Session management for PTY-based process automation

mod builder;
mod spawn;
mod tee;

pub use builder::SessionBuilder;
pub use spawn::parse_command;

use crate::buffer::BufferManager;
use crate::pattern::{Pattern, PatternSet, Selection};
use crate::result::{ExpectError, MatchResult};
use log::{debug, trace, warn};
use portable_pty::{Child, ChildKiller, ExitStatus, MasterPty};
use secrecy::SecretString;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tee::Tee;
use tokio::sync::{mpsc, Mutex};
use tokio::time::Instant;

/// How often `wait` polls the child for an exit status
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Reap attempts after killing a child, and the pause between them.
///
/// `terminate` runs from `Drop` and so cannot await; this bound is on top of
/// the SIGHUP grace period portable-pty spends inside `kill`.
const TERMINATE_REAP_ATTEMPTS: usize = 10;
const TERMINATE_REAP_INTERVAL: Duration = Duration::from_millis(10);

/// A spawned child process attached to a PTY.
///
/// The session owns the child exclusively. Output is read by a background
/// thread and accumulated in a buffer that `expect` scans; a match consumes
/// the output up to its end so later waits only see newer output.
///
/// Dropping a session terminates the child if it is still running.
///
/// # Examples
///
/// ```no_run
/// use expectflow::{Session, Pattern};
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mut session = Session::builder()
///     .timeout(Duration::from_secs(5))
///     .spawn("sudo apt update")?;
///
/// let patterns = [Pattern::exact("password"), Pattern::Eof];
/// if session.expect_any(&patterns).await?.pattern_index == 0 {
///     session.send_line("hunter2").await?;
/// }
/// # Ok(())
/// # }
/// ```
pub struct Session {
    _master: Box<dyn MasterPty + Send>,
    child: Option<Box<dyn Child + Send + Sync>>,
    exit_status: Option<ExitStatus>,
    output: mpsc::UnboundedReceiver<Vec<u8>>,
    writer: Arc<Mutex<Box<dyn Write + Send>>>,
    buffer: BufferManager,
    timeout: Option<Duration>,
    eof_reached: bool,
    tee: Option<Tee>,
    command: String,
}

impl Session {
    /// Create a new session builder.
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    /// Spawn a command in the current directory with default options.
    pub fn spawn(command: &str) -> Result<Self, ExpectError> {
        SessionBuilder::new().spawn(command)
    }

    /// Spawn a command in `working_dir` with default options.
    pub fn spawn_in(command: &str, working_dir: impl AsRef<Path>) -> Result<Self, ExpectError> {
        SessionBuilder::new().cwd(working_dir).spawn(command)
    }

    /// The command line this session was spawned with.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// OS process id of the child, while it has not been reaped.
    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().and_then(|c| c.process_id())
    }

    /// Wait for a single pattern using the session timeout.
    pub async fn expect(&mut self, pattern: Pattern) -> Result<MatchResult, ExpectError> {
        self.expect_any(&[pattern]).await
    }

    /// Wait for any of `patterns` using the session timeout.
    ///
    /// Patterns are tested in the order given against all unconsumed output
    /// after every read. The first one whose condition holds wins, even if a
    /// later pattern's text starts earlier in the output.
    ///
    /// # Errors
    ///
    /// - [`ExpectError::Timeout`] if the deadline passes and `Pattern::Timeout`
    ///   was not registered
    /// - [`ExpectError::Eof`] if the stream closes and `Pattern::Eof` was not
    ///   registered
    /// - [`ExpectError::PatternError`] for an empty literal
    pub async fn expect_any(&mut self, patterns: &[Pattern]) -> Result<MatchResult, ExpectError> {
        let timeout = self.timeout;
        self.expect_within(patterns, timeout).await
    }

    /// Wait for any of `patterns`, overriding the session timeout for this call.
    pub async fn expect_any_timeout(
        &mut self,
        patterns: &[Pattern],
        timeout: Duration,
    ) -> Result<MatchResult, ExpectError> {
        self.expect_within(patterns, Some(timeout)).await
    }

    async fn expect_within(
        &mut self,
        patterns: &[Pattern],
        timeout: Option<Duration>,
    ) -> Result<MatchResult, ExpectError> {
        let set = PatternSet::compile(patterns)?;
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut timed_out = false;

        loop {
            if let Some(selection) =
                set.select(self.buffer.unmatched(), self.eof_reached, timed_out)
            {
                let result = self.resolve(selection);
                debug!(
                    "`{}`: pattern #{} ({}) matched",
                    self.command, result.pattern_index, patterns[result.pattern_index]
                );
                return Ok(result);
            }

            if self.eof_reached {
                return Err(ExpectError::Eof);
            }
            if timed_out {
                return Err(ExpectError::Timeout {
                    duration: timeout.unwrap_or_default(),
                });
            }

            let next = match deadline {
                Some(deadline) => match tokio::time::timeout_at(deadline, self.output.recv()).await
                {
                    Ok(next) => next,
                    Err(_) => {
                        timed_out = true;
                        continue;
                    }
                },
                None => self.output.recv().await,
            };

            match next {
                Some(chunk) => self.ingest(&chunk),
                None => {
                    trace!("`{}`: end of stream", self.command);
                    self.eof_reached = true;
                    if let Some(tee) = &mut self.tee {
                        let _ = tee.finish(&mut std::io::stdout().lock());
                    }
                }
            }
        }
    }

    fn ingest(&mut self, chunk: &[u8]) {
        if let Some(tee) = &mut self.tee {
            let _ = tee.write(chunk, &mut std::io::stdout().lock());
        }
        self.buffer.append(chunk);
    }

    fn resolve(&mut self, selection: Selection) -> MatchResult {
        let offset = self.buffer.matched_position();

        match selection {
            Selection::Text { index, found } => {
                let start = offset + found.start;
                let end = offset + found.end;
                let result = MatchResult {
                    pattern_index: index,
                    matched: self.buffer.text(start, end),
                    start,
                    end,
                    before: self.buffer.unmatched_before(start),
                    captures: found.captures,
                };
                self.buffer.mark_matched(end);
                result
            }
            Selection::Sentinel { index } => {
                let end = self.buffer.len();
                let result = MatchResult::sentinel(index, end, self.buffer.unmatched_before(end));
                // A timeout leaves the output in place for the next wait
                if self.eof_reached {
                    self.buffer.mark_all_matched();
                }
                result
            }
        }
    }

    /// Replace `secret` with asterisks in output copied to stdout.
    ///
    /// Has no effect unless the session was built with
    /// [`tee_output`](SessionBuilder::tee_output). Matching still sees the
    /// raw output.
    pub fn mask_output(&mut self, secret: &SecretString) {
        if let Some(tee) = &mut self.tee {
            tee.mask(secret);
        }
    }

    /// Whether the child closed its output stream.
    pub fn is_eof(&self) -> bool {
        self.eof_reached
    }

    /// The last `max` bytes of output, for diagnostics.
    pub fn output_tail(&self, max: usize) -> String {
        self.buffer.tail(max)
    }

    /// Send raw bytes to the process.
    ///
    /// # Errors
    ///
    /// Returns [`ExpectError::WriteError`] if the child has exited or the
    /// write fails.
    pub async fn send(&mut self, data: &[u8]) -> Result<(), ExpectError> {
        if !self.is_alive()? {
            return Err(ExpectError::WriteError(format!(
                "`{}` has already exited",
                self.command
            )));
        }

        let writer = self.writer.clone();
        let data = data.to_vec();
        let len = data.len();

        tokio::task::spawn_blocking(move || {
            let mut writer = writer.blocking_lock();
            writer.write_all(&data)?;
            writer.flush()
        })
        .await
        .map_err(|e| ExpectError::WriteError(e.to_string()))?
        .map_err(|e| ExpectError::WriteError(e.to_string()))?;

        trace!("`{}`: wrote {} bytes", self.command, len);
        Ok(())
    }

    /// Send a line to the process (appends newline).
    ///
    /// The terminal may echo the line back; nothing here suppresses that.
    pub async fn send_line(&mut self, line: &str) -> Result<(), ExpectError> {
        let mut data = Vec::with_capacity(line.len() + 1);
        data.extend_from_slice(line.as_bytes());
        data.push(b'\n');
        self.send(&data).await
    }

    /// Check if the process is still running.
    ///
    /// Returns `false` once the child has exited or been reaped.
    pub fn is_alive(&mut self) -> Result<bool, ExpectError> {
        match &mut self.child {
            Some(child) => spawn::is_alive(child),
            None => Ok(false),
        }
    }

    /// Wait for the process to exit and return its exit status.
    ///
    /// Bounded by the session timeout; on timeout the child is left running
    /// so the caller can `terminate` it. Calling `wait` again after success
    /// returns the same status.
    ///
    /// # Errors
    ///
    /// - [`ExpectError::Timeout`] if the child outlives the session timeout
    /// - [`ExpectError::ProcessExited`] if the child was terminated without
    ///   a status being collected
    pub async fn wait(&mut self) -> Result<ExitStatus, ExpectError> {
        let deadline = self.timeout.map(|t| Instant::now() + t);

        loop {
            if let Some(status) = &self.exit_status {
                return Ok(status.clone());
            }

            let child = self.child.as_mut().ok_or(ExpectError::ProcessExited)?;
            if let Some(status) = child.try_wait()? {
                debug!("`{}` exited with {}", self.command, status.exit_code());
                self.child = None;
                self.exit_status = Some(status);
                continue;
            }

            if deadline.is_some_and(|d| Instant::now() >= d) {
                return Err(ExpectError::Timeout {
                    duration: self.timeout.unwrap_or_default(),
                });
            }

            tokio::time::sleep(WAIT_POLL_INTERVAL).await;
        }
    }

    /// Kill the child if it is still running.
    ///
    /// Best effort and idempotent: calling it again, or after the child
    /// exited on its own, does nothing.
    pub fn terminate(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };

        match child.try_wait() {
            Ok(Some(status)) => {
                self.exit_status = Some(status);
                return;
            }
            Ok(None) => {}
            Err(e) => debug!("`{}`: try_wait failed: {}", self.command, e),
        }

        debug!("terminating `{}` (pid {:?})", self.command, child.process_id());
        if let Err(e) = child.kill() {
            warn!("failed to kill `{}`: {}", self.command, e);
        }

        for _ in 0..TERMINATE_REAP_ATTEMPTS {
            if let Ok(Some(status)) = child.try_wait() {
                self.exit_status = Some(status);
                return;
            }
            std::thread::sleep(TERMINATE_REAP_INTERVAL);
        }

        warn!(
            "`{}` (pid {:?}) did not exit after kill",
            self.command,
            child.process_id()
        );
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.terminate();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("command", &self.command)
            .field("pid", &self.pid())
            .field("eof_reached", &self.eof_reached)
            .field("buffered", &self.buffer.len())
            .finish()
    }
}
