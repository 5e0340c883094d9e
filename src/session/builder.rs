//! Session builder for configuration

use super::spawn;
use super::tee::Tee;
use crate::buffer::BufferManager;
use crate::result::ExpectError;
use crate::session::Session;
use log::info;
use portable_pty::{native_pty_system, CommandBuilder, PtySize};
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};

/// Default timeout for expect operations (in seconds)
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default maximum buffer size (in bytes)
const DEFAULT_MAX_BUFFER_SIZE: usize = 64 * 1024;

/// Default PTY rows
const DEFAULT_PTY_ROWS: u16 = 24;

/// Default PTY columns
const DEFAULT_PTY_COLS: u16 = 80;

/// Builder for configuring and spawning sessions.
///
/// # Defaults
///
/// - Timeout: 30 seconds
/// - Max buffer size: 64 KiB
/// - ANSI stripping: disabled
/// - PTY size: 24 rows × 80 columns
/// - Working directory: the current directory
/// - Output tee: disabled
/// - Environment: inherited from this process
///
/// # Examples
///
/// ```no_run
/// use expectflow::Session;
/// use std::time::Duration;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let session = Session::builder()
///     .timeout(Duration::from_secs(600))
///     .strip_ansi(true)
///     .cwd("/home/pi/syspixel")
///     .spawn("cargo deb -p syspixel")?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct SessionBuilder {
    timeout: Option<Duration>,
    max_buffer_size: usize,
    strip_ansi: bool,
    pty_size: PtySize,
    cwd: Option<PathBuf>,
    tee_output: bool,
    env: Vec<(OsString, OsString)>,
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionBuilder {
    /// Create a new session builder with default configuration.
    pub fn new() -> Self {
        Self {
            timeout: Some(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            max_buffer_size: DEFAULT_MAX_BUFFER_SIZE,
            strip_ansi: false,
            pty_size: PtySize {
                rows: DEFAULT_PTY_ROWS,
                cols: DEFAULT_PTY_COLS,
                pixel_width: 0,
                pixel_height: 0,
            },
            cwd: None,
            tee_output: false,
            env: Vec::new(),
        }
    }

    /// Set the default timeout for `expect` and `wait`.
    ///
    /// The deadline is measured from the start of each call, not from the last
    /// byte received.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Disable the default timeout (wait indefinitely).
    pub fn no_timeout(mut self) -> Self {
        self.timeout = None;
        self
    }

    /// Set maximum buffer size in bytes.
    ///
    /// When the buffer reaches this size the oldest third is discarded.
    pub fn max_buffer_size(mut self, size: usize) -> Self {
        self.max_buffer_size = size;
        self
    }

    /// Enable or disable ANSI escape sequence stripping before matching.
    pub fn strip_ansi(mut self, strip: bool) -> Self {
        self.strip_ansi = strip;
        self
    }

    /// Set PTY (terminal) size.
    pub fn pty_size(mut self, rows: u16, cols: u16) -> Self {
        self.pty_size = PtySize {
            rows,
            cols,
            pixel_width: 0,
            pixel_height: 0,
        };
        self
    }

    /// Run the child in `dir` instead of the current directory.
    pub fn cwd(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Copy everything the child prints to our stdout as it is read.
    pub fn tee_output(mut self, tee: bool) -> Self {
        self.tee_output = tee;
        self
    }

    /// Set an environment variable for the child, on top of our own environment.
    ///
    /// A `PATH` given here is also used to locate the program.
    pub fn env(mut self, key: impl AsRef<OsStr>, value: impl AsRef<OsStr>) -> Self {
        self.env
            .push((key.as_ref().to_os_string(), value.as_ref().to_os_string()));
        self
    }

    /// Spawn a command line and return a configured session.
    ///
    /// The command is split with shell quoting rules but is not run through a
    /// shell; use `sh -c "..."` for pipelines.
    ///
    /// # Errors
    ///
    /// Returns [`ExpectError::SpawnError`] if the command line is empty or
    /// malformed, or the program cannot be started, and
    /// [`ExpectError::PtyError`] if the PTY cannot be created.
    pub fn spawn(self, command: &str) -> Result<Session, ExpectError> {
        let argv = spawn::parse_command(command)?;
        self.spawn_args(&argv)
    }

    /// Spawn an already split argv.
    pub fn spawn_args<S: AsRef<OsStr>>(self, argv: &[S]) -> Result<Session, ExpectError> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| ExpectError::SpawnError("Empty command".to_string()))?;

        let command_line = argv
            .iter()
            .map(|a| a.as_ref().to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ");

        // portable-pty falls back to $HOME when no cwd is set
        let cwd = match self.cwd {
            Some(dir) => dir,
            None => std::env::current_dir()?,
        };

        let mut cmd = CommandBuilder::new(program);
        cmd.args(args);
        cmd.cwd(&cwd);
        for (key, value) in &self.env {
            cmd.env(key, value);
        }

        let pty_pair = native_pty_system()
            .openpty(self.pty_size)
            .map_err(|e| ExpectError::PtyError(e.to_string()))?;

        let child = pty_pair
            .slave
            .spawn_command(cmd)
            .map_err(|e| ExpectError::SpawnError(format!("{}: {}", command_line, e)))?;

        // Keeping the slave open in this process would hide EOF from the reader
        drop(pty_pair.slave);

        let reader = pty_pair
            .master
            .try_clone_reader()
            .map_err(|e| ExpectError::PtyError(e.to_string()))?;

        let writer = pty_pair
            .master
            .take_writer()
            .map_err(|e| ExpectError::PtyError(e.to_string()))?;

        let (tx, rx) = mpsc::unbounded_channel();
        spawn::start_reader(reader, tx)?;

        info!(
            "spawned `{}` (pid {:?}) in {}",
            command_line,
            child.process_id(),
            cwd.display()
        );

        Ok(Session {
            _master: pty_pair.master,
            child: Some(child),
            exit_status: None,
            output: rx,
            writer: Arc::new(Mutex::new(writer)),
            buffer: BufferManager::new(self.max_buffer_size, self.strip_ansi),
            timeout: self.timeout,
            eof_reached: false,
            tee: self.tee_output.then(Tee::default),
            command: command_line,
        })
    }
}
