//! The cached privileged-access credential and the prompts that obtain it

use log::debug;
use secrecy::{ExposeSecret, SecretString};
use std::io::{self, BufRead, Write};

/// Replacement for the credential in diagnostic output
const REDACTED: &str = "********";

/// Interactive input the workflow needs from a person.
pub trait Prompter: Send {
    /// Read the credential without echoing it.
    fn get_secret(&mut self) -> io::Result<SecretString>;

    /// Show `message` and wait for acknowledgement; `false` declines.
    fn confirm(&mut self, message: &str) -> io::Result<bool>;
}

/// Set-once holder for the credential.
///
/// The first [`get_or_fetch`](Credential::get_or_fetch) asks the prompter;
/// every later call returns the cached value.
#[derive(Default)]
pub struct Credential {
    secret: Option<SecretString>,
}

impl Credential {
    /// An empty holder
    pub fn new() -> Self {
        Self::default()
    }

    /// A holder that is already filled, so no prompt will happen
    pub fn preset(secret: SecretString) -> Self {
        Self {
            secret: Some(secret),
        }
    }

    /// Whether the credential has been fetched
    pub fn is_cached(&self) -> bool {
        self.secret.is_some()
    }

    /// The cached credential, if any
    pub fn get(&self) -> Option<&SecretString> {
        self.secret.as_ref()
    }

    /// Cache `secret` unless a credential is already held, and return the
    /// held one.
    pub fn set(&mut self, secret: SecretString) -> &SecretString {
        self.secret.get_or_insert(secret)
    }

    /// The cached credential, fetching it from `prompter` on first use.
    pub fn get_or_fetch(&mut self, prompter: &mut dyn Prompter) -> io::Result<&SecretString> {
        if self.secret.is_none() {
            debug!("fetching credential");
            let secret = prompter.get_secret()?;
            return Ok(self.set(secret));
        }

        self.secret
            .as_ref()
            .ok_or_else(|| io::Error::other("credential missing after fetch"))
    }

    /// Replace every occurrence of the credential in `text`.
    pub fn redact(&self, text: &str) -> String {
        match &self.secret {
            Some(secret) if !secret.expose_secret().is_empty() => {
                text.replace(secret.expose_secret(), REDACTED)
            }
            _ => text.to_string(),
        }
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("cached", &self.is_cached())
            .finish()
    }
}

/// Prompts on the controlling terminal (stderr for messages, stdin for input).
#[derive(Debug)]
pub struct TerminalPrompter {
    label: String,
}

impl Default for TerminalPrompter {
    fn default() -> Self {
        Self::new("Password: ")
    }
}

impl TerminalPrompter {
    /// Use `label` as the credential prompt
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

impl Prompter for TerminalPrompter {
    fn get_secret(&mut self) -> io::Result<SecretString> {
        let mut stderr = io::stderr();
        stderr.write_all(self.label.as_bytes())?;
        stderr.flush()?;

        let line = read_hidden_line()?;
        Ok(SecretString::from(line))
    }

    fn confirm(&mut self, message: &str) -> io::Result<bool> {
        let mut stderr = io::stderr();
        writeln!(stderr, "{}", message)?;
        stderr.flush()?;

        // End of input counts as a refusal
        Ok(read_line()?.is_some())
    }
}

fn read_line() -> io::Result<Option<String>> {
    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        return Ok(None);
    }
    let trimmed = line.trim_end_matches(['\n', '\r']).len();
    line.truncate(trimmed);
    Ok(Some(line))
}

/// Terminal attributes to put back if a hidden read is abandoned
#[cfg(unix)]
static SAVED_TERMINAL: std::sync::Mutex<Option<libc::termios>> = std::sync::Mutex::new(None);

/// Turn terminal echo back on if a credential prompt was interrupted.
///
/// A cancelled run can leave [`TerminalPrompter`] blocked in a read with echo
/// disabled; call this before exiting.
pub fn restore_terminal() {
    #[cfg(unix)]
    {
        use std::os::unix::io::AsRawFd;

        let saved = SAVED_TERMINAL.lock().ok().and_then(|mut s| s.take());
        if let Some(original) = saved {
            // SAFETY: original came from tcgetattr on this descriptor.
            unsafe { libc::tcsetattr(io::stdin().as_raw_fd(), libc::TCSANOW, &original) };
        }
    }
}

#[cfg(unix)]
fn read_hidden_line() -> io::Result<String> {
    use std::os::unix::io::AsRawFd;

    let fd = io::stdin().as_raw_fd();

    // SAFETY: termios is plain old data and tcgetattr fully initializes it
    // on success; on failure stdin is not a terminal and we read it as is.
    let mut term: libc::termios = unsafe { std::mem::zeroed() };
    if unsafe { libc::tcgetattr(fd, &mut term) } != 0 {
        return read_line()?.ok_or_else(|| io::Error::from(io::ErrorKind::UnexpectedEof));
    }

    let original = term;
    if let Ok(mut saved) = SAVED_TERMINAL.lock() {
        *saved = Some(original);
    }
    term.c_lflag &= !libc::ECHO;
    term.c_lflag |= libc::ECHONL;

    // SAFETY: fd is a valid terminal descriptor and term came from tcgetattr.
    if unsafe { libc::tcsetattr(fd, libc::TCSANOW, &term) } != 0 {
        return Err(io::Error::last_os_error());
    }

    let line = read_line();

    // SAFETY: restores the attributes read above.
    unsafe { libc::tcsetattr(fd, libc::TCSANOW, &original) };
    if let Ok(mut saved) = SAVED_TERMINAL.lock() {
        *saved = None;
    }

    line?.ok_or_else(|| io::Error::from(io::ErrorKind::UnexpectedEof))
}

#[cfg(not(unix))]
fn read_hidden_line() -> io::Result<String> {
    log::warn!("cannot disable terminal echo on this platform");
    read_line()?.ok_or_else(|| io::Error::from(io::ErrorKind::UnexpectedEof))
}
