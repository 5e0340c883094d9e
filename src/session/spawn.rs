//! Process spawning utilities

use crate::result::ExpectError;
use log::{debug, trace};
use portable_pty::Child;
use std::io::{ErrorKind, Read};
use tokio::sync::mpsc::UnboundedSender;

/// Size of a single read from the PTY master
const READ_CHUNK_SIZE: usize = 4096;

/// Split a command line into argv using POSIX shell quoting rules.
pub fn parse_command(command: &str) -> Result<Vec<String>, ExpectError> {
    let parts = shell_words::split(command)
        .map_err(|e| ExpectError::SpawnError(format!("cannot parse {:?}: {}", command, e)))?;

    if parts.is_empty() {
        return Err(ExpectError::SpawnError("Empty command".to_string()));
    }

    Ok(parts)
}

/// Start the background reader that forwards PTY output into `tx`.
///
/// The channel closes when the PTY reports end of stream (or fails), which
/// is how the session observes EOF.
pub fn start_reader(
    mut reader: Box<dyn Read + Send>,
    tx: UnboundedSender<Vec<u8>>,
) -> Result<(), ExpectError> {
    std::thread::Builder::new()
        .name("expectflow-pty-reader".to_string())
        .spawn(move || {
            let mut chunk = [0u8; READ_CHUNK_SIZE];
            loop {
                match reader.read(&mut chunk) {
                    Ok(0) => break,
                    Ok(n) => {
                        trace!("pty reader: {} bytes", n);
                        if tx.send(chunk[..n].to_vec()).is_err() {
                            // Session dropped
                            break;
                        }
                    }
                    Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                    Err(e) => {
                        debug!("pty reader stopped: {}", e);
                        break;
                    }
                }
            }
        })
        .map(|_| ())
        .map_err(|e| ExpectError::SpawnError(format!("cannot start reader thread: {}", e)))
}

/// Check if a child process is still alive
pub fn is_alive(child: &mut Box<dyn Child + Send + Sync>) -> Result<bool, ExpectError> {
    match child.try_wait() {
        Ok(Some(_)) => Ok(false),
        Ok(None) => Ok(true),
        Err(e) => Err(ExpectError::IoError(e)),
    }
}
