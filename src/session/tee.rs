//! Copying child output to the console with a secret masked out

use memchr::memmem;
use secrecy::{ExposeSecret, SecretString};
use std::io::{self, Write};

const MASK: &[u8] = b"********";

/// Forwards output chunks, replacing every occurrence of the masked secret.
///
/// A secret can straddle two reads, so a trailing fragment that could be the
/// start of it is held back until the next chunk decides.
#[derive(Default)]
pub(crate) struct Tee {
    mask: Option<SecretString>,
    pending: Vec<u8>,
}

impl Tee {
    pub(crate) fn mask(&mut self, secret: &SecretString) {
        if !secret.expose_secret().is_empty() {
            self.mask = Some(SecretString::from(secret.expose_secret().to_owned()));
        }
    }

    pub(crate) fn write(&mut self, chunk: &[u8], out: &mut impl Write) -> io::Result<()> {
        let Some(mask) = &self.mask else {
            out.write_all(chunk)?;
            return out.flush();
        };
        let secret = mask.expose_secret().as_bytes();

        self.pending.extend_from_slice(chunk);
        let mut emit = Vec::with_capacity(self.pending.len());
        let mut rest = &self.pending[..];

        while let Some(pos) = memmem::find(rest, secret) {
            emit.extend_from_slice(&rest[..pos]);
            emit.extend_from_slice(MASK);
            rest = &rest[pos + secret.len()..];
        }

        let longest = (secret.len() - 1).min(rest.len());
        let keep = (1..=longest)
            .rev()
            .find(|&n| rest.ends_with(&secret[..n]))
            .unwrap_or(0);
        emit.extend_from_slice(&rest[..rest.len() - keep]);
        self.pending = rest[rest.len() - keep..].to_vec();

        out.write_all(&emit)?;
        out.flush()
    }

    /// Emit whatever was held back; called once the stream has ended.
    pub(crate) fn finish(&mut self, out: &mut impl Write) -> io::Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        out.write_all(&std::mem::take(&mut self.pending))?;
        out.flush()
    }
}
