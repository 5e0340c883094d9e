//! ANSI escape sequence stripping

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum State {
    #[default]
    Ground,
    Escape,
    Csi,
    Osc,
    OscEscape,
    Charset,
}

/// Removes escape sequences from a byte stream.
///
/// State is carried between calls, so a sequence split across two PTY reads
/// is still removed completely.
#[derive(Debug, Default, Clone)]
pub struct AnsiStripper {
    state: State,
}

impl AnsiStripper {
    /// Create a stripper in the ground state
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the printable part of `data` to `out`.
    pub fn strip_into(&mut self, data: &[u8], out: &mut Vec<u8>) {
        for &byte in data {
            self.state = match (self.state, byte) {
                (State::Ground, 0x1b) => State::Escape,
                (State::Ground, _) => {
                    out.push(byte);
                    State::Ground
                }
                (State::Escape, b'[') => State::Csi,
                (State::Escape, b']') => State::Osc,
                (State::Escape, b'(' | b')') => State::Charset,
                // Two-byte sequences such as ESC = or ESC M
                (State::Escape, _) => State::Ground,
                // CSI ends with a final byte in 0x40..=0x7e
                (State::Csi, 0x40..=0x7e) => State::Ground,
                (State::Csi, _) => State::Csi,
                (State::Osc, 0x07) => State::Ground,
                (State::Osc, 0x1b) => State::OscEscape,
                (State::Osc, _) => State::Osc,
                (State::OscEscape, b'\\') => State::Ground,
                (State::OscEscape, _) => State::Osc,
                (State::Charset, _) => State::Ground,
            };
        }
    }
}
