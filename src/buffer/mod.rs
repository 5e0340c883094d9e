//! Buffer management for process output

mod ansi;

pub use ansi::AnsiStripper;

use bytes::BytesMut;

/// Ratio for buffer compaction strategy.
/// When buffer is full, discard oldest 1/3 and keep newest 2/3.
const DISCARD_RATIO: usize = 3;

/// Accumulates process output and tracks how much of it has been consumed
/// by earlier matches.
///
/// Bytes before `matched_position` are kept for diagnostics but are never
/// offered to a matcher again.
pub struct BufferManager {
    buffer: BytesMut,
    matched_position: usize,
    max_size: usize,
    stripper: Option<AnsiStripper>,
    scratch: Vec<u8>,
}

impl BufferManager {
    /// Create a new buffer manager
    pub fn new(max_size: usize, strip_ansi: bool) -> Self {
        Self {
            buffer: BytesMut::with_capacity(max_size.min(64 * 1024)),
            matched_position: 0,
            max_size,
            stripper: strip_ansi.then(AnsiStripper::new),
            scratch: Vec::new(),
        }
    }

    /// Append freshly read output
    pub fn append(&mut self, data: &[u8]) {
        let data = match self.stripper.as_mut() {
            Some(stripper) => {
                self.scratch.clear();
                stripper.strip_into(data, &mut self.scratch);
                self.scratch.as_slice()
            }
            None => data,
        };

        if self.buffer.len() + data.len() > self.max_size {
            Self::compact(&mut self.buffer, &mut self.matched_position, self.max_size);
        }

        self.buffer.extend_from_slice(data);
    }

    /// Get the buffer as bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Output not yet consumed by a match
    pub fn unmatched(&self) -> &[u8] {
        &self.buffer[self.matched_position..]
    }

    /// Consume everything up to `end_position`
    pub fn mark_matched(&mut self, end_position: usize) {
        self.matched_position = end_position.clamp(self.matched_position, self.buffer.len());
    }

    /// Consume the whole buffer
    pub fn mark_all_matched(&mut self) {
        self.matched_position = self.buffer.len();
    }

    /// Get the current buffer length
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether nothing has been buffered
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Get the matched position
    pub fn matched_position(&self) -> usize {
        self.matched_position
    }

    /// Unconsumed text in front of `position`
    pub fn unmatched_before(&self, position: usize) -> String {
        let end = position.clamp(self.matched_position, self.buffer.len());
        String::from_utf8_lossy(&self.buffer[self.matched_position..end]).into_owned()
    }

    /// Text between two absolute positions
    pub fn text(&self, start: usize, end: usize) -> String {
        let end = end.min(self.buffer.len());
        String::from_utf8_lossy(&self.buffer[start.min(end)..end]).into_owned()
    }

    /// Last `max` bytes of output, consumed or not, for error reports
    pub fn tail(&self, max: usize) -> String {
        let start = self.buffer.len().saturating_sub(max);
        String::from_utf8_lossy(&self.buffer[start..]).into_owned()
    }

    /// Compact the buffer using 2/3 discard strategy
    fn compact(buffer: &mut BytesMut, matched_position: &mut usize, max_size: usize) {
        let discard_amount = max_size / DISCARD_RATIO;
        let keep_from = discard_amount.max(*matched_position);

        if keep_from >= buffer.len() {
            buffer.clear();
            *matched_position = 0;
        } else if keep_from > 0 {
            let _ = buffer.split_to(keep_from);
            *matched_position = matched_position.saturating_sub(keep_from);
        }
    }
}
