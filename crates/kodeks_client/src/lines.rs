//! Byte buffer that yields newline-terminated lines across chunk boundaries.
//!
//! Lines are split on raw `\n` bytes and decoded only once complete, so a
//! UTF-8 sequence cut in half by the transport is reassembled before decoding.

use std::collections::VecDeque;
use std::string::FromUtf8Error;

pub struct LineBuffer {
    buffer: VecDeque<u8>,
    /// Bytes already known to hold no newline.
    scanned: usize,
}

impl LineBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity),
            scanned: 0,
        }
    }

    pub fn extend(&mut self, bytes: &[u8]) {
        self.buffer.extend(bytes);
    }

    /// Next complete line without its terminator, trimmed.
    /// `None` until a newline has arrived.
    pub fn next_line(&mut self) -> Option<Result<String, FromUtf8Error>> {
        let Some(offset) = self.buffer.range(self.scanned..).position(|&b| b == b'\n') else {
            self.scanned = self.buffer.len();
            return None;
        };
        let newline_pos = self.scanned + offset;
        self.scanned = 0;
        let mut line: Vec<u8> = self.buffer.drain(..=newline_pos).collect();
        line.pop();
        Some(String::from_utf8(line).map(|s| s.trim().to_string()))
    }

    /// Whatever is left after the stream ended without a final newline.
    pub fn take_remainder(&mut self) -> Option<Result<String, FromUtf8Error>> {
        if self.buffer.is_empty() {
            return None;
        }
        self.scanned = 0;
        let rest: Vec<u8> = self.buffer.drain(..).collect();
        Some(String::from_utf8(rest).map(|s| s.trim().to_string()))
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::with_capacity(4096)
    }
}
