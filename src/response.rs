use std::{borrow::Cow, fmt};

/// Size of the response buffer, sentinel included.
pub const RESPONSE_CAPACITY: usize = 256;

/// Fixed-capacity reply storage.
///
/// Holds at most `RESPONSE_CAPACITY - 1` bytes. The byte right after the
/// accumulated data is always `0`.
#[derive(Clone)]
pub struct ResponseBuffer {
    bytes: [u8; RESPONSE_CAPACITY],
    len: usize,
}

impl ResponseBuffer {
    pub fn new() -> Self {
        Self {
            bytes: [0; RESPONSE_CAPACITY],
            len: 0,
        }
    }

    /// Appends one byte. Returns false, leaving the buffer untouched, when full.
    pub fn push(&mut self, byte: u8) -> bool {
        if self.is_full() {
            return false;
        }
        self.bytes[self.len] = byte;
        self.len += 1;
        self.bytes[self.len] = 0;
        true
    }

    pub fn is_full(&self) -> bool {
        self.len >= RESPONSE_CAPACITY - 1
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    /// Accumulated bytes plus the trailing sentinel.
    pub fn as_bytes_with_sentinel(&self) -> &[u8] {
        &self.bytes[..=self.len]
    }

    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.as_bytes())
    }
}

impl Default for ResponseBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ResponseBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseBuffer")
            .field("len", &self.len)
            .field("text", &self.to_string_lossy())
            .finish()
    }
}

/// Why the read loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// A newline was read; it is the last byte in the buffer.
    LineComplete,
    /// The deadline passed before a newline arrived.
    TimedOut,
    /// The buffer reached its capacity before a newline arrived.
    BufferFull,
}

/// The reply collected by one read loop.
#[derive(Debug, Clone)]
pub struct Response {
    pub buffer: ResponseBuffer,
    pub outcome: ReadOutcome,
}

impl Response {
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.buffer.as_bytes()
    }
}
