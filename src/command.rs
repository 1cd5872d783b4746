use std::{
    fmt,
    io::{Cursor, Write},
};

use crate::error::Error;

/// Size of the command buffer in bytes.
pub const COMMAND_CAPACITY: usize = 32;

/// A formatted `set <temperature>\n` line, ready for the wire.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct CommandLine {
    buf: [u8; COMMAND_CAPACITY],
    len: usize,
}

impl CommandLine {
    /// Formats the set-point command for `temperature`.
    pub fn new(temperature: i32) -> Result<Self, Error> {
        let mut buf = [0; COMMAND_CAPACITY];
        let len = format_set(&mut buf, temperature)?;
        Ok(Self { buf, len })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    pub fn as_str(&self) -> &str {
        // Only ASCII digits, sign, space and newline are ever written.
        std::str::from_utf8(self.as_bytes()).unwrap_or_default()
    }
}

/// Writes `set <temperature>\n` into `buf` and returns its length.
/// A line that would not fit is reported instead of truncated.
fn format_set(buf: &mut [u8], temperature: i32) -> Result<usize, Error> {
    let mut cursor = Cursor::new(buf);
    writeln!(cursor, "set {temperature}").map_err(|_| Error::CommandTooLong(temperature))?;
    Ok(cursor.position() as usize)
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CommandLine").field(&self.as_str()).finish()
    }
}
