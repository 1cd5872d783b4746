use std::io;
use std::path::PathBuf;

use nix::errno::Errno;
use thiserror::Error;

/// Everything that can stop a session.
///
/// Variants are tagged by stage. Process exit codes are derived from them
/// with [`Error::exit_code`] and only at the outermost boundary.
#[derive(Debug, Error)]
pub enum Error {
    /// `--port` was not given.
    #[error("Port not specified")]
    MissingPort,

    /// `--set` was not given.
    #[error("Target temperature not specified")]
    MissingTarget,

    /// `--speed` was not given.
    #[error("Speed not specified")]
    MissingSpeed,

    /// `--speed` is not one of the standard rates.
    #[error("Unsupported speed {0} (expected one of 1200, 4800, 9600, 19200, 38400, 57600, 115200)")]
    UnsupportedSpeed(u32),

    /// The formatted command does not fit the command buffer.
    #[error("Command for temperature {0} does not fit the command buffer")]
    CommandTooLong(i32),

    /// The device path could not be opened.
    #[error("Port opening error: {}: {source}", .path.display())]
    DeviceOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Another process holds the lock and we were told not to wait.
    #[error("Port {} is locked by another process", .path.display())]
    DeviceBusy { path: PathBuf },

    /// The lock call itself failed.
    #[error("Port locking error: {}: {source}", .path.display())]
    DeviceLock {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// `tcgetattr` failed, usually because the path is not a terminal.
    #[error("tcgetattr error: {0}")]
    TermiosRead(#[source] io::Error),

    /// `tcsetattr` failed.
    #[error("tcsetattr error: {0}")]
    TermiosWrite(#[source] io::Error),

    /// Flushing, writing or draining the command failed.
    #[error("Write error: {0}")]
    Write(#[source] io::Error),

    /// Reading the reply failed.
    #[error("Read error: {0}")]
    Read(#[source] io::Error),

    /// The report could not be written to the operator.
    #[error("Output error: {0}")]
    Report(#[source] io::Error),
}

impl Error {
    /// True for errors raised before any device access.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::MissingPort
                | Error::MissingTarget
                | Error::MissingSpeed
                | Error::UnsupportedSpeed(_)
                | Error::CommandTooLong(_)
        )
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            e if e.is_validation() => Errno::EINVAL as i32,
            Error::DeviceBusy { .. } => Errno::EBUSY as i32,
            Error::Write(_) => Errno::ECANCELED as i32,
            Error::DeviceOpen { source, .. }
            | Error::DeviceLock { source, .. }
            | Error::TermiosRead(source)
            | Error::TermiosWrite(source)
            | Error::Read(source)
            | Error::Report(source) => os_code(source),
            _ => Errno::EIO as i32,
        }
    }
}

fn os_code(err: &io::Error) -> i32 {
    err.raw_os_error().unwrap_or(Errno::EIO as i32)
}
