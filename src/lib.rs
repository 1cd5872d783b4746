//! # Temperature Controller Control
//!
//! A Linux-only tool that drives a temperature controller attached to a
//! serial line. One invocation:
//! 1. Opens the `/dev/tty` file without making it the controlling terminal.
//! 2. Takes an exclusive advisory lock so that two instances never talk to
//!    the same device at once.
//! 3. Sets the `termios` flags for raw 8N1 at the requested speed.
//! 4. Sends a single `set <temperature>\n` line and waits until it is on the wire.
//! 5. Waits up to [`RESPONSE_TIMEOUT`] for one reply line.
//!
//! **This is an "async-less" library**; every call blocks the calling thread.

mod cli;
mod command;
mod config;
mod connection;
mod error;
mod response;
mod serial_port;

use std::io::Write;
use std::time::Duration;

use tracing::debug;

pub use cli::{parse_error_message, requests_version, version_text, Cli, PROGRAM_NAME};
pub use command::{CommandLine, COMMAND_CAPACITY};
pub use config::{BaudRate, LockMode, SessionConfig};
pub use connection::Connection;
pub use error::Error;
pub use response::{ReadOutcome, Response, ResponseBuffer, RESPONSE_CAPACITY};

/// How long to wait for the controller to answer.
pub const RESPONSE_TIMEOUT: Duration = Duration::from_secs(3);

/// Printed when the controller stays silent.
pub const NO_RESPONSE_NOTICE: &str = "No response from device.";

/// How a session ended after the command was sent.
#[derive(Debug)]
pub enum Outcome {
    /// At least one byte came back.
    Answered(Response),
    /// Nothing came back before the timeout.
    NoResponse,
    /// Reading failed. The command itself was delivered.
    ReadFailed(Error),
}

/// Runs one session: send the set-point and report the reply to `out`.
///
/// Errors before and during transmission are returned. A failed read is
/// not: it comes back as [`Outcome::ReadFailed`] since the command has
/// already been delivered at that point.
pub fn run(config: &SessionConfig, out: &mut impl Write) -> Result<Outcome, Error> {
    let command = CommandLine::new(config.target)?;

    let mut conn = Connection::open(config)?;
    conn.send(&command)?;
    write!(out, "Successfully sent: {command}").map_err(Error::Report)?;
    out.flush().map_err(Error::Report)?;

    let outcome = match conn.receive_line(config.response_timeout) {
        Ok(response) if response.is_empty() => {
            writeln!(out, "{NO_RESPONSE_NOTICE}").map_err(Error::Report)?;
            Outcome::NoResponse
        }
        Ok(response) => {
            out.write_all(response.as_bytes()).map_err(Error::Report)?;
            Outcome::Answered(response)
        }
        Err(err) => Outcome::ReadFailed(err),
    };
    out.flush().map_err(Error::Report)?;

    debug!(path = %conn.path().display(), "releasing port");
    Ok(outcome)
}
