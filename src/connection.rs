use std::{
    fs::File,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use nix::{errno::Errno, fcntl::Flock};
use tracing::{debug, info, warn};

use crate::command::CommandLine;
use crate::config::{LockMode, SessionConfig};
use crate::error::Error;
use crate::response::{Response, ResponseBuffer};
use crate::serial_port::{
    port_get_attr, port_lock, port_make_raw, port_open, port_recv, port_send, port_set_attr,
    port_set_blocking,
};

/// An opened, exclusively locked and configured serial device.
///
/// Dropping the connection releases the lock and closes the device.
pub struct Connection {
    path: PathBuf,
    file: Flock<File>,
}

impl Connection {
    /// Opens, locks and configures the device named in `config`.
    pub fn open(config: &SessionConfig) -> Result<Self, Error> {
        let path = config.port.clone();

        debug!(path = %path.display(), "opening port");
        let file = port_open(&path).map_err(|source| Error::DeviceOpen {
            path: path.clone(),
            source,
        })?;

        let file = match port_lock(file, LockMode::NoWait) {
            Ok(file) => file,
            Err((file, errno)) if errno == Errno::EWOULDBLOCK => match config.lock {
                LockMode::NoWait => return Err(Error::DeviceBusy { path }),
                LockMode::Wait => {
                    warn!(path = %path.display(), "port is locked by another process, waiting");
                    port_lock(file, LockMode::Wait).map_err(|(_, errno)| Error::DeviceLock {
                        path: path.clone(),
                        source: errno.into(),
                    })?
                }
            },
            Err((_, errno)) => {
                return Err(Error::DeviceLock {
                    path,
                    source: errno.into(),
                })
            }
        };
        debug!(path = %path.display(), "lock acquired");

        let mut termios = port_get_attr(&file).map_err(Error::TermiosRead)?;
        port_make_raw(&mut termios, config.baud, config.vmin, config.vtime)
            .map_err(Error::TermiosWrite)?;
        port_set_attr(&file, &termios).map_err(Error::TermiosWrite)?;
        port_set_blocking(&file).map_err(Error::TermiosWrite)?;
        debug!(
            baud = config.baud.as_u32(),
            vmin = config.vmin,
            vtime = config.vtime,
            "port configured"
        );

        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sends the command and waits until it has left the output queue.
    pub fn send(&mut self, command: &CommandLine) -> Result<(), Error> {
        port_send(&mut self.file, command.as_bytes()).map_err(Error::Write)?;
        info!(command = command.as_str().trim_end(), "command sent");
        Ok(())
    }

    /// Collects one reply line, giving up after `timeout`.
    ///
    /// Running out of time is not an error: the bytes gathered so far,
    /// possibly none, are returned. A timeout too large to represent as a
    /// deadline waits for a line or a full buffer.
    pub fn receive_line(&mut self, timeout: Duration) -> Result<Response, Error> {
        let deadline = Instant::now().checked_add(timeout);
        let mut buffer = ResponseBuffer::new();
        let outcome =
            port_recv(&mut self.file, &mut buffer, b'\n', deadline).map_err(Error::Read)?;
        debug!(?outcome, len = buffer.len(), "reply collected");
        Ok(Response { buffer, outcome })
    }
}
