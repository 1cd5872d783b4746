#![allow(dead_code)]

use std::{
    fs::{File, OpenOptions},
    io::{Read, Write},
    os::{fd::AsRawFd, unix::fs::OpenOptionsExt},
    path::{Path, PathBuf},
    thread,
    time::Duration,
};

use crossbeam::channel::{unbounded, Receiver, RecvTimeoutError};
use nix::{
    fcntl::{Flock, FlockArg, OFlag},
    pty::{grantpt, posix_openpt, ptsname_r, unlockpt, PtyMaster},
};
use termios::Termios;

/// How the simulated controller reacts to a received line.
#[derive(Debug, Clone)]
pub enum Behaviour {
    /// Never answers.
    Silent,
    /// Answers every line with the given bytes after a delay.
    Reply(Vec<u8>, Duration),
    /// Closes its end of the line after a delay.
    HangUp(Duration),
}

/// A temperature controller simulated on the master side of a pseudo-terminal.
///
/// The slave path is what the tool opens. Every line the controller
/// receives is forwarded on `received`.
pub struct FakeDevice {
    path: PathBuf,
    received: Receiver<Vec<u8>>,
    // Keeps the slave side open so the master never sees a hangup between sessions.
    slave: File,
}

impl FakeDevice {
    pub fn spawn(behaviour: Behaviour) -> Self {
        let master = posix_openpt(OFlag::O_RDWR | OFlag::O_NOCTTY).unwrap();
        grantpt(&master).unwrap();
        unlockpt(&master).unwrap();
        let path = PathBuf::from(ptsname_r(&master).unwrap());

        let slave = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(OFlag::O_NOCTTY.bits())
            .open(&path)
            .unwrap();

        let (tx, received) = unbounded();
        thread::spawn(move || controller(master, behaviour, tx));

        Self {
            path,
            received,
            slave,
        }
    }

    pub fn silent() -> Self {
        Self::spawn(Behaviour::Silent)
    }

    pub fn replying(reply: &[u8], delay: Duration) -> Self {
        Self::spawn(Behaviour::Reply(reply.to_vec(), delay))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Next line the controller received, if one arrives within `timeout`.
    pub fn next_line(&self, timeout: Duration) -> Option<Vec<u8>> {
        match self.received.recv_timeout(timeout) {
            Ok(line) => Some(line),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Line settings currently in effect on the slave side.
    pub fn attrs(&self) -> Termios {
        Termios::from_fd(self.slave.as_raw_fd()).unwrap()
    }

    /// Writes `bytes` from the host side of the line, as if the tool sent them.
    pub fn write_from_host(&self, bytes: &[u8]) {
        (&self.slave).write_all(bytes).unwrap();
    }

    /// Holds the advisory lock on the device path until the guard is dropped.
    pub fn hold_lock(&self) -> Flock<File> {
        let file = OpenOptions::new()
            .read(true)
            .custom_flags(OFlag::O_NOCTTY.bits())
            .open(&self.path)
            .unwrap();
        Flock::lock(file, FlockArg::LockExclusiveNonblock)
            .map_err(|(_, errno)| errno)
            .unwrap()
    }
}

fn controller(mut master: PtyMaster, behaviour: Behaviour, tx: crossbeam::channel::Sender<Vec<u8>>) {
    let mut line = Vec::new();
    let mut buf = [0u8; 64];
    loop {
        // Fails with EIO once every slave descriptor is closed.
        let n = match master.read(&mut buf) {
            Ok(0) | Err(_) => return,
            Ok(n) => n,
        };
        for &byte in &buf[..n] {
            line.push(byte);
            if byte != b'\n' {
                continue;
            }
            let _ = tx.send(std::mem::take(&mut line));
            match &behaviour {
                Behaviour::Silent => {}
                Behaviour::Reply(reply, delay) => {
                    thread::sleep(*delay);
                    if master.write_all(reply).is_err() {
                        return;
                    }
                }
                Behaviour::HangUp(delay) => {
                    thread::sleep(*delay);
                    return;
                }
            }
        }
    }
}
