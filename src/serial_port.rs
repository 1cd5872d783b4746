use std::{fs::File, io::{self, Error, ErrorKind, Read, Write}, os::fd::{AsRawFd, BorrowedFd, FromRawFd}, path::Path, time::Instant};

use nix::{errno::Errno, fcntl::{Flock, FlockArg}, poll::{PollFd, PollFlags, PollTimeout}};
use termios::Termios;

use crate::config::{BaudRate, LockMode};
use crate::response::{ReadOutcome, ResponseBuffer};


/// Open the file under the given path with flags for direct tty access.
///
/// # Safety
///
/// The fd passed in is an owned file descriptor and it is open because
/// we get the file descriptor from the fcntl::open function call.
pub fn port_open(path: impl AsRef<Path>) -> io::Result<File> {
    use nix::fcntl::OFlag;
    use nix::sys::stat::Mode;

    let oflag =
        // Open for reading and writing.
        OFlag::O_RDWR |
        // Write I/O operations shall complete as defined by synchronized I/O file integrity completion.
        OFlag::O_SYNC |
        // open() shall not cause the terminal device to become the controlling terminal for the process.
        OFlag::O_NOCTTY |
        // open() shall return without waiting for the modem carrier.
        // Cleared by port_set_blocking once CLOCAL is in effect.
        OFlag::O_NONBLOCK;

    let fd = nix::fcntl::open(path.as_ref(), oflag, Mode::empty())?;

    let file = unsafe {
        File::from_raw_fd(fd)
    };
    Ok(file)
}


/// Take the exclusive advisory lock on the port.
///
/// The lock is held for as long as the returned guard lives. On failure
/// the file is handed back together with the error.
pub fn port_lock(port: File, mode: LockMode) -> Result<Flock<File>, (File, Errno)> {
    let arg = match mode {
        LockMode::Wait => FlockArg::LockExclusive,
        LockMode::NoWait => FlockArg::LockExclusiveNonblock,
    };
    Flock::lock(port, arg)
}


/// Read the current line settings of the port.
pub fn port_get_attr(port: &File) -> io::Result<Termios> {
    Termios::from_fd(port.as_raw_fd())
}


/// Switch the settings to raw 8N1 without flow control.
pub fn port_make_raw(termios: &mut Termios, baud: BaudRate, vmin: u8, vtime: u8) -> io::Result<()> {
    termios::cfsetspeed(termios, baud.speed())?;

    // Ignore modem control lines, enable the receiver.
    termios.c_cflag |= termios::CLOCAL | termios::CREAD;
    // No parity, one stop bit, eight data bits.
    termios.c_cflag &= !(termios::PARENB | termios::CSTOPB | termios::CSIZE);
    termios.c_cflag |= termios::CS8;
    // Non-canonical input without echo and signal characters.
    termios.c_lflag &= !(termios::ICANON | termios::ECHO | termios::ECHOE | termios::ISIG);
    // No software flow control.
    termios.c_iflag &= !(termios::IXON | termios::IXOFF | termios::IXANY);
    // No output post-processing.
    termios.c_oflag &= !termios::OPOST;

    termios.c_cc[termios::VMIN] = vmin;
    termios.c_cc[termios::VTIME] = vtime;
    Ok(())
}


/// Apply the settings immediately.
pub fn port_set_attr(port: &File, termios: &Termios) -> io::Result<()> {
    termios::tcsetattr(port.as_raw_fd(), termios::TCSANOW, termios)
}


/// Clear O_NONBLOCK so that reads follow VMIN and VTIME.
pub fn port_set_blocking(port: &File) -> io::Result<()> {
    use nix::fcntl::{fcntl, FcntlArg, OFlag};

    let fd = port.as_raw_fd();
    let flags = OFlag::from_bits_truncate(fcntl(fd, FcntlArg::F_GETFL)?);
    fcntl(fd, FcntlArg::F_SETFL(flags & !OFlag::O_NONBLOCK))?;
    Ok(())
}


/// Time left until `deadline`, in the form poll() takes.
///
/// Waits longer than poll() can express are clamped to the longest one;
/// the caller polls again once it returns.
fn poll_timeout(deadline: Option<Instant>, now: Instant) -> PollTimeout {
    match deadline {
        None => PollTimeout::NONE,
        Some(deadline) => {
            let time_left = deadline.saturating_duration_since(now);
            PollTimeout::try_from(time_left).unwrap_or(PollTimeout::MAX)
        }
    }
}


#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub enum PollResult {
    TimedOut,
    ReadReady,
    Undocumented,
}


/// Poll the port to check if a read can be performed.
///
/// Blocks until the port becomes readable or the deadline passes. Without
/// a deadline the call waits until the port becomes readable.
///
/// # Safety
///
/// The fd remains open and valid for the duration of the returned BorrowedFd object
/// because we borrow a raw pointer from the `&File` only for the duration of the function.
pub fn port_poll(port: &File, deadline: Option<Instant>) -> io::Result<PollResult> {
    let fd = unsafe {
        BorrowedFd::borrow_raw(port.as_raw_fd())
    };
    let timeout = poll_timeout(deadline, Instant::now());
    let input_flags =
        PollFlags::POLLIN |
        PollFlags::POLLPRI |
        PollFlags::POLLRDNORM |
        PollFlags::POLLRDBAND;
    let mut pollfd = [PollFd::new(fd, input_flags)];
    let poll_result = nix::poll::poll(&mut pollfd, timeout);
    match poll_result {
        // Upon failure, poll() shall return -1 and set errno to indicate the error.
        Err(Errno::EINTR) => {
            // Interrupted - The caller checks the deadline and polls again.
            Ok(PollResult::TimedOut)
        },
        Err(errno) => {
            Err(Error::from(errno))
        },
        // A value of 0 indicates that the call timed out and no file descriptors have been selected.
        Ok(0) => {
            Ok(PollResult::TimedOut)
        },
        // A positive value indicates the total number of pollfd structures that have selected events
        Ok(_) => {
            let revents = match pollfd[0].revents() {
                Some(flags) => flags,
                None => {
                    // No revent flags provided
                    return Ok(PollResult::TimedOut)
                },
            };

            // Check for device disconnection
            if revents.intersects(PollFlags::POLLHUP) {
                return Err(Error::other("POLLHUP: Device has been disconnected"));
            }

            // Check for invalid file descriptor
            if revents.intersects(PollFlags::POLLNVAL) {
                return Err(Error::other("POLLNVAL: Invalid fd member"));
            }

            // Check for poll errors
            if revents.intersects(PollFlags::POLLERR) {
                return Err(Error::other("POLLERR: An error has occurred"));
            }

            // Success - Read ready
            let pf_read_ready =
                PollFlags::POLLIN |     // Data other than high-priority data may be read without blocking.
                PollFlags::POLLRDNORM | // Normal data may be read without blocking.
                PollFlags::POLLRDBAND | // Priority data may be read without blocking.
                PollFlags::POLLPRI;     // High priority data may be read without blocking.
            if revents.intersects(pf_read_ready) {
                return Ok(PollResult::ReadReady);
            }

            // Success but status undocumented
            Ok(PollResult::Undocumented)
        }
    }
}


/// Read a single byte from the port. No data, interrupts and timeouts
/// are not errors; `Ok(None)` is returned in such cases.
pub fn port_read_byte(port: &mut File) -> io::Result<Option<u8>> {
    let mut buf = [0; 1];
    match port.read(&mut buf) {
        Ok(0) => {
            // Nothing available right now
            Ok(None)
        }
        Ok(_) => {
            // OK - Got a byte
            Ok(Some(buf[0]))
        }
        Err(err) => match err.kind() {
            ErrorKind::Interrupted | ErrorKind::TimedOut | ErrorKind::WouldBlock => {
                // Ignored. The caller tries again until its deadline.
                Ok(None)
            }
            _ => {
                // I/O Error
                Err(err)
            }
        },
    }
}


/// Discard pending output, write `data` in one call and wait until it is
/// transmitted. A short write is an error.
pub fn port_send(port: &mut File, data: &[u8]) -> io::Result<()> {
    let fd = port.as_raw_fd();
    termios::tcflush(fd, termios::TCOFLUSH)?;
    let written = port.write(data)?;
    if written != data.len() {
        return Err(Error::new(
            ErrorKind::WriteZero,
            format!("short write: {written} of {} bytes", data.len()),
        ));
    }
    termios::tcdrain(fd)
}


/// Receive bytes from the port one at a time until `until` is read, the
/// buffer is full or the deadline passes. With no deadline only the first
/// two end the loop.
pub fn port_recv(port: &mut File, buff: &mut ResponseBuffer, until: u8, deadline: Option<Instant>) -> io::Result<ReadOutcome> {
    loop {
        if buff.is_full() {
            return Ok(ReadOutcome::BufferFull);
        }

        if let Some(deadline) = deadline {
            if deadline <= Instant::now() {
                return Ok(ReadOutcome::TimedOut);
            }
        }

        match port_poll(port, deadline)? {
            PollResult::TimedOut => {
                // Deadline is checked at the top of the loop.
            },
            PollResult::ReadReady => {
                if let Some(byte) = port_read_byte(port)? {
                    buff.push(byte);
                    if byte == until {
                        return Ok(ReadOutcome::LineComplete);
                    }
                }
            },
            PollResult::Undocumented => {
                // The poll result has an undocumented value
            }
        }
    }
}
