use std::{fmt, path::PathBuf, time::Duration};

use termios::speed_t;

use crate::error::Error;
use crate::RESPONSE_TIMEOUT;

/// Standard serial line rates accepted by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaudRate {
    B1200,
    B4800,
    B9600,
    B19200,
    B38400,
    B57600,
    B115200,
}

impl BaudRate {
    pub const ALL: [BaudRate; 7] = [
        BaudRate::B1200,
        BaudRate::B4800,
        BaudRate::B9600,
        BaudRate::B19200,
        BaudRate::B38400,
        BaudRate::B57600,
        BaudRate::B115200,
    ];

    /// Symbol rate in bits per second.
    pub fn as_u32(self) -> u32 {
        match self {
            BaudRate::B1200 => 1200,
            BaudRate::B4800 => 4800,
            BaudRate::B9600 => 9600,
            BaudRate::B19200 => 19200,
            BaudRate::B38400 => 38400,
            BaudRate::B57600 => 57600,
            BaudRate::B115200 => 115200,
        }
    }

    /// The termios speed constant for `cfsetspeed`.
    pub fn speed(self) -> speed_t {
        match self {
            BaudRate::B1200 => termios::B1200,
            BaudRate::B4800 => termios::B4800,
            BaudRate::B9600 => termios::B9600,
            BaudRate::B19200 => termios::B19200,
            BaudRate::B38400 => termios::B38400,
            BaudRate::B57600 => termios::os::linux::B57600,
            BaudRate::B115200 => termios::os::linux::B115200,
        }
    }
}

impl TryFrom<u32> for BaudRate {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        BaudRate::ALL
            .into_iter()
            .find(|rate| rate.as_u32() == value)
            .ok_or(Error::UnsupportedSpeed(value))
    }
}

impl fmt::Display for BaudRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u32())
    }
}

/// How to acquire the advisory lock on the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockMode {
    /// Block until the current holder releases the device.
    Wait,
    /// Fail immediately if the device is held.
    #[default]
    NoWait,
}

impl LockMode {
    pub fn from_wait_flag(wait: bool) -> Self {
        if wait {
            LockMode::Wait
        } else {
            LockMode::NoWait
        }
    }
}

/// Immutable settings of one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub port: PathBuf,
    pub target: i32,
    pub baud: BaudRate,
    /// Minimum bytes before a read returns (termios VMIN).
    pub vmin: u8,
    /// Inter-byte timeout in tenths of a second (termios VTIME).
    pub vtime: u8,
    pub debug: bool,
    pub lock: LockMode,
    pub response_timeout: Duration,
}

impl SessionConfig {
    pub fn new(port: impl Into<PathBuf>, target: i32, baud: BaudRate) -> Self {
        Self {
            port: port.into(),
            target,
            baud,
            vmin: 0,
            vtime: 0,
            debug: false,
            lock: LockMode::default(),
            response_timeout: RESPONSE_TIMEOUT,
        }
    }

    pub fn with_vmin(mut self, vmin: u8) -> Self {
        self.vmin = vmin;
        self
    }

    pub fn with_vtime(mut self, vtime: u8) -> Self {
        self.vtime = vtime;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_lock(mut self, lock: LockMode) -> Self {
        self.lock = lock;
        self
    }

    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }
}

impl fmt::Display for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "port:  {}", self.port.display())?;
        writeln!(f, "set:   {}", self.target)?;
        writeln!(f, "speed: {}", self.baud)?;
        writeln!(f, "vmin:  {}", self.vmin)?;
        writeln!(f, "vtime: {}", self.vtime)?;
        writeln!(f, "debug: {}", self.debug)?;
        let lock = match self.lock {
            LockMode::Wait => "wait",
            LockMode::NoWait => "nowait",
        };
        writeln!(f, "flock: {lock}")
    }
}
