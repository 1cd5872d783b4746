use std::{ffi::OsStr, path::PathBuf};

use clap::Parser;

use crate::command::CommandLine;
use crate::config::{BaudRate, LockMode, SessionConfig};
use crate::error::Error;

pub const PROGRAM_NAME: &str = "tmcctl";

/// Send a set-point to a temperature controller over a serial line.
#[derive(Debug, Parser)]
#[command(
    name = PROGRAM_NAME,
    after_help = "Examples:\n  tmcctl -p /dev/ttyUSB0 -s 115200 -t 46\n  tmcctl -p /dev/ttyUSB0 -s 9600 -t 72 -m 1 -i 5 -w"
)]
pub struct Cli {
    /// Print version information and exit
    #[arg(short = 'v', long)]
    pub version: bool,

    /// Serial device to drive
    #[arg(short = 'p', long, value_name = "FILENAME")]
    pub port: Option<PathBuf>,

    /// Target temperature
    #[arg(short = 't', long = "set", value_name = "TEMP", allow_negative_numbers = true)]
    pub target: Option<i32>,

    /// Line speed: 1200, 4800, 9600, 19200, 38400, 57600 or 115200
    #[arg(short = 's', long, value_name = "BAUD")]
    pub speed: Option<u32>,

    /// Minimum bytes before a read returns (VMIN)
    #[arg(short = 'm', long, value_name = "COUNT", default_value_t = 0)]
    pub vmin: u8,

    /// Inter-byte read timeout in tenths of a second (VTIME)
    #[arg(short = 'i', long, value_name = "DECISECONDS", default_value_t = 0)]
    pub vtime: u8,

    /// Echo the parsed configuration
    #[arg(short = 'd', long)]
    pub debug: bool,

    /// Wait for the device lock instead of failing
    #[arg(short = 'w', long)]
    pub flock: bool,
}

impl Cli {
    /// Checks required fields and builds the session settings.
    ///
    /// The command line is formatted here as well so that a value that
    /// cannot be sent is rejected before the device is opened.
    pub fn into_config(self) -> Result<SessionConfig, Error> {
        let port = self.port.ok_or(Error::MissingPort)?;
        let target = self.target.ok_or(Error::MissingTarget)?;
        let speed = self.speed.ok_or(Error::MissingSpeed)?;
        let baud = BaudRate::try_from(speed)?;
        CommandLine::new(target)?;

        Ok(SessionConfig::new(port, target, baud)
            .with_vmin(self.vmin)
            .with_vtime(self.vtime)
            .with_debug(self.debug)
            .with_lock(LockMode::from_wait_flag(self.flock)))
    }
}

/// True when `--version` or `-v` appears before any `--` separator.
///
/// Lets the version banner win over argument errors elsewhere on the line.
pub fn requests_version<I, S>(args: I) -> bool
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    args.into_iter()
        .map(|arg| arg.as_ref().to_owned())
        .take_while(|arg| arg != "--")
        .any(|arg| arg == "-v" || arg == "--version")
}

/// First line of a clap parse error, without clap's `error: ` prefix and
/// trailing usage hints.
pub fn parse_error_message(err: &clap::Error) -> String {
    let rendered = err.render().to_string();
    let first = rendered.lines().next().unwrap_or_default();
    first.strip_prefix("error: ").unwrap_or(first).to_string()
}

pub fn version_text() -> String {
    format!(
        "{PROGRAM_NAME} {}\n\
         Copyright (C) 2026 Michael\n\
         License GPLv3+: GNU GPL version 3 or later <https://gnu.org/licenses/gpl.html>.\n\
         This is free software: you are free to change and redistribute it.\n\
         There is NO WARRANTY, to the extent permitted by law.\n\
         \n\
         Written by Michael.\n",
        env!("CARGO_PKG_VERSION")
    )
}
