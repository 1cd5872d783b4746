mod common;

use std::{
    path::Path,
    process::{Command, Output},
    time::{Duration, Instant},
};

use common::FakeDevice;

fn tmcctl(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_tmcctl"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn sends_and_prints_reply() {
    let device = FakeDevice::replying(b"ok 72\n", Duration::from_millis(200));

    let output = tmcctl(&[
        "--port", path_str(device.path()), "--speed", "9600", "--set", "72", "--vmin", "1",
        "--vtime", "5",
    ]);

    assert_eq!(output.status.code(), Some(0), "{}", stderr(&output));
    assert_eq!(stdout(&output), "Successfully sent: set 72\nok 72\n");
    assert_eq!(device.next_line(Duration::from_secs(1)).unwrap(), b"set 72\n");
}

#[test]
fn silent_device_prints_notice_after_timeout() {
    let device = FakeDevice::silent();

    let started = Instant::now();
    let output = tmcctl(&[
        "--port", path_str(device.path()), "--speed", "9600", "--set", "72", "--vmin", "1",
        "--vtime", "5",
    ]);
    let elapsed = started.elapsed();

    assert_eq!(output.status.code(), Some(0), "{}", stderr(&output));
    assert_eq!(stdout(&output), "Successfully sent: set 72\nNo response from device.\n");
    assert!(elapsed >= Duration::from_secs(3), "returned after {elapsed:?}");
}

#[test]
fn port_alone_is_einval() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ttyFAKE0");

    let output = tmcctl(&["--port", path_str(&path)]);

    assert_eq!(output.status.code(), Some(22));
    assert!(stdout(&output).is_empty());
    assert!(stderr(&output).contains("not specified"));
    assert!(!path.exists());
}

#[test]
fn unsupported_speed_is_einval() {
    let device = FakeDevice::silent();

    let output = tmcctl(&["-p", path_str(device.path()), "-s", "9601", "-t", "72"]);

    assert_eq!(output.status.code(), Some(22));
    assert!(stderr(&output).contains("Unsupported speed 9601"));
    assert!(device.next_line(Duration::from_millis(200)).is_none());
}

#[test]
fn malformed_number_is_einval() {
    let output = tmcctl(&["-p", "/dev/ttyFAKE0", "-s", "9600", "-t", "hot"]);
    assert_eq!(output.status.code(), Some(22));
    let stderr = stderr(&output);
    assert!(stderr.starts_with("Error: invalid value 'hot'"), "{stderr}");
    assert!(stderr.ends_with("Try '--help' for more information.\n"), "{stderr}");
}

#[test]
fn unknown_flag_uses_the_same_hint() {
    let output = tmcctl(&["--bogus"]);
    assert_eq!(output.status.code(), Some(22));
    assert!(stderr(&output).ends_with("Try '--help' for more information.\n"));
}

#[test]
fn version_wins_over_bad_arguments() {
    let output = tmcctl(&["-v", "--bogus"]);
    assert_eq!(output.status.code(), Some(0));
    assert!(stdout(&output).starts_with(&format!("tmcctl {}\n", env!("CARGO_PKG_VERSION"))));
}

#[test]
fn locked_device_is_ebusy() {
    let device = FakeDevice::silent();
    let _lock = device.hold_lock();

    let output = tmcctl(&["-p", path_str(device.path()), "-s", "9600", "-t", "72"]);

    assert_eq!(output.status.code(), Some(16));
    assert!(stdout(&output).is_empty());
    assert!(device.next_line(Duration::from_millis(200)).is_none());
}

#[test]
fn missing_device_surfaces_errno() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ttyFAKE0");

    let output = tmcctl(&["-p", path_str(&path), "-s", "9600", "-t", "72"]);

    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("Port opening error"));
}

#[test]
fn regular_file_surfaces_enotty() {
    let file = tempfile::NamedTempFile::new().unwrap();

    let output = tmcctl(&["-p", path_str(file.path()), "-s", "9600", "-t", "72"]);

    assert_eq!(output.status.code(), Some(25));
    assert!(stderr(&output).contains("tcgetattr error"));
}

#[test]
fn debug_echoes_configuration() {
    let device = FakeDevice::replying(b"ok\n", Duration::ZERO);
    let path = path_str(device.path());

    let output = tmcctl(&["-d", "-p", path, "-s", "19200", "-t", "30", "-w"]);

    assert_eq!(output.status.code(), Some(0), "{}", stderr(&output));
    let expected = format!(
        "port:  {path}\nset:   30\nspeed: 19200\nvmin:  0\nvtime: 0\ndebug: true\nflock: wait\n\
         Successfully sent: set 30\nok\n"
    );
    assert_eq!(stdout(&output), expected);
}

#[test]
fn help_and_version_exit_zero() {
    let help = tmcctl(&["--help"]);
    assert_eq!(help.status.code(), Some(0));
    assert!(stdout(&help).contains("--flock"));
    assert!(stdout(&help).contains("Examples:"));

    for flag in ["-v", "--version"] {
        let version = tmcctl(&[flag]);
        assert_eq!(version.status.code(), Some(0));
        assert!(stdout(&version).starts_with(&format!("tmcctl {}\n", env!("CARGO_PKG_VERSION"))));
    }
}
