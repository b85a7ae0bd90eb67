//! Integration tests that lock the demo binary's startup paths.

use std::process::{Command, Stdio};

#[test]
fn main_fails_when_stdout_is_not_a_terminal() {
    let bin = env!("CARGO_BIN_EXE_pinbar");
    let output = Command::new(bin)
        .args(["--steps", "2", "--delay-ms", "0"])
        .stdin(Stdio::null())
        .output()
        .expect("run pinbar");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("terminal unavailable"), "stderr: {stderr}");
    assert!(output.stdout.is_empty());
}

#[test]
fn main_plain_fallback_prints_progress_lines() {
    let bin = env!("CARGO_BIN_EXE_pinbar");
    let output = Command::new(bin)
        .args(["--plain-fallback", "--steps", "3", "--delay-ms", "0"])
        .stdin(Stdio::null())
        .output()
        .expect("run pinbar");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(
        lines,
        ["Progress 0%", "Progress 33%", "Progress 66%", "Progress 100%"]
    );
    assert!(!stdout.contains('\x1b'));
}

#[test]
fn main_plain_fallback_reads_a_line_when_blocked() {
    let bin = env!("CARGO_BIN_EXE_pinbar");
    let output = Command::new(bin)
        .args(["--plain-fallback", "--steps", "2", "--delay-ms", "0", "--block-at", "1"])
        .stdin(Stdio::null())
        .output()
        .expect("run pinbar");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Progress 50%"));
    assert!(stdout.contains("User input: "));
}

#[test]
fn main_rejects_unknown_flags() {
    let bin = env!("CARGO_BIN_EXE_pinbar");
    let output = Command::new(bin)
        .arg("--definitely-not-a-flag")
        .output()
        .expect("run pinbar");
    assert!(!output.status.success());
}
