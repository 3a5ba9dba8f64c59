//! Integration tests for the TideMUD server binary.
//! These exercise the command-line surface: everything here must fail
//! fast, without binding a port or entering the game loop.

use std::process::Command;

#[test]
fn non_numeric_port_is_rejected() {
    let output = Command::new(env!("CARGO_BIN_EXE_tidemud"))
        .arg("sideways")
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("illegal port number"));
}

#[test]
fn privileged_ports_are_rejected() {
    let output = Command::new(env!("CARGO_BIN_EXE_tidemud"))
        .arg("99")
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("illegal port number"));
}

#[test]
fn copyover_flag_requires_both_arguments() {
    let output = Command::new(env!("CARGO_BIN_EXE_tidemud"))
        .args(["-copyover", "7"])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("-copyover"));
}

#[test]
fn copyover_restart_without_handoff_file_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let output = Command::new(env!("CARGO_BIN_EXE_tidemud"))
        .current_dir(dir.path())
        .args(["-copyover", "900", "4800"])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
}

#[test]
fn trailing_arguments_print_usage() {
    let output = Command::new(env!("CARGO_BIN_EXE_tidemud"))
        .args(["4800", "extra"])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Usage"));
}
