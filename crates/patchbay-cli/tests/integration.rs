//! Integration tests for patchbay-cli.
//!
//! These invoke the binary on commands that do not need audio hardware:
//! help and version output, session files, and argument errors.

use std::process::{Command, Output};

/// Helper to get the path to the `patchbay` binary built by cargo.
fn patchbay_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_patchbay"))
}

fn run(args: &[&str]) -> Output {
    patchbay_bin()
        .args(args)
        .output()
        .expect("failed to run patchbay")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

// ---------------------------------------------------------------------------
// Help and version
// ---------------------------------------------------------------------------

#[test]
fn cli_help_lists_commands() {
    let output = run(&["--help"]);
    assert!(output.status.success());
    let text = stdout(&output);
    for command in ["devices", "channels", "rates", "control-panel", "run", "session"] {
        assert!(text.contains(command), "help should mention '{command}'");
    }
}

#[test]
fn cli_version_works() {
    let output = run(&["--version"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("patchbay"));
}

#[test]
fn cli_run_help_shows_overrides() {
    let output = run(&["run", "--help"]);
    assert!(output.status.success());
    let text = stdout(&output);
    for flag in ["--capture", "--playback", "--map", "--layout", "--no-meters", "--latency-ms"] {
        assert!(text.contains(flag), "run help should mention '{flag}'");
    }
}

// ---------------------------------------------------------------------------
// Session files
// ---------------------------------------------------------------------------

#[test]
fn cli_session_new_then_show() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("living_room.toml");
    let path_str = path.to_str().unwrap();

    let output = run(&[
        "session",
        "new",
        path_str,
        "--capture",
        "Focusrite USB",
        "--playback",
        "Speakers",
        "--layout",
        "7.1",
        "--map",
        "0=0",
        "--map",
        "1=1",
        "--latency-ms",
        "30",
    ]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(path.is_file());

    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(contents.contains("layout = \"7.1\""));
    assert!(contents.contains("target_latency_ms = 30.0"));

    let output = run(&["session", "show", path_str]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let text = stdout(&output);
    assert!(text.contains("Focusrite USB"));
    assert!(text.contains("out0 (Left) <- in0"));
    assert!(text.contains("out1 (Right) <- in1"));
    assert!(text.contains("out2 (Center) <- silence"));
    assert!(text.contains("Valid"));
}

#[test]
fn cli_session_new_refuses_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("s.toml");
    std::fs::write(&path, "existing").unwrap();
    let path_str = path.to_str().unwrap();

    let args = ["session", "new", path_str, "--capture", "In", "--playback", "Out"];
    let output = run(&args);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("already exists"));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "existing");

    let mut forced = args.to_vec();
    forced.push("--force");
    assert!(run(&forced).status.success());
}

#[test]
fn cli_session_new_rejects_same_device() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("loop.toml");
    let output = run(&[
        "session",
        "new",
        path.to_str().unwrap(),
        "--capture",
        "Interface",
        "--playback",
        "interface",
    ]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("two different devices"));
    assert!(!path.exists());
}

#[test]
fn cli_session_new_rejects_out_of_range_route() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    let output = run(&[
        "session",
        "new",
        path.to_str().unwrap(),
        "--capture",
        "In",
        "--playback",
        "Out",
        "--layout",
        "stereo",
        "--map",
        "5=0",
    ]);
    assert!(!output.status.success());
    assert!(!path.exists());
}

#[test]
fn cli_session_show_missing_fails() {
    let output = run(&["session", "show", "/nonexistent/patchbay/none.toml"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("not found"));
}

// ---------------------------------------------------------------------------
// Argument errors
// ---------------------------------------------------------------------------

#[test]
fn cli_run_rejects_malformed_route() {
    let output = run(&["run", "--capture", "In", "--playback", "Out", "--map", "left=0"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Invalid output channel"));
}

#[test]
fn cli_run_rejects_unknown_layout() {
    let output = run(&["run", "--capture", "In", "--playback", "Out", "--layout", "9.2"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("9.2"));
}

#[test]
fn cli_run_missing_session_fails() {
    let output = run(&["run", "--config", "/nonexistent/patchbay/none.toml"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("not found"));
}

#[test]
fn cli_unknown_host_fails() {
    let output = run(&["--host", "no-such-host", "devices"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("no-such-host"));
}
