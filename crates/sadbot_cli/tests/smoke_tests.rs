//! CLI smoke tests: verify basic binary behavior.

use std::io::Write;
use std::process::{Command, Stdio};

fn cli_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_sadbot"))
}

#[test]
fn test_help_flag() {
    let output = cli_bin().arg("--help").output().expect("failed to run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage"), "Expected usage info in --help output");
    assert!(stdout.contains("--policy"));
}

#[test]
fn test_version_flag() {
    let output = cli_bin().arg("--version").output().expect("failed to run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("sadbot"),
        "Expected binary name in --version output"
    );
}

#[test]
fn test_invalid_policy_is_rejected() {
    let output = cli_bin()
        .args(["--policy", "sideways"])
        .output()
        .expect("failed to run");
    assert!(!output.status.success());
}

#[test]
fn test_scripted_session_with_missing_config() {
    // A missing config file falls back to defaults.
    let mut child = cli_bin()
        .args([
            "--config",
            "/tmp/nonexistent_sadbot_config_12345.toml",
            "--provider",
            "mock",
            "--load-latency-ms",
            "0",
        ])
        .env_remove("SADBOT_AFFECT_POLICY")
        .env_remove("SENTIMENT_PROVIDER")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to run");

    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"Hello there.\n/state\n/quit\n")
        .unwrap();

    let output = child.wait_with_output().expect("failed to wait");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("expression 0"), "stdout: {}", stdout);
    assert!(stdout.contains("\"affect\""), "stdout: {}", stdout);
    assert!(stdout.contains("\"stage\""), "stdout: {}", stdout);
}

#[test]
fn test_invalid_config_file_is_fatal() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[affect.smoothed]\ndecay_rate = -0.02").unwrap();

    let output = cli_bin()
        .args(["--provider", "mock", "--config"])
        .arg(file.path())
        .stdin(Stdio::null())
        .output()
        .expect("failed to run");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("decay_rate"), "stderr: {}", stderr);
}
