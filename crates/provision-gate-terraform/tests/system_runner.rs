// crates/provision-gate-terraform/tests/system_runner.rs
// ============================================================================
// Module: System Command Runner Tests
// Description: Child process capture through the real runner.
// ============================================================================
//! ## Overview
//! Runs small shell commands through [`SystemCommandRunner`] to check that
//! the working directory, extra environment, exit status, and both output
//! streams reach the backend intact.

#![cfg(unix)]
#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions are permitted."
)]

use provision_gate_terraform::CommandRunner;
use provision_gate_terraform::CommandSpec;
use provision_gate_terraform::SystemCommandRunner;
use provision_gate_terraform::TerraformError;

fn shell(script: &str, cwd: &std::path::Path, env: Vec<(String, String)>) -> CommandSpec {
    CommandSpec {
        program: "sh".to_string(),
        args: vec!["-c".to_string(), script.to_string()],
        env,
        cwd: cwd.to_path_buf(),
    }
}

#[test]
fn captures_stdout_env_and_cwd() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("main.tf"), "# module\n").unwrap();
    let spec = shell(
        "printf '%s' \"$TF_WORKSPACE\"; ls",
        dir.path(),
        vec![("TF_WORKSPACE".to_string(), "pg-abc".to_string())],
    );

    let output = SystemCommandRunner.run(&spec).unwrap();

    assert!(output.success);
    assert_eq!(output.stdout, "pg-abcmain.tf\n");
    assert!(output.stderr.is_empty());
}

#[test]
fn non_zero_exit_is_captured_not_raised() {
    let dir = tempfile::tempdir().unwrap();
    let spec = shell("echo 'Error: Invalid value for input variable' >&2; exit 1", dir.path(), Vec::new());

    let output = SystemCommandRunner.run(&spec).unwrap();

    assert!(!output.success);
    assert_eq!(output.failure_text(), "Error: Invalid value for input variable");
}

#[test]
fn missing_program_is_a_spawn_error() {
    let dir = tempfile::tempdir().unwrap();
    let spec = CommandSpec {
        program: "provision-gate-no-such-binary".to_string(),
        args: vec!["version".to_string()],
        env: Vec::new(),
        cwd: dir.path().to_path_buf(),
    };

    let err = SystemCommandRunner.run(&spec).unwrap_err();
    assert!(matches!(err, TerraformError::Spawn { ref program, .. } if program == "provision-gate-no-such-binary"));
}
