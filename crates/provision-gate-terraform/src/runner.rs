// crates/provision-gate-terraform/src/runner.rs
// ============================================================================
// Module: Command Runner
// Description: Child process execution seam for the terraform CLI.
// Purpose: Let the backend run real binaries or scripted fakes.
// Dependencies: std, thiserror
// ============================================================================

//! ## Overview
//! [`CommandRunner`] executes one fully-described command and returns its
//! captured output. A non-zero exit is not an error at this layer; the
//! backend inspects the output to classify it. Only failures to launch or
//! wait on the process surface as [`TerraformError`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;
use std::process::Command;
use std::process::Stdio;

use thiserror::Error;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Runner-level failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TerraformError {
    /// The binary could not be launched.
    #[error("failed to launch {program}: {reason}")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// OS error text.
        reason: String,
    },
    /// Shared backend state was poisoned by a panicking thread.
    #[error("terraform workspace table lock poisoned")]
    Poisoned,
}

/// A command to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Program name or path.
    pub program: String,
    /// Arguments, in order.
    pub args: Vec<String>,
    /// Extra environment variables for the child.
    pub env: Vec<(String, String)>,
    /// Working directory.
    pub cwd: PathBuf,
}

impl CommandSpec {
    /// Returns the first argument (the subcommand).
    #[must_use]
    pub fn subcommand(&self) -> Option<&str> {
        self.args.first().map(String::as_str)
    }

    /// Returns the value of an environment variable passed to the child.
    #[must_use]
    pub fn env_value(&self, name: &str) -> Option<&str> {
        self.env.iter().find(|(key, _)| key == name).map(|(_, value)| value.as_str())
    }
}

/// Captured result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// True when the process exited with status zero.
    pub success: bool,
    /// Captured stdout.
    pub stdout: String,
    /// Captured stderr.
    pub stderr: String,
}

impl CommandOutput {
    /// Successful output with the given stdout.
    #[must_use]
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Failed output with the given stderr.
    #[must_use]
    pub fn failed(stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Error text for a failed run: stderr, or stdout when stderr is empty.
    #[must_use]
    pub fn failure_text(&self) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() { self.stdout.trim().to_string() } else { stderr.to_string() }
    }
}

// ============================================================================
// SECTION: Runner
// ============================================================================

/// Executes commands on behalf of the backend.
pub trait CommandRunner: Send + Sync {
    /// Runs `spec` to completion and captures its output.
    ///
    /// # Errors
    ///
    /// Returns [`TerraformError::Spawn`] when the process cannot be started.
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, TerraformError>;
}

/// Runner backed by [`std::process::Command`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, TerraformError> {
        let output = Command::new(&spec.program)
            .args(&spec.args)
            .envs(spec.env.iter().map(|(key, value)| (key.as_str(), value.as_str())))
            .current_dir(&spec.cwd)
            .stdin(Stdio::null())
            .output()
            .map_err(|err| TerraformError::Spawn {
                program: spec.program.clone(),
                reason: err.to_string(),
            })?;
        Ok(CommandOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
