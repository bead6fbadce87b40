// system-tests/src/config/env.rs
// ============================================================================
// Module: System Test Environment
// Description: Environment-backed configuration for system tests.
// Purpose: Centralize env parsing with strict UTF-8 validation.
// Dependencies: provision-gate-config
// ============================================================================

//! ## Overview
//! Environment values are parsed with strict UTF-8 enforcement to avoid silent
//! misconfiguration. Invalid UTF-8 and empty values fail closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;
use std::time::Duration;

use provision_gate_config::read_env_strict;

// ============================================================================
// SECTION: Environment Constants
// ============================================================================

/// Default terraform binary when no override is set.
const DEFAULT_TERRAFORM: &str = "terraform";

/// Environment keys for system test configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemTestEnv {
    /// Use an already running mock S3 endpoint instead of a container.
    MockEndpoint,
    /// Terraform binary name or path.
    TerraformBinary,
    /// Run deadline override in seconds (positive integer).
    TimeoutSeconds,
    /// Write the run audit log to this path.
    AuditLog,
}

impl SystemTestEnv {
    /// Returns the canonical environment variable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MockEndpoint => "PROVISION_GATE_SYSTEM_TEST_ENDPOINT",
            Self::TerraformBinary => "PROVISION_GATE_SYSTEM_TEST_TERRAFORM",
            Self::TimeoutSeconds => "PROVISION_GATE_SYSTEM_TEST_TIMEOUT_SEC",
            Self::AuditLog => "PROVISION_GATE_SYSTEM_TEST_AUDIT_LOG",
        }
    }
}

// ============================================================================
// SECTION: Config Types
// ============================================================================

/// Typed system test configuration derived from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemTestConfig {
    /// Existing mock endpoint; a container is started when unset.
    pub mock_endpoint: Option<String>,
    /// Terraform binary name or path.
    pub terraform_binary: String,
    /// Optional run deadline.
    pub timeout: Option<Duration>,
    /// Optional audit log path.
    pub audit_log: Option<PathBuf>,
}

impl Default for SystemTestConfig {
    fn default() -> Self {
        Self {
            mock_endpoint: None,
            terraform_binary: DEFAULT_TERRAFORM.to_string(),
            timeout: None,
            audit_log: None,
        }
    }
}

impl SystemTestConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error when an environment value is not valid UTF-8, is empty,
    /// or fails validation (for example, an invalid timeout).
    pub fn load() -> Result<Self, String> {
        let mock_endpoint = read_env_nonempty(SystemTestEnv::MockEndpoint.as_str())?;
        let terraform_binary = read_env_nonempty(SystemTestEnv::TerraformBinary.as_str())?
            .unwrap_or_else(|| DEFAULT_TERRAFORM.to_string());
        let timeout = read_env_nonempty(SystemTestEnv::TimeoutSeconds.as_str())?
            .map(|value| parse_timeout_seconds(SystemTestEnv::TimeoutSeconds.as_str(), &value))
            .transpose()?;
        let audit_log = read_env_nonempty(SystemTestEnv::AuditLog.as_str())?.map(PathBuf::from);
        Ok(Self {
            mock_endpoint,
            terraform_binary,
            timeout,
            audit_log,
        })
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads an environment variable and rejects empty values.
///
/// # Errors
///
/// Returns an error when the variable is not UTF-8 or is set but blank.
fn read_env_nonempty(name: &str) -> Result<Option<String>, String> {
    match read_env_strict(name).map_err(|err| err.to_string())? {
        Some(value) if value.trim().is_empty() => Err(format!("{name} must not be empty")),
        Some(value) => Ok(Some(value)),
        None => Ok(None),
    }
}

/// Parses a positive timeout value from an environment variable string.
///
/// # Errors
///
/// Returns an error when the value is non-numeric or zero.
fn parse_timeout_seconds(name: &str, raw: &str) -> Result<Duration, String> {
    let secs: u64 = raw
        .trim()
        .parse()
        .map_err(|_| format!("{name} must be a positive integer number of seconds"))?;
    if secs == 0 {
        return Err(format!("{name} must be greater than zero"));
    }
    Ok(Duration::from_secs(secs))
}
