// crates/provision-gate-config/src/env.rs
// ============================================================================
// Module: Harness Environment
// Description: Environment-backed endpoint and credential overrides.
// Purpose: Parse override variables with strict UTF-8 and literal checks.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Runs pointed at a mock endpoint pick up the endpoint URL, static
//! credentials, and path-style addressing from the environment. Values are
//! read strictly: invalid UTF-8 and empty strings fail closed rather than
//! falling back to the real cloud.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::config::ConfigError;

// ============================================================================
// SECTION: Environment Keys
// ============================================================================

/// Environment keys read by the harness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarnessEnv {
    /// Custom cloud API endpoint URL.
    Endpoint,
    /// Static access key id.
    AccessKeyId,
    /// Static secret access key.
    SecretAccessKey,
    /// Path-style bucket addressing (`true`/`false` or `1`/`0`).
    PathStyle,
    /// Config file path override.
    ConfigPath,
}

impl HarnessEnv {
    /// Returns the canonical environment variable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Endpoint => "PROVISION_GATE_CUSTOM_AWS_ENDPOINT",
            Self::AccessKeyId => "AWS_ACCESS_KEY_ID",
            Self::SecretAccessKey => "AWS_SECRET_ACCESS_KEY",
            Self::PathStyle => "PROVISION_GATE_S3_USE_PATH_STYLE_ENDPOINT",
            Self::ConfigPath => "PROVISION_GATE_CONFIG",
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads an environment variable and enforces UTF-8 validity.
///
/// # Errors
///
/// Returns [`ConfigError::Env`] when the variable contains invalid UTF-8.
pub fn read_env_strict(name: &str) -> Result<Option<String>, ConfigError> {
    std::env::var_os(name).map_or(Ok(None), |raw| {
        raw.into_string().map(Some).map_err(|_| ConfigError::Env(format!("{name} must be valid UTF-8")))
    })
}

/// Runs `lookup` and rejects set-but-empty values.
pub(crate) fn lookup_nonempty<F>(lookup: &F, name: &str) -> Result<Option<String>, ConfigError>
where
    F: Fn(&str) -> Result<Option<String>, ConfigError>,
{
    match lookup(name)? {
        Some(value) if value.trim().is_empty() => {
            Err(ConfigError::Env(format!("{name} must not be empty")))
        }
        Some(value) => Ok(Some(value.trim().to_string())),
        None => Ok(None),
    }
}

/// Parses a boolean literal.
pub(crate) fn parse_bool(name: &str, raw: &str) -> Result<bool, ConfigError> {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("true") || trimmed == "1" {
        return Ok(true);
    }
    if trimmed.eq_ignore_ascii_case("false") || trimmed == "0" {
        return Ok(false);
    }
    Err(ConfigError::Env(format!("{name} must be 1, 0, true, or false")))
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_literals_are_case_insensitive() {
        assert_eq!(parse_bool("X", "TRUE"), Ok(true));
        assert_eq!(parse_bool("X", " 0 "), Ok(false));
        assert!(parse_bool("X", "yes").is_err());
    }

    #[test]
    fn empty_lookup_value_is_rejected() {
        let lookup = |_: &str| Ok(Some("   ".to_string()));
        assert!(lookup_nonempty(&lookup, "X").is_err());
    }
}
