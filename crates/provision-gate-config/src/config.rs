// crates/provision-gate-config/src/config.rs
// ============================================================================
// Module: Provision Gate Configuration
// Description: Harness configuration loading and validation.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: provision-gate-core, regex, serde, toml, url
// ============================================================================

//! ## Overview
//! The harness reads one TOML file describing the cloud endpoint, the apply
//! retry policy, run-level region and deadline settings, and where the
//! provisioning tool lives. Loading enforces path, size, and encoding limits
//! before parsing, and [`HarnessConfig::validate`] rejects inconsistent
//! values. Unknown keys are errors so typos never silently fall back to a
//! default.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use provision_gate_core::ControllerConfig;
use provision_gate_core::RegionChoice;
use provision_gate_core::RetryPolicy;
use provision_gate_core::runtime::retry::DEFAULT_INITIAL_BACKOFF;
use provision_gate_core::runtime::retry::DEFAULT_MAX_ATTEMPTS;
use provision_gate_core::runtime::retry::DEFAULT_MAX_BACKOFF;
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::env::HarnessEnv;
use crate::env::lookup_nonempty;
use crate::env::parse_bool;
use crate::env::read_env_strict;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "provision-gate.toml";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Upper bound on apply attempts.
pub(crate) const MAX_APPLY_ATTEMPTS: u32 = 20;
/// Default provisioning tool binary.
const DEFAULT_TERRAFORM_BINARY: &str = "terraform";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
    /// Invalid environment override.
    #[error("invalid environment: {0}")]
    Env(String),
}

// ============================================================================
// SECTION: Harness Config
// ============================================================================

/// Top-level harness configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HarnessConfig {
    /// Cloud API endpoint and credentials.
    #[serde(default)]
    pub endpoint: EndpointConfig,
    /// Apply retry policy.
    #[serde(default)]
    pub retry: RetryConfig,
    /// Region and deadline settings.
    #[serde(default)]
    pub run: RunConfig,
    /// Provisioning tool settings.
    #[serde(default)]
    pub terraform: TerraformConfig,
}

impl HarnessConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// Resolution order: explicit path, then `PROVISION_GATE_CONFIG`, then
    /// `provision-gate.toml` in the working directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml_str(content)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Applies process environment overrides to the endpoint section.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when an override is malformed or the merged
    /// endpoint fails validation.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_lookup(read_env_strict)
    }

    /// Applies overrides from an arbitrary lookup, then revalidates.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when an override is malformed or the merged
    /// endpoint fails validation.
    pub fn with_lookup<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Result<Option<String>, ConfigError>,
    {
        self.endpoint = self.endpoint.with_lookup(lookup)?;
        self.validate()?;
        Ok(self)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.endpoint.validate()?;
        self.retry.validate()?;
        self.run.validate()?;
        self.terraform.validate()?;
        Ok(())
    }

    /// Builds the controller settings from the retry and run sections.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the retry policy cannot be built.
    pub fn controller_config(&self) -> Result<ControllerConfig, ConfigError> {
        Ok(ControllerConfig {
            retry: self.retry.policy()?,
            deadline: self.run.deadline(),
        })
    }
}

// ============================================================================
// SECTION: Endpoint
// ============================================================================

/// Cloud API endpoint override and static credentials.
///
/// # Invariants
/// - `access_key_id` and `secret_access_key` are both set or both unset.
/// - `url`, when set, parses with an `http` or `https` scheme.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EndpointConfig {
    /// Endpoint URL (for example a local mock).
    #[serde(default)]
    pub url: Option<String>,
    /// Static access key id.
    #[serde(default)]
    pub access_key_id: Option<String>,
    /// Static secret access key.
    #[serde(default)]
    pub secret_access_key: Option<String>,
    /// Use path-style bucket addressing.
    #[serde(default)]
    pub force_path_style: bool,
}

impl fmt::Debug for EndpointConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointConfig")
            .field("url", &self.url)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &self.secret_access_key.as_ref().map(|_| "<redacted>"))
            .field("force_path_style", &self.force_path_style)
            .finish()
    }
}

impl EndpointConfig {
    /// Reads endpoint settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a value is not UTF-8, empty, or malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(read_env_strict)
    }

    /// Reads endpoint settings from `lookup` alone.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a value is empty or malformed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Result<Option<String>, ConfigError>,
    {
        let endpoint = Self::default().with_lookup(lookup)?;
        endpoint.validate()?;
        Ok(endpoint)
    }

    /// Overrides each field that `lookup` provides.
    fn with_lookup<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Result<Option<String>, ConfigError>,
    {
        if let Some(url) = lookup_nonempty(&lookup, HarnessEnv::Endpoint.as_str())? {
            self.url = Some(url);
        }
        if let Some(key) = lookup_nonempty(&lookup, HarnessEnv::AccessKeyId.as_str())? {
            self.access_key_id = Some(key);
        }
        if let Some(secret) = lookup_nonempty(&lookup, HarnessEnv::SecretAccessKey.as_str())? {
            self.secret_access_key = Some(secret);
        }
        if let Some(raw) = lookup_nonempty(&lookup, HarnessEnv::PathStyle.as_str())? {
            self.force_path_style = parse_bool(HarnessEnv::PathStyle.as_str(), &raw)?;
        }
        Ok(self)
    }

    /// Returns true when a custom endpoint is configured.
    #[must_use]
    pub const fn is_custom(&self) -> bool {
        self.url.is_some()
    }

    /// Returns the static credential pair when configured.
    #[must_use]
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.access_key_id, &self.secret_access_key) {
            (Some(key), Some(secret)) => Some((key.as_str(), secret.as_str())),
            _ => None,
        }
    }

    /// Validates endpoint configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when endpoint settings are invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(raw) = &self.url {
            let parsed = Url::parse(raw.trim()).map_err(|err| {
                ConfigError::Invalid(format!("endpoint.url is not a valid url: {err}"))
            })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(ConfigError::Invalid(
                    "endpoint.url must include http:// or https://".to_string(),
                ));
            }
            if parsed.host_str().is_none() {
                return Err(ConfigError::Invalid("endpoint.url must include a host".to_string()));
            }
        }
        if self.access_key_id.is_some() != self.secret_access_key.is_some() {
            return Err(ConfigError::Invalid(
                "endpoint.access_key_id and endpoint.secret_access_key must be set together"
                    .to_string(),
            ));
        }
        for (field, value) in [
            ("endpoint.access_key_id", &self.access_key_id),
            ("endpoint.secret_access_key", &self.secret_access_key),
        ] {
            if value.as_deref().is_some_and(|value| value.trim().is_empty()) {
                return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
            }
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Retry
// ============================================================================

/// Apply retry settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    /// Total apply attempts, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before the first retry in milliseconds.
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    /// Cap on any single delay in milliseconds.
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    /// Extra retryable patterns (regex to description), merged over defaults.
    #[serde(default)]
    pub retryable_errors: BTreeMap<String, String>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            retryable_errors: BTreeMap::new(),
        }
    }
}

impl RetryConfig {
    /// Validates retry configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when retry settings are invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid("retry.max_attempts must be at least 1".to_string()));
        }
        if self.max_attempts > MAX_APPLY_ATTEMPTS {
            return Err(ConfigError::Invalid(format!(
                "retry.max_attempts must be at most {MAX_APPLY_ATTEMPTS}"
            )));
        }
        if self.initial_backoff_ms > self.max_backoff_ms {
            return Err(ConfigError::Invalid(
                "retry.initial_backoff_ms must not exceed retry.max_backoff_ms".to_string(),
            ));
        }
        for (pattern, description) in &self.retryable_errors {
            Regex::new(pattern).map_err(|err| {
                ConfigError::Invalid(format!("retry.retryable_errors pattern {pattern}: {err}"))
            })?;
            if description.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "retry.retryable_errors pattern {pattern} needs a description"
                )));
            }
        }
        Ok(())
    }

    /// Builds the retry policy: defaults first, then configured patterns.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the bounds or a pattern are invalid.
    pub fn policy(&self) -> Result<RetryPolicy, ConfigError> {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.initial_backoff_ms),
            Duration::from_millis(self.max_backoff_ms),
        )
        .and_then(|policy| {
            policy.with_default_retryable_errors().with_retryable_errors(
                self.retryable_errors
                    .iter()
                    .map(|(pattern, description)| (pattern.as_str(), description.as_str())),
            )
        })
        .map_err(|err| ConfigError::Invalid(err.to_string()))
    }
}

/// Default apply attempts.
const fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

/// Default initial backoff in milliseconds.
fn default_initial_backoff_ms() -> u64 {
    u64::try_from(DEFAULT_INITIAL_BACKOFF.as_millis()).unwrap_or(u64::MAX)
}

/// Default max backoff in milliseconds.
fn default_max_backoff_ms() -> u64 {
    u64::try_from(DEFAULT_MAX_BACKOFF.as_millis()).unwrap_or(u64::MAX)
}

// ============================================================================
// SECTION: Run
// ============================================================================

/// Region and deadline settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Wall-clock budget for apply and inspection, in seconds.
    #[serde(default)]
    pub deadline_secs: Option<u64>,
    /// Approved regions, intersected with the catalogue; empty approves all of it.
    #[serde(default)]
    pub regions: Vec<String>,
    /// Regions never selected.
    #[serde(default)]
    pub forbidden_regions: Vec<String>,
    /// Pinned region; overrides random selection.
    #[serde(default)]
    pub region: Option<String>,
}

impl RunConfig {
    /// Validates run configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when run settings are invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.deadline_secs == Some(0) {
            return Err(ConfigError::Invalid("run.deadline_secs must be greater than zero".to_string()));
        }
        for region in self.regions.iter().chain(&self.forbidden_regions).chain(&self.region) {
            if region.trim().is_empty() {
                return Err(ConfigError::Invalid("run regions must be non-empty".to_string()));
            }
        }
        if let Some(pinned) = &self.region
            && self.forbidden_regions.contains(pinned)
        {
            return Err(ConfigError::Invalid(format!("run.region {pinned} is forbidden")));
        }
        Ok(())
    }

    /// Deadline as a duration.
    #[must_use]
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_secs.map(Duration::from_secs)
    }

    /// Resolves the region choice against a catalogue of stable regions.
    ///
    /// A pinned region wins. Otherwise the catalogue, narrowed to the
    /// approved list when one is configured and minus forbidden regions, is
    /// sampled per run. Approved regions outside the catalogue are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when no region remains.
    pub fn region_choice(&self, catalogue: &[&str]) -> Result<RegionChoice, ConfigError> {
        if let Some(pinned) = &self.region {
            return Ok(RegionChoice::Pinned(pinned.clone()));
        }
        let remaining = stable_candidates(catalogue, &self.regions, &self.forbidden_regions);
        if remaining.is_empty() {
            return Err(ConfigError::Invalid(
                "no stable region remains after applying approved and forbidden regions".to_string(),
            ));
        }
        Ok(RegionChoice::Random(remaining))
    }
}

/// Catalogue regions that are approved (all of them when `approved` is
/// empty) and not forbidden, in catalogue order.
#[must_use]
pub fn stable_candidates<A, F>(catalogue: &[&str], approved: &[A], forbidden: &[F]) -> Vec<String>
where
    A: AsRef<str>,
    F: AsRef<str>,
{
    catalogue
        .iter()
        .copied()
        .filter(|region| approved.is_empty() || approved.iter().any(|entry| entry.as_ref() == *region))
        .filter(|region| !forbidden.iter().any(|entry| entry.as_ref() == *region))
        .map(str::to_string)
        .collect()
}

// ============================================================================
// SECTION: Terraform
// ============================================================================

/// Provisioning tool settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TerraformConfig {
    /// Binary name or path.
    #[serde(default = "default_terraform_binary")]
    pub binary: String,
    /// Directory containing the module under test.
    #[serde(default = "default_working_dir")]
    pub working_dir: PathBuf,
}

impl Default for TerraformConfig {
    fn default() -> Self {
        Self {
            binary: default_terraform_binary(),
            working_dir: default_working_dir(),
        }
    }
}

impl TerraformConfig {
    /// Validates provisioning tool configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the binary or working directory is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_path_string("terraform.binary", &self.binary)?;
        validate_path_string("terraform.working_dir", &self.working_dir.to_string_lossy())
    }
}

/// Default provisioning binary.
fn default_terraform_binary() -> String {
    DEFAULT_TERRAFORM_BINARY.to_string()
}

/// Default working directory.
fn default_working_dir() -> PathBuf {
    PathBuf::from(".")
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from an explicit path or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Some(env_path) = read_env_strict(HarnessEnv::ConfigPath.as_str())? {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::use_debug, reason = "Test-only assertions.")]

    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = HarnessConfig::from_toml_str("").unwrap();
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.initial_backoff_ms, 5_000);
        assert_eq!(config.retry.max_backoff_ms, 60_000);
        assert_eq!(config.terraform.binary, "terraform");
        assert!(config.run.deadline().is_none());
    }

    #[test]
    fn validate_path_string_rejects_empty_string() {
        assert!(validate_path_string("terraform.working_dir", " ").is_err());
    }

    #[test]
    fn endpoint_debug_redacts_secret() {
        let endpoint = EndpointConfig {
            secret_access_key: Some("hunter2".to_string()),
            access_key_id: Some("AKIA".to_string()),
            ..EndpointConfig::default()
        };
        let rendered = format!("{endpoint:?}");
        assert!(!rendered.contains("hunter2"));
    }
}
