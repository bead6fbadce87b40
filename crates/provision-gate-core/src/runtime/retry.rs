// crates/provision-gate-core/src/runtime/retry.rs
// ============================================================================
// Module: Provision Gate Retry Policy
// Description: Retryable/fatal classification and bounded exponential backoff.
// Purpose: Absorb transient provisioning failures without hiding real ones.
// Dependencies: crate::interfaces, regex, thiserror
// ============================================================================

//! ## Overview
//! Apply failures are classified by variant first: transient errors always
//! retry, configuration and permission errors never do. Unclassified
//! backend errors retry only when their message matches a registered
//! pattern. The default table covers failures provisioning tools commonly
//! hit on a cold CI runner (provider download hiccups, plugin handshake
//! timeouts, throttling); callers merge their own patterns on top.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::time::Duration;

use regex::Regex;
use thiserror::Error;

use crate::interfaces::BackendError;

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Default number of apply attempts.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// Default delay before the first retry.
pub const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_secs(5);
/// Default cap on a single backoff delay.
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Default retryable error patterns and their descriptions.
pub const DEFAULT_RETRYABLE_ERRORS: &[(&str, &str)] = &[
    (".*read: connection reset by peer.*", "Connection reset while reaching a remote service."),
    (".*transport is closing.*", "Remote API transport closed mid-request."),
    (".*unable to verify signature.*", "Plugin download failed signature check on a transient error."),
    (".*unable to verify checksum.*", "Plugin download failed checksum on a transient error."),
    (".*no provider exists with the given name.*", "Provider registry returned a transient lookup failure."),
    (".*registry service is unreachable.*", "Provider registry unreachable."),
    (".*Error installing provider.*", "Provider installation failed on a transient error."),
    (".*Failed to query available provider packages.*", "Provider package query failed."),
    (".*timeout while waiting for plugin to start.*", "Provider plugin start timed out."),
    (".*timed out waiting for server handshake.*", "Provider plugin handshake timed out."),
    ("could not query provider registry for", "Provider registry query failed."),
    (".*Could not retrieve the list of available versions.*", "Provider version listing failed."),
    (".*Failed to load state.*", "Remote state read failed."),
    (".*TLS handshake timeout.*", "TLS handshake timed out."),
    (".*Client.Timeout exceeded while awaiting headers.*", "HTTP client timed out awaiting headers."),
    (".*RequestLimitExceeded.*", "Cloud API rate limit hit."),
    (".*Throttling.*", "Cloud API throttled the request."),
    (".*OperationAborted.*conflicting conditional operation.*", "Bucket create/delete race in the cloud API."),
];

// ============================================================================
// SECTION: Types
// ============================================================================

/// Classification of an apply error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorClass {
    /// Retry after backoff.
    Retryable {
        /// Why the error is considered transient.
        reason: String,
    },
    /// Abort immediately.
    Fatal,
}

impl ErrorClass {
    /// Returns true for [`ErrorClass::Retryable`].
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Retryable { .. })
    }
}

/// Retry policy construction errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RetryPolicyError {
    /// `max_attempts` was zero.
    #[error("max_attempts must be at least 1")]
    ZeroAttempts,
    /// Initial backoff exceeds the cap.
    #[error("initial backoff {initial_ms}ms exceeds max backoff {max_ms}ms")]
    BackoffInverted {
        /// Initial delay in milliseconds.
        initial_ms: u128,
        /// Cap in milliseconds.
        max_ms: u128,
    },
    /// Pattern failed to compile.
    #[error("invalid retryable error pattern {pattern}: {reason}")]
    InvalidPattern {
        /// Offending pattern.
        pattern: String,
        /// Compiler message.
        reason: String,
    },
}

/// Compiled retryable pattern.
#[derive(Debug, Clone)]
struct RetryablePattern {
    /// Compiled expression.
    regex: Regex,
    /// Description reported when the pattern matches.
    description: String,
}

/// Bounded exponential backoff over a caller-extensible classification table.
///
/// # Invariants
/// - `max_attempts >= 1`.
/// - `initial_backoff <= max_backoff`.
/// - Variant-based classification always wins over message patterns.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total apply attempts allowed, including the first.
    max_attempts: u32,
    /// Delay before the first retry.
    initial_backoff: Duration,
    /// Upper bound on any single delay.
    max_backoff: Duration,
    /// Source patterns keyed for deterministic merge.
    sources: BTreeMap<String, String>,
    /// Compiled patterns in `sources` order.
    patterns: Vec<RetryablePattern>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_backoff: DEFAULT_INITIAL_BACKOFF,
            max_backoff: DEFAULT_MAX_BACKOFF,
            sources: BTreeMap::new(),
            patterns: Vec::new(),
        }
        .with_default_retryable_errors()
    }
}

impl RetryPolicy {
    /// Builds a policy with no message patterns.
    ///
    /// # Errors
    ///
    /// Returns [`RetryPolicyError`] when the bounds are inconsistent.
    pub fn new(
        max_attempts: u32,
        initial_backoff: Duration,
        max_backoff: Duration,
    ) -> Result<Self, RetryPolicyError> {
        if max_attempts == 0 {
            return Err(RetryPolicyError::ZeroAttempts);
        }
        if initial_backoff > max_backoff {
            return Err(RetryPolicyError::BackoffInverted {
                initial_ms: initial_backoff.as_millis(),
                max_ms: max_backoff.as_millis(),
            });
        }
        Ok(Self {
            max_attempts,
            initial_backoff,
            max_backoff,
            sources: BTreeMap::new(),
            patterns: Vec::new(),
        })
    }

    /// Policy that never retries.
    #[must_use]
    pub const fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            sources: BTreeMap::new(),
            patterns: Vec::new(),
        }
    }

    /// Merges the default retryable patterns under any already registered.
    #[must_use]
    pub fn with_default_retryable_errors(mut self) -> Self {
        for (pattern, description) in DEFAULT_RETRYABLE_ERRORS {
            if !self.sources.contains_key(*pattern) {
                self.sources.insert((*pattern).to_string(), (*description).to_string());
            }
        }
        self.recompile_lossy();
        self
    }

    /// Registers (or overrides) one retryable pattern.
    ///
    /// # Errors
    ///
    /// Returns [`RetryPolicyError::InvalidPattern`] when the pattern does not compile.
    pub fn with_retryable_error(
        mut self,
        pattern: &str,
        description: &str,
    ) -> Result<Self, RetryPolicyError> {
        Regex::new(pattern).map_err(|err| RetryPolicyError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: err.to_string(),
        })?;
        self.sources.insert(pattern.to_string(), description.to_string());
        self.recompile_lossy();
        Ok(self)
    }

    /// Registers several patterns; caller entries override defaults.
    ///
    /// # Errors
    ///
    /// Returns [`RetryPolicyError::InvalidPattern`] on the first bad pattern.
    pub fn with_retryable_errors<'a>(
        self,
        patterns: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self, RetryPolicyError> {
        patterns
            .into_iter()
            .try_fold(self, |policy, (pattern, description)| {
                policy.with_retryable_error(pattern, description)
            })
    }

    /// Rebuilds compiled patterns from sources. Sources are validated on insert.
    fn recompile_lossy(&mut self) {
        self.patterns = self
            .sources
            .iter()
            .filter_map(|(pattern, description)| {
                Regex::new(pattern).ok().map(|regex| RetryablePattern {
                    regex,
                    description: description.clone(),
                })
            })
            .collect();
    }

    /// Total attempts allowed.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Registered patterns and their descriptions, in name order.
    pub fn retryable_errors(&self) -> impl Iterator<Item = (&str, &str)> {
        self.sources.iter().map(|(pattern, description)| (pattern.as_str(), description.as_str()))
    }

    /// Classifies an apply error.
    #[must_use]
    pub fn classify(&self, error: &BackendError) -> ErrorClass {
        match error {
            BackendError::Transient(message) => ErrorClass::Retryable {
                reason: message.clone(),
            },
            BackendError::Configuration(_)
            | BackendError::PermissionDenied(_)
            | BackendError::NotFound {
                ..
            } => ErrorClass::Fatal,
            BackendError::Backend(message) => self
                .patterns
                .iter()
                .find(|pattern| pattern.regex.is_match(message))
                .map_or(ErrorClass::Fatal, |pattern| ErrorClass::Retryable {
                    reason: pattern.description.clone(),
                }),
        }
    }

    /// Delay before retry number `retry` (zero-based), doubling and capped.
    #[must_use]
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 2_u32.saturating_pow(retry);
        self.initial_backoff.saturating_mul(factor).min(self.max_backoff)
    }
}

// ============================================================================
// SECTION: Sleeper
// ============================================================================

/// Blocking delay between retries.
pub trait Sleeper {
    /// Blocks the current run for `duration`.
    fn sleep(&self, duration: Duration);
}

/// Sleeper backed by [`std::thread::sleep`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
