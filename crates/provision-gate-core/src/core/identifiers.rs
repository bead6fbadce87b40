// crates/provision-gate-core/src/core/identifiers.rs
// ============================================================================
// Module: Provision Gate Identifiers
// Description: Unique run names and opaque backend handles.
// Purpose: Isolate concurrent runs through collision-resistant resource names.
// Dependencies: rand, serde
// ============================================================================

//! ## Overview
//! Runs never share mutable state; the only thing that keeps two parallel
//! runs from stepping on each other's cloud resources is the name they
//! provision under. Names are `prefix-suffix` where the suffix is drawn from
//! a lower-case base36 alphabet, since many cloud resource names reject
//! upper-case letters and underscores.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use rand::Rng;
use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Alphabet for generated suffixes (lower-case alphanumeric only).
const SUFFIX_ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Suffix length in characters. 36^8 is roughly 2^41.
pub const UNIQUE_ID_LEN: usize = 8;

// ============================================================================
// SECTION: Generator
// ============================================================================

/// Returns a fresh lower-case alphanumeric suffix of [`UNIQUE_ID_LEN`] characters.
///
/// Uses the thread-local RNG, so concurrent callers never contend.
#[must_use]
pub fn unique_id() -> String {
    let mut rng = rand::thread_rng();
    (0 .. UNIQUE_ID_LEN)
        .map(|_| char::from(SUFFIX_ALPHABET[rng.gen_range(0 .. SUFFIX_ALPHABET.len())]))
        .collect()
}

/// Returns `prefix-<unique_id>`.
#[must_use]
pub fn new_name(prefix: &str) -> String {
    format!("{prefix}-{}", unique_id())
}

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

/// Unique resource name generated for a single run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunName(String);

impl RunName {
    /// Creates a run name from an existing string.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Generates a fresh run name under `prefix`.
    #[must_use]
    pub fn generate(prefix: &str) -> Self {
        Self(new_name(prefix))
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Opaque reference to whatever a backend provisioned during apply.
///
/// # Invariants
/// - Only the backend that issued a handle interprets its contents.
/// - A handle is owned by exactly one run and never outlives it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BackendHandle(String);

impl BackendHandle {
    /// Creates a new backend handle.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the handle as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BackendHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for BackendHandle {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions.")]

    use super::*;

    #[test]
    fn name_keeps_prefix_and_separator() {
        let name = new_name("bucket-endpoint");
        let suffix = name.strip_prefix("bucket-endpoint-").unwrap();
        assert_eq!(suffix.len(), UNIQUE_ID_LEN);
    }

    #[test]
    fn suffix_is_lowercase_alphanumeric() {
        let id = unique_id();
        assert!(id.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit()));
    }
}
