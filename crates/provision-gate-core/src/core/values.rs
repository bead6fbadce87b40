// crates/provision-gate-core/src/core/values.rs
// ============================================================================
// Module: Provision Gate Configuration Values
// Description: Typed parameter values and the immutable configuration map.
// Purpose: Carry caller parameters to a backend without an open dynamic type.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Backends receive a [`Configuration`]: an ordered map from parameter name
//! to [`ConfigValue`]. The harness never inspects the values; the schema is
//! owned by whatever module the backend provisions.
//!
//! [`ConfigValue`] is a closed set of semantic kinds. It is marked
//! `#[non_exhaustive]` so new kinds can be added without breaking
//! downstream matches.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Number;
use thiserror::Error;

// ============================================================================
// SECTION: Values
// ============================================================================

/// A single configuration parameter value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
#[non_exhaustive]
pub enum ConfigValue {
    /// Boolean flag.
    Bool(bool),
    /// Integer or finite float.
    Number(Number),
    /// Free-form string.
    String(String),
}

impl ConfigValue {
    /// Builds a numeric value from a float; returns `None` for NaN or infinities.
    #[must_use]
    pub fn float(value: f64) -> Option<Self> {
        Number::from_f64(value).map(Self::Number)
    }

    /// Renders the value the way a command-line `-var` literal expects it.
    #[must_use]
    pub fn to_literal(&self) -> String {
        match self {
            Self::Bool(value) => value.to_string(),
            Self::Number(value) => value.to_string(),
            Self::String(value) => value.clone(),
        }
    }

    /// Returns the semantic kind label.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::String(_) => "string",
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_literal())
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for ConfigValue {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}

impl From<u64> for ConfigValue {
    fn from(value: u64) -> Self {
        Self::Number(value.into())
    }
}

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Errors raised while assembling a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// Parameter name was empty.
    #[error("configuration parameter name must not be empty")]
    EmptyName,
    /// The same parameter was supplied twice.
    #[error("configuration parameter {0} supplied more than once")]
    Duplicate(String),
}

/// Immutable parameter map passed opaquely to a backend.
///
/// # Invariants
/// - Parameter names are unique and non-empty.
/// - Iteration order is lexicographic by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Configuration {
    /// Parameters keyed by name.
    params: BTreeMap<String, ConfigValue>,
}

impl Configuration {
    /// Starts an empty builder.
    #[must_use]
    pub fn builder() -> ConfigurationBuilder {
        ConfigurationBuilder::default()
    }

    /// Returns a parameter value by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ConfigValue> {
        self.params.get(name)
    }

    /// Iterates parameters in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ConfigValue)> {
        self.params.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Returns true when no parameters are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

/// Builder for [`Configuration`]; the only way to add parameters.
#[derive(Debug, Clone, Default)]
pub struct ConfigurationBuilder {
    /// Parameters collected so far.
    params: BTreeMap<String, ConfigValue>,
}

impl ConfigurationBuilder {
    /// Adds a parameter.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] when the name is empty or already present.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        value: impl Into<ConfigValue>,
    ) -> Result<&mut Self, ConfigurationError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ConfigurationError::EmptyName);
        }
        if self.params.contains_key(&name) {
            return Err(ConfigurationError::Duplicate(name));
        }
        self.params.insert(name, value.into());
        Ok(self)
    }

    /// Freezes the collected parameters.
    #[must_use]
    pub fn build(self) -> Configuration {
        Configuration {
            params: self.params,
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
