// crates/provision-gate-core/src/interfaces/mod.rs
// ============================================================================
// Module: Provision Gate Interfaces
// Description: Backend-agnostic provisioning and inspection interfaces.
// Purpose: Define the contract surfaces used by the lifecycle controller.
// Dependencies: crate::core, thiserror
// ============================================================================

//! ## Overview
//! Interfaces define how the harness reaches external systems without
//! embedding backend-specific details. Both capabilities are synchronous
//! from the controller's point of view: one request, one result, no
//! streaming. Implementations that use async I/O internally must block
//! before returning.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::BackendHandle;
use crate::core::Configuration;
use crate::core::ResourceRef;

// ============================================================================
// SECTION: Backend Adapter
// ============================================================================

/// Errors reported by a provisioning backend.
///
/// # Invariants
/// - Variants are stable for programmatic handling and retry classification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// Configuration was rejected by the backend. Never retried.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// Caller lacks permission for the requested operation. Never retried.
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    /// Known-transient failure (rate limiting, network, consistency race).
    #[error("transient backend error: {0}")]
    Transient(String),
    /// Requested output key does not exist.
    #[error("output not found: {key}")]
    NotFound {
        /// Missing output key.
        key: String,
    },
    /// Unclassified backend failure; retry is decided by message patterns.
    #[error("backend error: {0}")]
    Backend(String),
}

/// Failed apply, plus the handle to clean up if resources may exist.
///
/// # Invariants
/// - `handle` is `Some` whenever the backend may have created anything.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{error}")]
pub struct ApplyFailure {
    /// Underlying backend error.
    pub error: BackendError,
    /// Handle addressing partially-created resources.
    pub handle: Option<BackendHandle>,
}

impl ApplyFailure {
    /// Failure that created nothing.
    #[must_use]
    pub const fn clean(error: BackendError) -> Self {
        Self {
            error,
            handle: None,
        }
    }

    /// Failure that may have left resources behind.
    #[must_use]
    pub const fn partial(error: BackendError, handle: BackendHandle) -> Self {
        Self {
            error,
            handle: Some(handle),
        }
    }
}

/// Provisioning backend capability.
pub trait BackendAdapter {
    /// Applies configuration and returns a handle to the provisioned set.
    ///
    /// Repeating a call with identical configuration after a transient
    /// failure must converge to the same state rather than duplicate it.
    ///
    /// # Errors
    ///
    /// Returns [`ApplyFailure`] when provisioning fails.
    fn apply(&self, config: &Configuration) -> Result<BackendHandle, ApplyFailure>;

    /// Reads a named result of the apply.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::NotFound`] when the key does not exist.
    fn output(&self, handle: &BackendHandle, key: &str) -> Result<String, BackendError>;

    /// Tears down everything created under `handle`.
    ///
    /// Must tolerate partially-applied state and repeated calls.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] when teardown fails.
    fn destroy(&self, handle: &BackendHandle) -> Result<(), BackendError>;
}

// ============================================================================
// SECTION: Resource Inspector
// ============================================================================

/// Errors reported by a resource inspector.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InspectError {
    /// The attribute could not be resolved (missing resource, permissions,
    /// unreachable backend, unknown attribute).
    #[error("attribute {attribute} unavailable: {reason}")]
    AttributeUnavailable {
        /// Requested attribute.
        attribute: String,
        /// Human-readable cause.
        reason: String,
    },
}

impl InspectError {
    /// Builds an [`InspectError::AttributeUnavailable`].
    #[must_use]
    pub fn unavailable(attribute: &str, reason: impl Into<String>) -> Self {
        Self::AttributeUnavailable {
            attribute: attribute.to_string(),
            reason: reason.into(),
        }
    }
}

/// Read-only attribute access for provisioned resources.
pub trait ResourceInspector {
    /// Fetches one descriptive property of a provisioned resource.
    ///
    /// Implementations must not mutate the resource.
    ///
    /// # Errors
    ///
    /// Returns [`InspectError::AttributeUnavailable`] when the value cannot be resolved.
    fn get_attribute(&self, resource: &ResourceRef, attribute: &str)
    -> Result<String, InspectError>;
}
