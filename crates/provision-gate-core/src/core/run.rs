// crates/provision-gate-core/src/core/run.rs
// ============================================================================
// Module: Provision Gate Run Model
// Description: Test run identity, lifecycle phases, and resource references.
// Purpose: Describe a single provision-validate-teardown execution.
// Dependencies: crate::core, serde
// ============================================================================

//! ## Overview
//! A [`TestRun`] is created in `Init`, completed in `Configuring`, and is
//! never mutated afterwards. Phases are strictly sequential; `Aborted` is
//! the only terminal state other than `Done`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Serialize;

use crate::core::identifiers::BackendHandle;
use crate::core::identifiers::RunName;
use crate::core::values::Configuration;

// ============================================================================
// SECTION: Test Run
// ============================================================================

/// Identity and frozen inputs of one harness execution.
///
/// # Invariants
/// - `region` is fixed for the run's duration.
/// - `config` is immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestRun {
    /// Generated unique resource name.
    pub name: RunName,
    /// Caller-supplied environment tag.
    pub environment: String,
    /// Target region chosen at `Init`.
    pub region: String,
    /// Parameters handed to the backend.
    pub config: Configuration,
}

// ============================================================================
// SECTION: Phases
// ============================================================================

/// Lifecycle controller states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    /// Generating identifiers and resolving the region.
    Init,
    /// Assembling the configuration map.
    Configuring,
    /// Applying configuration through the backend.
    Applying,
    /// Reading outputs and attributes.
    Inspecting,
    /// Comparing observed values with expectations.
    Asserting,
    /// Tearing down provisioned resources.
    Destroying,
    /// Finished normally.
    Done,
    /// Finished after an unrecoverable error.
    Aborted,
}

impl RunPhase {
    /// Returns the stable label for the phase.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Configuring => "configuring",
            Self::Applying => "applying",
            Self::Inspecting => "inspecting",
            Self::Asserting => "asserting",
            Self::Destroying => "destroying",
            Self::Done => "done",
            Self::Aborted => "aborted",
        }
    }

    /// Returns true for `Done` and `Aborted`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Aborted)
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Resource Reference
// ============================================================================

/// What a resource inspector is asked about.
///
/// Carries the backend handle plus the resource identifier read back from
/// the backend's outputs, when the plan names one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceRef {
    /// Handle returned by apply.
    pub handle: BackendHandle,
    /// Resource identifier from the backend outputs.
    pub resource_id: Option<String>,
    /// Region the run targets.
    pub region: String,
}

impl ResourceRef {
    /// Returns the resource identifier, falling back to the handle.
    #[must_use]
    pub fn id(&self) -> &str {
        self.resource_id.as_deref().unwrap_or_else(|| self.handle.as_str())
    }
}
