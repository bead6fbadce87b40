// crates/provision-gate-core/src/runtime/report.rs
// ============================================================================
// Module: Provision Gate Run Report
// Description: Assertion outcomes, abort errors, and teardown results.
// Purpose: Report every mismatch from one run, with teardown kept separate.
// Dependencies: crate::core, crate::interfaces, thiserror
// ============================================================================

//! ## Overview
//! A [`RunReport`] keeps three things apart: what was validated (the
//! assertions), why the run stopped early (the abort error, if any), and
//! whether cleanup worked (the teardown). A teardown failure never changes
//! the assertion results, and it is never dropped silently either.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::core::BackendHandle;
use crate::core::ConfigurationError;
use crate::core::RunName;
use crate::core::RunPhase;
use crate::core::TestRun;
use crate::interfaces::BackendError;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Reasons a run aborts.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunError {
    /// No region could be resolved.
    #[error("no region available for run")]
    NoRegion,
    /// The plan produced an invalid configuration.
    #[error("invalid configuration: {0}")]
    Configuration(#[from] ConfigurationError),
    /// Apply failed fatally or exhausted its retries.
    #[error("apply failed after {attempts} attempt(s): {error}")]
    Apply {
        /// Attempts made.
        attempts: u32,
        /// Last backend error.
        error: BackendError,
    },
    /// An output needed by later steps could not be read.
    #[error("required output {key} unavailable: {error}")]
    RequiredOutput {
        /// Output key.
        key: String,
        /// Backend error.
        error: BackendError,
    },
    /// The run deadline passed.
    #[error("run deadline exceeded during {phase}")]
    DeadlineExceeded {
        /// Phase in progress when the deadline was detected.
        phase: RunPhase,
    },
}

impl RunError {
    /// Returns true when the abort stems from invalid configuration.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_)
                | Self::Apply {
                    error: BackendError::Configuration(_),
                    ..
                }
        )
    }
}

/// Failure destroying one handle.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("teardown of {handle} failed: {message}")]
pub struct TeardownError {
    /// Handle whose destroy failed.
    pub handle: BackendHandle,
    /// Backend error text.
    pub message: String,
}

// ============================================================================
// SECTION: Outcomes
// ============================================================================

/// Result of one evaluated check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Assertion {
    /// Check description.
    pub description: String,
    /// Rendered expectation (`<present>` for presence checks).
    pub expected: String,
    /// Observed value, or the reason it could not be observed.
    pub actual: Result<String, String>,
    /// Whether the observation met the expectation.
    pub passed: bool,
}

/// Teardown results for a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Teardown {
    /// Handles a destroy was attempted for, in order.
    pub attempted: Vec<BackendHandle>,
    /// Failed destroys.
    pub failures: Vec<TeardownError>,
}

impl Teardown {
    /// Returns true when nothing needed destroying.
    #[must_use]
    pub fn not_required(&self) -> bool {
        self.attempted.is_empty()
    }

    /// Returns true when every destroy succeeded.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Final result of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Generated run name.
    pub name: RunName,
    /// Frozen run inputs; `None` when the run aborted before configuring.
    pub run: Option<TestRun>,
    /// Phases entered, in order.
    pub phases: Vec<RunPhase>,
    /// Apply attempts made.
    pub apply_attempts: u32,
    /// Handle obtained from a successful apply.
    pub handle: Option<BackendHandle>,
    /// Evaluated checks.
    pub assertions: Vec<Assertion>,
    /// Abort reason.
    pub abort: Option<RunError>,
    /// Teardown results.
    pub teardown: Teardown,
}

impl RunReport {
    /// Terminal phase (`Done` or `Aborted`).
    #[must_use]
    pub fn final_phase(&self) -> RunPhase {
        self.phases.last().copied().unwrap_or(RunPhase::Init)
    }

    /// Number of failed assertions.
    #[must_use]
    pub fn failed_assertions(&self) -> usize {
        self.assertions.iter().filter(|assertion| !assertion.passed).count()
    }

    /// Number of passed assertions.
    #[must_use]
    pub fn passed_assertions(&self) -> usize {
        self.assertions.iter().filter(|assertion| assertion.passed).count()
    }

    /// True when nothing aborted, every assertion passed, and teardown succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.abort.is_none() && self.failed_assertions() == 0 && self.teardown.succeeded()
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "run {} finished {}: {} passed, {} failed",
            self.name,
            self.final_phase(),
            self.passed_assertions(),
            self.failed_assertions()
        )?;
        if let Some(abort) = &self.abort {
            writeln!(f, "  aborted: {abort}")?;
        }
        for assertion in self.assertions.iter().filter(|assertion| !assertion.passed) {
            match &assertion.actual {
                Ok(actual) => writeln!(
                    f,
                    "  FAIL {}: expected \"{}\", got \"{actual}\"",
                    assertion.description, assertion.expected
                )?,
                Err(reason) => writeln!(
                    f,
                    "  FAIL {}: expected \"{}\", unavailable: {reason}",
                    assertion.description, assertion.expected
                )?,
            }
        }
        if !self.teardown.succeeded() {
            writeln!(f, "teardown:")?;
            for failure in &self.teardown.failures {
                writeln!(f, "  {failure}")?;
            }
        }
        Ok(())
    }
}
