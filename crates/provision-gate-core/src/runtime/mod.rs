// crates/provision-gate-core/src/runtime/mod.rs
// ============================================================================
// Module: Provision Gate Runtime
// Description: Lifecycle controller, retry policy, plans, and reports.
// Purpose: Execute provision-validate-teardown runs against pluggable backends.
// Dependencies: crate::{audit, core, interfaces}
// ============================================================================

//! ## Overview
//! Runtime components drive a [`TestPlan`] through the lifecycle state
//! machine and produce a [`RunReport`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod controller;
pub mod guard;
pub mod plan;
pub mod report;
pub mod retry;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use controller::ControllerConfig;
pub use controller::LifecycleController;
pub use guard::TeardownGuard;
pub use plan::Check;
pub use plan::Expected;
pub use plan::Probe;
pub use plan::RegionChoice;
pub use plan::TestPlan;
pub use report::Assertion;
pub use report::RunError;
pub use report::RunReport;
pub use report::Teardown;
pub use report::TeardownError;
pub use retry::ErrorClass;
pub use retry::RetryPolicy;
pub use retry::RetryPolicyError;
pub use retry::Sleeper;
pub use retry::ThreadSleeper;
