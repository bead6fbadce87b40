// crates/provision-gate-core/src/lib.rs
// ============================================================================
// Module: Provision Gate Core Library
// Description: Public API surface for the Provision Gate core.
// Purpose: Expose core types, interfaces, and the lifecycle runtime.
// Dependencies: crate::{audit, core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Provision Gate core runs infrastructure tests as a provision, validate,
//! always-tear-down lifecycle. It is backend-agnostic: provisioning tools and
//! cloud APIs plug in through [`BackendAdapter`] and [`ResourceInspector`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use crate::core::*;

pub use audit::FileRunAuditSink;
pub use audit::InMemoryRunAuditSink;
pub use audit::NoopRunAuditSink;
pub use audit::RunAuditEvent;
pub use audit::RunAuditSink;
pub use audit::StderrRunAuditSink;
pub use interfaces::ApplyFailure;
pub use interfaces::BackendAdapter;
pub use interfaces::BackendError;
pub use interfaces::InspectError;
pub use interfaces::ResourceInspector;
pub use runtime::Assertion;
pub use runtime::Check;
pub use runtime::ControllerConfig;
pub use runtime::ErrorClass;
pub use runtime::Expected;
pub use runtime::LifecycleController;
pub use runtime::Probe;
pub use runtime::RegionChoice;
pub use runtime::RetryPolicy;
pub use runtime::RetryPolicyError;
pub use runtime::RunError;
pub use runtime::RunReport;
pub use runtime::Sleeper;
pub use runtime::Teardown;
pub use runtime::TestPlan;
