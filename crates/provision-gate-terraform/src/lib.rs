// crates/provision-gate-terraform/src/lib.rs
// ============================================================================
// Module: Provision Gate Terraform Library
// Description: Terraform CLI provisioning backend.
// Purpose: Expose the terraform backend and its process runner seam.
// Dependencies: provision-gate-config, provision-gate-core, serde_json
// ============================================================================

//! ## Overview
//! [`TerraformBackend`] implements the core `BackendAdapter` by shelling out
//! to the terraform CLI. Process execution goes through [`CommandRunner`],
//! so the command sequence and error classification are testable without
//! the binary installed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod backend;
pub mod runner;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use backend::TerraformBackend;
pub use backend::classify_failure;
pub use runner::CommandOutput;
pub use runner::CommandRunner;
pub use runner::CommandSpec;
pub use runner::SystemCommandRunner;
pub use runner::TerraformError;
