// crates/provision-gate-core/src/core/mod.rs
// ============================================================================
// Module: Provision Gate Core Types
// Description: Identifiers, configuration values, and the run model.
// Purpose: Group the data types shared by interfaces and the runtime.
// Dependencies: rand, serde, serde_json
// ============================================================================

//! ## Overview
//! Core data types with no behavior beyond construction and rendering.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod identifiers;
pub mod run;
pub mod values;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use identifiers::BackendHandle;
pub use identifiers::RunName;
pub use identifiers::UNIQUE_ID_LEN;
pub use identifiers::new_name;
pub use identifiers::unique_id;
pub use run::ResourceRef;
pub use run::RunPhase;
pub use run::TestRun;
pub use values::ConfigValue;
pub use values::Configuration;
pub use values::ConfigurationBuilder;
pub use values::ConfigurationError;
