// crates/provision-gate-config/src/lib.rs
// ============================================================================
// Module: Provision Gate Config Library
// Description: Harness configuration model, validation, and env overrides.
// Purpose: Single source of truth for provision-gate.toml semantics.
// Dependencies: provision-gate-core, regex, serde, toml, url
// ============================================================================

//! ## Overview
//! `provision-gate-config` loads the harness configuration: where the cloud
//! API lives, how apply failures are retried, which regions a run may land
//! in, and how to invoke the provisioning tool. Validation is strict and
//! fail-closed, and endpoint settings can be overridden from the
//! environment for runs against a local mock.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod env;
pub mod examples;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use env::HarnessEnv;
pub use env::read_env_strict;
pub use examples::config_toml_example;
