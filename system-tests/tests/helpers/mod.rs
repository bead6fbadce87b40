// system-tests/tests/helpers/mod.rs
// ============================================================================
// Module: System Test Helpers
// Description: Shared helpers for provisioning system-tests.
// Purpose: Provide the mock endpoint fixture and process preflight checks.
// Dependencies: system-tests, provision-gate-config
// ============================================================================

//! ## Overview
//! Shared helpers for provisioning system-tests.
//! Invariants:
//! - Missing prerequisites (docker, terraform) fail the suite rather than skip it.
//! - Every fixture talks to a mock endpoint, never the real cloud.

#![allow(dead_code, reason = "Shared helpers are reused across multiple test suites.")]

pub mod infra;
