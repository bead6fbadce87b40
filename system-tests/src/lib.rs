// system-tests/src/lib.rs
// ============================================================================
// Module: Provision Gate System Tests Library
// Description: Shared configuration for end-to-end provisioning scenarios.
// Purpose: Provide common settings for system-test binaries.
// Dependencies: provision-gate-config
// ============================================================================

//! ## Overview
//! This crate hosts the shared configuration used by the end-to-end suites in
//! `system-tests/tests`. Those suites drive the real terraform binary against
//! a mock S3 endpoint and are gated behind the `system-tests` feature.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
