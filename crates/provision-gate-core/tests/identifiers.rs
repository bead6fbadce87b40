// crates/provision-gate-core/tests/identifiers.rs
// ============================================================================
// Module: Run Name Tests
// Description: Uniqueness and format of generated run names.
// ============================================================================
//! ## Overview
//! Parallel runs rely on name uniqueness alone, so generation is checked
//! for collisions and for the lower-case alphanumeric suffix format.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only assertions are permitted."
)]

use std::collections::HashSet;
use std::thread;

use proptest::prelude::*;
use provision_gate_core::RunName;
use provision_gate_core::UNIQUE_ID_LEN;
use provision_gate_core::new_name;
use provision_gate_core::unique_id;

#[test]
fn ten_thousand_names_do_not_collide() {
    let names: HashSet<String> = (0 .. 10_000).map(|_| new_name("bucket")).collect();
    assert_eq!(names.len(), 10_000);
}

#[test]
fn names_from_parallel_threads_do_not_collide() {
    let handles: Vec<_> = (0 .. 8)
        .map(|_| thread::spawn(|| (0 .. 500).map(|_| unique_id()).collect::<Vec<_>>()))
        .collect();
    let mut seen = HashSet::new();
    for handle in handles {
        for id in handle.join().unwrap() {
            assert!(seen.insert(id));
        }
    }
    assert_eq!(seen.len(), 4_000);
}

#[test]
fn run_name_generate_uses_prefix() {
    let name = RunName::generate("terraform-aws-s3");
    assert!(name.as_str().starts_with("terraform-aws-s3-"));
    assert_eq!(name.as_str().len(), "terraform-aws-s3-".len() + UNIQUE_ID_LEN);
    assert_eq!(name.to_string(), name.as_str());
}

proptest! {
    #[test]
    fn prefix_is_preserved_and_suffix_is_lowercase(prefix in "[a-z][a-z0-9-]{0,24}") {
        let name = new_name(&prefix);
        let suffix = name.strip_prefix(&format!("{prefix}-")).unwrap();
        prop_assert_eq!(suffix.len(), UNIQUE_ID_LEN);
        prop_assert!(suffix.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit()));
    }
}
