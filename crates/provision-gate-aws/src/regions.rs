// crates/provision-gate-aws/src/regions.rs
// ============================================================================
// Module: Stable Regions
// Description: Catalogue of long-lived regions and random selection.
// Purpose: Spread runs across regions that are safe to provision in.
// Dependencies: provision-gate-config, provision-gate-core, rand
// ============================================================================

//! ## Overview
//! Newly launched regions tend to lack services or quota, so runs only pick
//! from a fixed catalogue of stable regions. Callers narrow it with an
//! approved list and exclude regions outright with a forbidden list.

use provision_gate_config::ConfigError;
use provision_gate_config::RunConfig;
use provision_gate_config::stable_candidates;
use provision_gate_core::RegionChoice;
use rand::seq::SliceRandom;

/// Regions considered stable for test provisioning.
pub const STABLE_REGIONS: &[&str] = &[
    "us-east-1",
    "us-east-2",
    "us-west-1",
    "us-west-2",
    "eu-west-1",
    "eu-west-2",
    "eu-west-3",
    "eu-central-1",
    "eu-north-1",
    "ap-south-1",
    "ap-southeast-1",
    "ap-southeast-2",
    "ap-northeast-1",
    "ap-northeast-2",
    "ca-central-1",
    "sa-east-1",
];

/// Picks a random stable region.
///
/// `approved` narrows the catalogue when non-empty; `forbidden` entries are
/// never returned. Returns `None` when nothing remains.
#[must_use]
pub fn random_stable_region(approved: &[&str], forbidden: &[&str]) -> Option<String> {
    stable_candidates(STABLE_REGIONS, approved, forbidden).choose(&mut rand::thread_rng()).cloned()
}

/// Resolves a run's region choice against the stable catalogue.
///
/// # Errors
///
/// Returns [`ConfigError`] when no stable region is both approved and allowed.
pub fn region_choice(run: &RunConfig) -> Result<RegionChoice, ConfigError> {
    run.region_choice(STABLE_REGIONS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalogue_has_no_duplicates() {
        let mut sorted = STABLE_REGIONS.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), STABLE_REGIONS.len());
    }

    #[test]
    fn everything_forbidden_yields_none() {
        assert_eq!(random_stable_region(&["eu-west-1"], &["eu-west-1"]), None);
    }
}
