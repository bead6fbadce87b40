// crates/provision-gate-aws/src/lib.rs
// ============================================================================
// Module: Provision Gate AWS Library
// Description: S3 resource inspector and stable region catalogue.
// Purpose: Observe provisioned AWS resources and choose run regions.
// Dependencies: aws-config, aws-sdk-s3, provision-gate-config, provision-gate-core, rand, tokio
// ============================================================================

//! ## Overview
//! AWS-specific pieces of the harness: [`S3Inspector`] implements the core
//! `ResourceInspector` for buckets, and [`regions`] provides the stable
//! region catalogue runs are spread across.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod inspector;
pub mod regions;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use inspector::BucketApi;
pub use inspector::BucketLogging;
pub use inspector::S3InspectError;
pub use inspector::S3Inspector;
pub use inspector::SdkBucketApi;
pub use regions::STABLE_REGIONS;
pub use regions::random_stable_region;
pub use regions::region_choice;
