// crates/provision-gate-core/src/runtime/plan.rs
// ============================================================================
// Module: Provision Gate Test Plan
// Description: Caller-declared inputs, region choice, and checks for a run.
// Purpose: Describe what to provision and what to verify, independent of backends.
// Dependencies: crate::core, rand
// ============================================================================

//! ## Overview
//! A [`TestPlan`] is the caller's half of a run: the name prefix, the
//! environment tag, how to pick a region, which configuration keys receive
//! the generated identifiers, extra parameters, and the checks to evaluate
//! once resources exist. Plans are reusable; every run generates its own
//! name from the same plan.

// ============================================================================
// SECTION: Imports
// ============================================================================

use rand::seq::SliceRandom;

use crate::core::ConfigValue;

// ============================================================================
// SECTION: Region Choice
// ============================================================================

/// How the run's region is chosen at `Init`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegionChoice {
    /// Always use this region.
    Pinned(String),
    /// Pick uniformly from these candidates to exercise region independence.
    Random(Vec<String>),
}

impl RegionChoice {
    /// Resolves the region; `None` when there is nothing to pick from.
    #[must_use]
    pub fn resolve(&self) -> Option<String> {
        match self {
            Self::Pinned(region) if !region.trim().is_empty() => Some(region.clone()),
            Self::Pinned(_) => None,
            Self::Random(candidates) => candidates.choose(&mut rand::thread_rng()).cloned(),
        }
    }
}

// ============================================================================
// SECTION: Checks
// ============================================================================

/// Where a check reads its observed value from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe {
    /// A named backend output.
    Output(String),
    /// A resource attribute fetched through the inspector.
    Attribute(String),
}

/// What a check expects to observe.
///
/// `Equals` templates may reference `{name}`, `{environment}`, `{region}`,
/// and `{resource_id}`; they are rendered against the run before comparing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expected {
    /// Observed value must equal the rendered template.
    Equals(String),
    /// Observed value must be non-empty.
    Present,
}

impl Expected {
    /// Shorthand for [`Expected::Equals`].
    #[must_use]
    pub fn equals(template: impl Into<String>) -> Self {
        Self::Equals(template.into())
    }
}

/// One post-provisioning validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Check {
    /// Human-readable description reported with the outcome.
    pub description: String,
    /// Value source.
    pub probe: Probe,
    /// Expectation.
    pub expected: Expected,
}

impl Check {
    /// Check against a resource attribute.
    #[must_use]
    pub fn attribute(
        attribute: impl Into<String>,
        expected: Expected,
        description: impl Into<String>,
    ) -> Self {
        Self {
            description: description.into(),
            probe: Probe::Attribute(attribute.into()),
            expected,
        }
    }

    /// Check against a backend output.
    #[must_use]
    pub fn output(key: impl Into<String>, expected: Expected, description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            probe: Probe::Output(key.into()),
            expected,
        }
    }
}

// ============================================================================
// SECTION: Plan
// ============================================================================

/// Caller-declared inputs for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestPlan {
    /// Prefix for the generated resource name.
    pub name_prefix: String,
    /// Environment tag.
    pub environment: String,
    /// Region choice.
    pub region: RegionChoice,
    /// Configuration key receiving the generated name.
    pub name_param: Option<String>,
    /// Configuration key receiving the environment tag.
    pub environment_param: Option<String>,
    /// Configuration key receiving the region.
    pub region_param: Option<String>,
    /// Additional caller parameters, in insertion order.
    pub parameters: Vec<(String, ConfigValue)>,
    /// Output key naming the provisioned resource; read before any check.
    pub resource_output: Option<String>,
    /// Checks evaluated after apply.
    pub checks: Vec<Check>,
}

impl TestPlan {
    /// Starts a plan with a pinned-nowhere region; callers set one with [`TestPlan::region`].
    #[must_use]
    pub fn new(name_prefix: impl Into<String>, environment: impl Into<String>) -> Self {
        Self {
            name_prefix: name_prefix.into(),
            environment: environment.into(),
            region: RegionChoice::Random(Vec::new()),
            name_param: None,
            environment_param: None,
            region_param: None,
            parameters: Vec::new(),
            resource_output: None,
            checks: Vec::new(),
        }
    }

    /// Sets the region choice.
    #[must_use]
    pub fn region(mut self, region: RegionChoice) -> Self {
        self.region = region;
        self
    }

    /// Routes the generated name into configuration key `key`.
    #[must_use]
    pub fn name_param(mut self, key: impl Into<String>) -> Self {
        self.name_param = Some(key.into());
        self
    }

    /// Routes the environment tag into configuration key `key`.
    #[must_use]
    pub fn environment_param(mut self, key: impl Into<String>) -> Self {
        self.environment_param = Some(key.into());
        self
    }

    /// Routes the resolved region into configuration key `key`.
    #[must_use]
    pub fn region_param(mut self, key: impl Into<String>) -> Self {
        self.region_param = Some(key.into());
        self
    }

    /// Adds a caller parameter.
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<ConfigValue>) -> Self {
        self.parameters.push((key.into(), value.into()));
        self
    }

    /// Names the output that identifies the provisioned resource.
    #[must_use]
    pub fn resource_output(mut self, key: impl Into<String>) -> Self {
        self.resource_output = Some(key.into());
        self
    }

    /// Adds a check.
    #[must_use]
    pub fn check(mut self, check: Check) -> Self {
        self.checks.push(check);
        self
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
