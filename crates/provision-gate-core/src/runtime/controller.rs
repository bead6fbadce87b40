// crates/provision-gate-core/src/runtime/controller.rs
// ============================================================================
// Module: Provision Gate Lifecycle Controller
// Description: Provision, inspect, assert, and always tear down.
// Purpose: Execute one test run through its state machine with guaranteed cleanup.
// Dependencies: crate::{audit, core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! The controller drives a run through
//! `Init → Configuring → Applying → Inspecting → Asserting → Destroying → Done`.
//! Every failure after a handle exists is returned through one path that
//! enters `Destroying` before `Aborted`, and a [`TeardownGuard`] covers the
//! unwinding case. Inspection and assertion failures are recorded rather
//! than raised, so a single run reports every mismatch.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use crate::audit::NoopRunAuditSink;
use crate::audit::RunAuditEvent;
use crate::audit::RunAuditEventParams;
use crate::audit::RunAuditSink;
use crate::core::BackendHandle;
use crate::core::Configuration;
use crate::core::ResourceRef;
use crate::core::RunName;
use crate::core::RunPhase;
use crate::core::TestRun;
use crate::interfaces::BackendAdapter;
use crate::interfaces::ResourceInspector;
use crate::runtime::guard::TeardownGuard;
use crate::runtime::plan::Expected;
use crate::runtime::plan::Probe;
use crate::runtime::plan::TestPlan;
use crate::runtime::report::Assertion;
use crate::runtime::report::RunError;
use crate::runtime::report::RunReport;
use crate::runtime::report::Teardown;
use crate::runtime::retry::ErrorClass;
use crate::runtime::retry::RetryPolicy;
use crate::runtime::retry::Sleeper;
use crate::runtime::retry::ThreadSleeper;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Controller settings shared by every run.
#[derive(Debug, Clone, Default)]
pub struct ControllerConfig {
    /// Apply retry policy.
    pub retry: RetryPolicy,
    /// Optional wall-clock budget for apply and inspection.
    pub deadline: Option<Duration>,
}

// ============================================================================
// SECTION: Run Trace
// ============================================================================

/// Mutable bookkeeping for one run.
struct RunTrace<'a> {
    /// Audit sink.
    audit: &'a dyn RunAuditSink,
    /// Generated run name.
    name: RunName,
    /// Phases entered so far.
    phases: Vec<RunPhase>,
    /// Apply attempts made.
    apply_attempts: u32,
    /// Run start, for deadline checks.
    started: Instant,
    /// Deadline budget.
    deadline: Option<Duration>,
}

impl RunTrace<'_> {
    /// Enters a phase and records the transition.
    fn enter(&mut self, phase: RunPhase) {
        self.phases.push(phase);
        self.emit("phase_entered", None, None, None);
    }

    /// Current phase.
    fn phase(&self) -> RunPhase {
        self.phases.last().copied().unwrap_or(RunPhase::Init)
    }

    /// Records an event in the current phase.
    fn emit(
        &self,
        event: &'static str,
        attempt: Option<u32>,
        outcome: Option<&'static str>,
        detail: Option<String>,
    ) {
        self.audit.record(&RunAuditEvent::new(RunAuditEventParams {
            event,
            run_name: Some(self.name.to_string()),
            phase: self.phase(),
            attempt,
            outcome,
            detail,
        }));
    }

    /// Fails when the deadline has passed, or would pass after `pending`.
    fn check_deadline(&self, pending: Duration) -> Result<(), RunError> {
        match self.deadline {
            Some(deadline) if self.started.elapsed().saturating_add(pending) > deadline => {
                Err(RunError::DeadlineExceeded {
                    phase: self.phase(),
                })
            }
            _ => Ok(()),
        }
    }
}

// ============================================================================
// SECTION: Controller
// ============================================================================

/// Lifecycle controller over a provisioning backend and a resource inspector.
pub struct LifecycleController<B, I, S = ThreadSleeper> {
    /// Provisioning backend.
    backend: B,
    /// Resource inspector.
    inspector: I,
    /// Retry delay implementation.
    sleeper: S,
    /// Audit sink.
    audit: Arc<dyn RunAuditSink>,
    /// Controller settings.
    config: ControllerConfig,
}

impl<B, I> LifecycleController<B, I, ThreadSleeper>
where
    B: BackendAdapter,
    I: ResourceInspector,
{
    /// Creates a controller that sleeps on the calling thread and logs nowhere.
    #[must_use]
    pub fn new(backend: B, inspector: I, config: ControllerConfig) -> Self {
        Self {
            backend,
            inspector,
            sleeper: ThreadSleeper,
            audit: Arc::new(NoopRunAuditSink),
            config,
        }
    }
}

impl<B, I, S> LifecycleController<B, I, S>
where
    B: BackendAdapter,
    I: ResourceInspector,
    S: Sleeper,
{
    /// Replaces the retry sleeper.
    #[must_use]
    pub fn with_sleeper<S2: Sleeper>(self, sleeper: S2) -> LifecycleController<B, I, S2> {
        LifecycleController {
            backend: self.backend,
            inspector: self.inspector,
            sleeper,
            audit: self.audit,
            config: self.config,
        }
    }

    /// Replaces the audit sink.
    #[must_use]
    pub fn with_audit(mut self, audit: Arc<dyn RunAuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Returns the backend.
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Executes one run of `plan` to completion.
    ///
    /// Never panics on backend or inspector errors; they end up in the report.
    pub fn run(&self, plan: &TestPlan) -> RunReport {
        let mut trace = RunTrace {
            audit: self.audit.as_ref(),
            name: RunName::generate(&plan.name_prefix),
            phases: Vec::new(),
            apply_attempts: 0,
            started: Instant::now(),
            deadline: self.config.deadline,
        };
        trace.enter(RunPhase::Init);
        trace.emit("run_started", None, None, Some(plan.environment.clone()));

        let Some(region) = plan.region.resolve() else {
            return finish(trace, None, None, Vec::new(), Some(RunError::NoRegion), None);
        };

        trace.enter(RunPhase::Configuring);
        let config = match build_configuration(plan, &trace.name, &region) {
            Ok(config) => config,
            Err(err) => return finish(trace, None, None, Vec::new(), Some(err), None),
        };
        let run = TestRun {
            name: trace.name.clone(),
            environment: plan.environment.clone(),
            region,
            config,
        };

        let mut guard = TeardownGuard::new(&self.backend, self.audit.as_ref(), trace.name.as_str());
        trace.enter(RunPhase::Applying);
        let applied = self.apply_with_retry(&run.config, &mut trace, &mut guard);
        let (handle, assertions, abort) = match applied {
            Err(err) => (None, Vec::new(), Some(err)),
            Ok(handle) => match self.inspect_and_assert(plan, &run, &handle, &mut trace) {
                Ok(assertions) => (Some(handle), assertions, None),
                Err(err) => (Some(handle), Vec::new(), Some(err)),
            },
        };

        let teardown = if guard.is_armed() {
            trace.enter(RunPhase::Destroying);
            Some(guard.release())
        } else {
            drop(guard);
            None
        };
        finish(trace, Some(run), handle, assertions, abort, teardown)
    }

    /// Runs `Inspecting` and `Asserting` against an applied handle.
    fn inspect_and_assert(
        &self,
        plan: &TestPlan,
        run: &TestRun,
        handle: &BackendHandle,
        trace: &mut RunTrace<'_>,
    ) -> Result<Vec<Assertion>, RunError> {
        trace.enter(RunPhase::Inspecting);
        trace.check_deadline(Duration::ZERO)?;
        let resource_id = match &plan.resource_output {
            Some(key) => Some(self.backend.output(handle, key).map_err(|error| {
                RunError::RequiredOutput {
                    key: key.clone(),
                    error,
                }
            })?),
            None => None,
        };
        let resource = ResourceRef {
            handle: handle.clone(),
            resource_id,
            region: run.region.clone(),
        };
        let mut observations = Vec::with_capacity(plan.checks.len());
        for check in &plan.checks {
            trace.check_deadline(Duration::ZERO)?;
            let observed = match &check.probe {
                Probe::Output(key) => {
                    self.backend.output(handle, key).map_err(|err| err.to_string())
                }
                Probe::Attribute(attribute) => self
                    .inspector
                    .get_attribute(&resource, attribute)
                    .map_err(|err| err.to_string()),
            };
            if let Err(reason) = &observed {
                trace.emit("inspection_failed", None, Some("failed"), Some(reason.clone()));
            }
            observations.push(observed);
        }

        trace.enter(RunPhase::Asserting);
        let assertions: Vec<Assertion> = plan
            .checks
            .iter()
            .zip(observations)
            .map(|(check, actual)| {
                let (expected, passed) = match &check.expected {
                    Expected::Equals(template) => {
                        let expected = render_template(template, run, &resource);
                        let passed = actual.as_ref().is_ok_and(|value| *value == expected);
                        (expected, passed)
                    }
                    Expected::Present => {
                        let passed = actual.as_ref().is_ok_and(|value| !value.trim().is_empty());
                        ("<present>".to_string(), passed)
                    }
                };
                trace.emit(
                    "assertion_evaluated",
                    None,
                    Some(if passed { "passed" } else { "failed" }),
                    Some(check.description.clone()),
                );
                Assertion {
                    description: check.description.clone(),
                    expected,
                    actual,
                    passed,
                }
            })
            .collect();
        Ok(assertions)
    }

    /// Applies under the retry policy, arming the guard on every handle seen.
    fn apply_with_retry(
        &self,
        config: &Configuration,
        trace: &mut RunTrace<'_>,
        guard: &mut TeardownGuard<'_, B>,
    ) -> Result<BackendHandle, RunError> {
        let policy = &self.config.retry;
        let mut attempt: u32 = 0;
        loop {
            attempt = attempt.saturating_add(1);
            trace.apply_attempts = attempt;
            trace.check_deadline(Duration::ZERO)?;
            trace.emit("apply_attempt", Some(attempt), None, None);
            let failure = match self.backend.apply(config) {
                Ok(handle) => {
                    guard.arm(handle.clone());
                    trace.emit("apply_attempt", Some(attempt), Some("ok"), Some(handle.to_string()));
                    return Ok(handle);
                }
                Err(failure) => failure,
            };
            if let Some(handle) = failure.handle {
                guard.arm(handle);
            }
            match policy.classify(&failure.error) {
                ErrorClass::Retryable {
                    reason,
                } if attempt < policy.max_attempts() => {
                    let delay = policy.backoff(attempt.saturating_sub(1));
                    trace.emit(
                        "apply_retry_scheduled",
                        Some(attempt),
                        Some("retry"),
                        Some(format!("{reason} ({}); retrying in {}ms", failure.error, delay.as_millis())),
                    );
                    trace.check_deadline(delay)?;
                    self.sleeper.sleep(delay);
                }
                _ => {
                    trace.emit(
                        "apply_attempt",
                        Some(attempt),
                        Some("failed"),
                        Some(failure.error.to_string()),
                    );
                    return Err(RunError::Apply {
                        attempts: attempt,
                        error: failure.error,
                    });
                }
            }
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Builds the configuration map from plan parameters and generated identifiers.
fn build_configuration(
    plan: &TestPlan,
    name: &RunName,
    region: &str,
) -> Result<Configuration, RunError> {
    let mut builder = Configuration::builder();
    if let Some(key) = &plan.name_param {
        builder.insert(key.clone(), name.as_str())?;
    }
    if let Some(key) = &plan.environment_param {
        builder.insert(key.clone(), plan.environment.as_str())?;
    }
    if let Some(key) = &plan.region_param {
        builder.insert(key.clone(), region)?;
    }
    for (key, value) in &plan.parameters {
        builder.insert(key.clone(), value.clone())?;
    }
    Ok(builder.build())
}

/// Substitutes run placeholders in an expectation template.
fn render_template(template: &str, run: &TestRun, resource: &ResourceRef) -> String {
    template
        .replace("{name}", run.name.as_str())
        .replace("{environment}", &run.environment)
        .replace("{region}", &run.region)
        .replace("{resource_id}", resource.id())
}

/// Enters the terminal phase and assembles the report.
fn finish(
    mut trace: RunTrace<'_>,
    run: Option<TestRun>,
    handle: Option<BackendHandle>,
    assertions: Vec<Assertion>,
    abort: Option<RunError>,
    teardown: Option<Teardown>,
) -> RunReport {
    let terminal = if abort.is_some() { RunPhase::Aborted } else { RunPhase::Done };
    trace.enter(terminal);
    let report = RunReport {
        name: trace.name.clone(),
        run,
        phases: trace.phases.clone(),
        apply_attempts: trace.apply_attempts,
        handle,
        assertions,
        abort,
        teardown: teardown.unwrap_or_default(),
    };
    trace.emit(
        "run_finished",
        None,
        Some(if report.is_success() { "passed" } else { "failed" }),
        report.abort.as_ref().map(ToString::to_string),
    );
    report
}
