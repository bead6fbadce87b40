// crates/provision-gate-core/tests/support/mod.rs
// ============================================================================
// Module: Test Support
// Description: Scripted backend, inspector, and sleeper doubles.
// Purpose: Drive the lifecycle controller deterministically without real infrastructure.
// ============================================================================

//! Shared doubles for lifecycle controller tests.

#![allow(dead_code, reason = "Shared helpers are reused across multiple test files.")]

use std::collections::BTreeMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use provision_gate_core::ApplyFailure;
use provision_gate_core::BackendAdapter;
use provision_gate_core::BackendError;
use provision_gate_core::BackendHandle;
use provision_gate_core::Configuration;
use provision_gate_core::InspectError;
use provision_gate_core::ResourceInspector;
use provision_gate_core::ResourceRef;
use provision_gate_core::Sleeper;

// ============================================================================
// SECTION: Fake Backend
// ============================================================================

#[derive(Default)]
struct BackendState {
    apply_script: VecDeque<Result<BackendHandle, ApplyFailure>>,
    applied: Vec<Configuration>,
    outputs: BTreeMap<String, String>,
    destroyed: Vec<BackendHandle>,
    destroy_error: Option<BackendError>,
    apply_delay: Option<Duration>,
}

/// Scripted provisioning backend. Clones share state.
#[derive(Clone, Default)]
pub struct FakeBackend {
    state: Arc<Mutex<BackendState>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the result of the next apply; unscripted applies return `h1`.
    pub fn script_apply(self, result: Result<&str, ApplyFailure>) -> Self {
        self.state.lock().unwrap().apply_script.push_back(result.map(BackendHandle::from));
        self
    }

    /// Queues `count` identical failures.
    pub fn fail_apply(self, count: usize, error: &BackendError) -> Self {
        for _ in 0 .. count {
            self.state
                .lock()
                .unwrap()
                .apply_script
                .push_back(Err(ApplyFailure::clean(error.clone())));
        }
        self
    }

    pub fn with_output(self, key: &str, value: &str) -> Self {
        self.state.lock().unwrap().outputs.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_destroy_error(self, error: BackendError) -> Self {
        self.state.lock().unwrap().destroy_error = Some(error);
        self
    }

    pub fn with_apply_delay(self, delay: Duration) -> Self {
        self.state.lock().unwrap().apply_delay = Some(delay);
        self
    }

    pub fn apply_count(&self) -> usize {
        self.state.lock().unwrap().applied.len()
    }

    pub fn applied(&self) -> Vec<Configuration> {
        self.state.lock().unwrap().applied.clone()
    }

    pub fn destroyed(&self) -> Vec<BackendHandle> {
        self.state.lock().unwrap().destroyed.clone()
    }
}

impl BackendAdapter for FakeBackend {
    fn apply(&self, config: &Configuration) -> Result<BackendHandle, ApplyFailure> {
        let delay = {
            let mut state = self.state.lock().unwrap();
            state.applied.push(config.clone());
            state.apply_delay
        };
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
        self.state
            .lock()
            .unwrap()
            .apply_script
            .pop_front()
            .unwrap_or_else(|| Ok(BackendHandle::new("h1")))
    }

    fn output(&self, _handle: &BackendHandle, key: &str) -> Result<String, BackendError> {
        self.state.lock().unwrap().outputs.get(key).cloned().ok_or_else(|| BackendError::NotFound {
            key: key.to_string(),
        })
    }

    fn destroy(&self, handle: &BackendHandle) -> Result<(), BackendError> {
        let mut state = self.state.lock().unwrap();
        state.destroyed.push(handle.clone());
        state.destroy_error.clone().map_or(Ok(()), Err)
    }
}

// ============================================================================
// SECTION: Fake Inspector
// ============================================================================

/// Inspector answering from a fixed attribute table.
#[derive(Clone, Default)]
pub struct FakeInspector {
    attributes: BTreeMap<String, String>,
    panic_on: Option<String>,
    seen: Arc<Mutex<Vec<ResourceRef>>>,
}

impl FakeInspector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, attribute: &str, value: &str) -> Self {
        self.attributes.insert(attribute.to_string(), value.to_string());
        self
    }

    /// Panics when `attribute` is requested.
    pub fn panicking_on(mut self, attribute: &str) -> Self {
        self.panic_on = Some(attribute.to_string());
        self
    }

    pub fn seen(&self) -> Vec<ResourceRef> {
        self.seen.lock().unwrap().clone()
    }

    /// Attribute table for the healthy bucket scenario.
    pub fn healthy_bucket(bucket: &str) -> Self {
        Self::new()
            .with("versioning", "Enabled")
            .with("policy_exists", "true")
            .with("logging_target", &format!("{bucket}-logs"))
            .with("logging_prefix", "TFStateLogs/")
    }
}

impl ResourceInspector for FakeInspector {
    fn get_attribute(
        &self,
        resource: &ResourceRef,
        attribute: &str,
    ) -> Result<String, InspectError> {
        self.seen.lock().unwrap().push(resource.clone());
        if self.panic_on.as_deref() == Some(attribute) {
            panic!("inspector exploded on {attribute}");
        }
        self.attributes
            .get(attribute)
            .cloned()
            .ok_or_else(|| InspectError::unavailable(attribute, "no such attribute"))
    }
}

// ============================================================================
// SECTION: Sleeper
// ============================================================================

/// Sleeper that records requested delays and returns immediately.
#[derive(Clone, Default)]
pub struct RecordingSleeper {
    delays: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().unwrap().clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.delays.lock().unwrap().push(duration);
    }
}
