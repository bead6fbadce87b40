// crates/provision-gate-core/src/runtime/guard.rs
// ============================================================================
// Module: Provision Gate Teardown Guard
// Description: Scoped ownership of provisioned handles with guaranteed release.
// Purpose: Destroy exactly once per handle on every exit path, unwinding included.
// Dependencies: crate::audit, crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! The controller arms a [`TeardownGuard`] as soon as any apply attempt
//! yields a handle. Normal and error paths call [`TeardownGuard::release`]
//! from the `Destroying` phase. If the run unwinds before that point, `Drop`
//! performs the same destroys. Each handle is taken out of the guard right
//! before its destroy call, so a handle is never destroyed twice and a
//! panicking destroy does not strand the handles behind it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::audit::RunAuditEvent;
use crate::audit::RunAuditEventParams;
use crate::audit::RunAuditSink;
use crate::core::BackendHandle;
use crate::core::RunPhase;
use crate::interfaces::BackendAdapter;
use crate::runtime::report::Teardown;
use crate::runtime::report::TeardownError;

// ============================================================================
// SECTION: Guard
// ============================================================================

/// Owns the handles a run must destroy.
///
/// # Invariants
/// - Each distinct handle is destroyed at most once.
/// - Handles are destroyed in the order they were obtained.
pub struct TeardownGuard<'a, B: BackendAdapter + ?Sized> {
    /// Backend that issued the handles.
    backend: &'a B,
    /// Audit sink for teardown events.
    audit: &'a dyn RunAuditSink,
    /// Run name for audit events.
    run_name: String,
    /// Handles pending destroy.
    handles: Vec<BackendHandle>,
}

impl<'a, B: BackendAdapter + ?Sized> TeardownGuard<'a, B> {
    /// Creates an unarmed guard.
    #[must_use]
    pub fn new(backend: &'a B, audit: &'a dyn RunAuditSink, run_name: impl Into<String>) -> Self {
        Self {
            backend,
            audit,
            run_name: run_name.into(),
            handles: Vec::new(),
        }
    }

    /// Registers a handle for teardown; repeated handles are ignored.
    pub fn arm(&mut self, handle: BackendHandle) {
        if !self.handles.contains(&handle) {
            self.handles.push(handle);
        }
    }

    /// Returns true when at least one handle is pending.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        !self.handles.is_empty()
    }

    /// Destroys every pending handle and disarms the guard.
    pub fn release(mut self) -> Teardown {
        self.destroy_all("release")
    }

    /// Destroys pending handles in order, recording each outcome.
    ///
    /// Each handle leaves the guard just before its destroy call, so a panic
    /// inside one destroy leaves the later handles for `Drop`.
    fn destroy_all(&mut self, path: &'static str) -> Teardown {
        let mut teardown = Teardown::default();
        while !self.handles.is_empty() {
            let handle = self.handles.remove(0);
            let result = self.backend.destroy(&handle);
            let (outcome, detail) = match &result {
                Ok(()) => ("ok", format!("{path}: {handle}")),
                Err(err) => ("failed", format!("{path}: {handle}: {err}")),
            };
            self.audit.record(&RunAuditEvent::new(RunAuditEventParams {
                event: "teardown",
                run_name: Some(self.run_name.clone()),
                phase: RunPhase::Destroying,
                attempt: None,
                outcome: Some(outcome),
                detail: Some(detail),
            }));
            if let Err(err) = result {
                teardown.failures.push(TeardownError {
                    handle: handle.clone(),
                    message: err.to_string(),
                });
            }
            teardown.attempted.push(handle);
        }
        teardown
    }
}

impl<B: BackendAdapter + ?Sized> Drop for TeardownGuard<'_, B> {
    fn drop(&mut self) {
        if !self.handles.is_empty() {
            let _ = self.destroy_all("unwind");
        }
    }
}
