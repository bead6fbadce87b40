// crates/provision-gate-core/src/audit.rs
// ============================================================================
// Module: Provision Gate Run Audit Log
// Description: Structured lifecycle events for harness runs.
// Purpose: Emit JSON-line run logs without hard dependencies on a logging stack.
// Dependencies: crate::core, serde, serde_json
// ============================================================================

//! ## Overview
//! Every phase transition, apply attempt, assertion, and teardown produces a
//! [`RunAuditEvent`]. Sinks decide where events go; the stderr and file
//! sinks write one JSON object per line so CI logs can be grepped or piped
//! into a log pipeline as-is.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

use crate::core::RunPhase;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Run audit event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Run name, once generated.
    pub run_name: Option<String>,
    /// Phase the controller was in.
    pub phase: RunPhase,
    /// Apply attempt number (1-based) when relevant.
    pub attempt: Option<u32>,
    /// Outcome label (`ok`, `failed`, `retry`, ...).
    pub outcome: Option<&'static str>,
    /// Free-form detail (error text, assertion description).
    pub detail: Option<String>,
}

/// Inputs required to construct a run audit event.
pub struct RunAuditEventParams {
    /// Event identifier.
    pub event: &'static str,
    /// Run name, once generated.
    pub run_name: Option<String>,
    /// Phase the controller was in.
    pub phase: RunPhase,
    /// Apply attempt number when relevant.
    pub attempt: Option<u32>,
    /// Outcome label.
    pub outcome: Option<&'static str>,
    /// Free-form detail.
    pub detail: Option<String>,
}

impl RunAuditEvent {
    /// Creates a new audit event stamped with the current time.
    #[must_use]
    pub fn new(params: RunAuditEventParams) -> Self {
        let timestamp_ms =
            SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        Self {
            event: params.event,
            timestamp_ms,
            run_name: params.run_name,
            phase: params.phase,
            attempt: params.attempt,
            outcome: params.outcome,
            detail: params.detail,
        }
    }
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Audit sink for run lifecycle events.
pub trait RunAuditSink: Send + Sync {
    /// Record an audit event.
    fn record(&self, event: &RunAuditEvent);
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrRunAuditSink;

impl RunAuditSink for StderrRunAuditSink {
    fn record(&self, event: &RunAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Audit sink that logs JSON lines to a file.
pub struct FileRunAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileRunAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl RunAuditSink for FileRunAuditSink {
    fn record(&self, event: &RunAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// No-op audit sink.
pub struct NoopRunAuditSink;

impl RunAuditSink for NoopRunAuditSink {
    fn record(&self, _event: &RunAuditEvent) {}
}

/// Audit sink that keeps events in memory, for tests and report rendering.
#[derive(Debug, Default, Clone)]
pub struct InMemoryRunAuditSink {
    /// Recorded events shared across clones.
    events: Arc<Mutex<Vec<RunAuditEvent>>>,
}

impl InMemoryRunAuditSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<RunAuditEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }
}

impl RunAuditSink for InMemoryRunAuditSink {
    fn record(&self, event: &RunAuditEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
