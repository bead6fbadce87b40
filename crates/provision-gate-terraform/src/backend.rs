// crates/provision-gate-terraform/src/backend.rs
// ============================================================================
// Module: Terraform Backend
// Description: BackendAdapter over the terraform CLI.
// Purpose: Init, apply, read outputs, and destroy a module per run.
// Dependencies: provision-gate-config, provision-gate-core, serde_json
// ============================================================================

//! ## Overview
//! Each distinct configuration gets its own terraform workspace, so parallel
//! runs against one module directory keep separate state. The handle is the
//! workspace name. Retrying an apply with the same configuration reuses the
//! same workspace, so a retry converges on the existing state instead of
//! provisioning a second copy.
//!
//! Command sequence per handle:
//! - `init -input=false`
//! - `workspace new -no-color <handle>` (first attempt only)
//! - `apply -input=false -auto-approve -no-color -var k=v ...`
//! - `output -no-color -json <key>`
//! - `destroy -auto-approve -input=false -no-color -var k=v ...`
//!
//! Failures before the workspace exists are clean, and so are variable
//! errors, which terraform reports before planning. Any other apply failure
//! reports the handle so teardown can remove partially created resources.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;

use provision_gate_config::EndpointConfig;
use provision_gate_config::HarnessConfig;
use provision_gate_core::ApplyFailure;
use provision_gate_core::BackendAdapter;
use provision_gate_core::BackendError;
use provision_gate_core::BackendHandle;
use provision_gate_core::Configuration;
use provision_gate_core::new_name;
use serde_json::Value;

use crate::runner::CommandOutput;
use crate::runner::CommandRunner;
use crate::runner::CommandSpec;
use crate::runner::SystemCommandRunner;
use crate::runner::TerraformError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Prefix for generated workspace names.
const WORKSPACE_PREFIX: &str = "pg";
/// Child env var selecting the workspace.
const WORKSPACE_ENV: &str = "TF_WORKSPACE";

/// Error fragments that mean the configuration itself is wrong.
const CONFIGURATION_MARKERS: &[&str] = &[
    "Reference to undeclared input variable",
    "Value for undeclared variable",
    "Invalid value for input variable",
    "Invalid value for variable",
    "No value for required variable",
    "Unsupported argument",
    "Missing required argument",
];

/// Error fragments that mean the caller lacks permission.
const PERMISSION_MARKERS: &[&str] = &[
    "AccessDenied",
    "Access Denied",
    "UnauthorizedOperation",
    "InvalidClientTokenId",
    "SignatureDoesNotMatch",
];

// ============================================================================
// SECTION: Workspace Table
// ============================================================================

/// Per-handle state kept between apply and destroy.
#[derive(Debug, Clone)]
struct Workspace {
    /// Rendered `-var` arguments, reused for destroy.
    vars: Vec<String>,
    /// Whether `workspace new` has succeeded.
    created: bool,
}

/// Handles by configuration fingerprint, and workspaces by handle.
#[derive(Debug, Default)]
struct WorkspaceTable {
    /// Fingerprint to handle.
    by_fingerprint: BTreeMap<String, String>,
    /// Handle to workspace, for handles not yet destroyed.
    workspaces: BTreeMap<String, Workspace>,
    /// Handles already destroyed; repeat destroys are no-ops.
    destroyed: BTreeSet<String>,
}

// ============================================================================
// SECTION: Backend
// ============================================================================

/// Terraform CLI provisioning backend.
pub struct TerraformBackend<R = SystemCommandRunner> {
    /// Binary name or path.
    binary: String,
    /// Module directory.
    working_dir: PathBuf,
    /// Environment passed to every child.
    env: Vec<(String, String)>,
    /// Process runner.
    runner: R,
    /// Workspace bookkeeping.
    table: Mutex<WorkspaceTable>,
}

impl TerraformBackend<SystemCommandRunner> {
    /// Creates a backend for the module in `working_dir`.
    #[must_use]
    pub fn new(binary: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self::with_runner(binary, working_dir, SystemCommandRunner)
    }

    /// Creates a backend from harness configuration.
    #[must_use]
    pub fn from_config(config: &HarnessConfig) -> Self {
        Self::new(config.terraform.binary.clone(), config.terraform.working_dir.clone())
            .with_endpoint(&config.endpoint)
    }
}

impl<R: CommandRunner> TerraformBackend<R> {
    /// Creates a backend with a custom process runner.
    #[must_use]
    pub fn with_runner(binary: impl Into<String>, working_dir: impl Into<PathBuf>, runner: R) -> Self {
        Self {
            binary: binary.into(),
            working_dir: working_dir.into(),
            env: vec![("TF_IN_AUTOMATION".to_string(), "1".to_string())],
            runner,
            table: Mutex::new(WorkspaceTable::default()),
        }
    }

    /// Passes the endpoint override and static credentials to every child.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: &EndpointConfig) -> Self {
        if let Some(url) = &endpoint.url {
            self.env.push(("AWS_ENDPOINT_URL".to_string(), url.clone()));
        }
        if let Some((key, secret)) = endpoint.credentials() {
            self.env.push(("AWS_ACCESS_KEY_ID".to_string(), key.to_string()));
            self.env.push(("AWS_SECRET_ACCESS_KEY".to_string(), secret.to_string()));
        }
        self
    }

    /// Returns the module directory.
    #[must_use]
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Returns the runner.
    pub const fn runner(&self) -> &R {
        &self.runner
    }

    /// Builds a command; `workspace` selects the state via `TF_WORKSPACE`.
    fn command(&self, args: Vec<String>, workspace: Option<&str>) -> CommandSpec {
        let mut env = self.env.clone();
        if let Some(workspace) = workspace {
            env.push((WORKSPACE_ENV.to_string(), workspace.to_string()));
        }
        CommandSpec {
            program: self.binary.clone(),
            args,
            env,
            cwd: self.working_dir.clone(),
        }
    }

    /// Runs a command and maps a non-zero exit through [`classify_failure`].
    fn execute(&self, spec: &CommandSpec) -> Result<CommandOutput, BackendError> {
        let output = self.runner.run(spec).map_err(BackendError::from)?;
        if output.success { Ok(output) } else { Err(classify_failure(&output.failure_text())) }
    }

    /// Looks up or allocates the workspace for `config`.
    fn workspace_for(&self, config: &Configuration) -> Result<(String, Workspace), BackendError> {
        let fingerprint = fingerprint(config);
        let mut table = self.table.lock().map_err(|_| BackendError::from(TerraformError::Poisoned))?;
        if let Some(handle) = table.by_fingerprint.get(&fingerprint).cloned()
            && let Some(workspace) = table.workspaces.get(&handle)
        {
            return Ok((handle, workspace.clone()));
        }
        let handle = new_name(WORKSPACE_PREFIX);
        let workspace = Workspace {
            vars: render_vars(config),
            created: false,
        };
        table.by_fingerprint.insert(fingerprint, handle.clone());
        table.workspaces.insert(handle.clone(), workspace.clone());
        Ok((handle, workspace))
    }

    /// Records that the workspace exists.
    fn mark_created(&self, handle: &str) -> Result<(), BackendError> {
        let mut table = self.table.lock().map_err(|_| BackendError::from(TerraformError::Poisoned))?;
        if let Some(workspace) = table.workspaces.get_mut(handle) {
            workspace.created = true;
        }
        Ok(())
    }

    /// Returns the live workspace for `handle`, or `None` once destroyed.
    fn destroy_target(&self, handle: &BackendHandle) -> Result<Option<Workspace>, BackendError> {
        let table = self.table.lock().map_err(|_| BackendError::from(TerraformError::Poisoned))?;
        if table.destroyed.contains(handle.as_str()) {
            return Ok(None);
        }
        table.workspaces.get(handle.as_str()).cloned().map(Some).ok_or_else(|| {
            BackendError::Configuration(format!("unknown terraform handle {handle}"))
        })
    }

    /// Drops the workspace state for a destroyed handle, keeping only its name.
    fn retire(&self, handle: &BackendHandle) -> Result<(), BackendError> {
        let mut table = self.table.lock().map_err(|_| BackendError::from(TerraformError::Poisoned))?;
        table.workspaces.remove(handle.as_str());
        table.by_fingerprint.retain(|_, name| name != handle.as_str());
        table.destroyed.insert(handle.as_str().to_string());
        Ok(())
    }
}

impl<R: CommandRunner> BackendAdapter for TerraformBackend<R> {
    fn apply(&self, config: &Configuration) -> Result<BackendHandle, ApplyFailure> {
        let (name, workspace) = self.workspace_for(config).map_err(ApplyFailure::clean)?;
        let handle = BackendHandle::new(name.as_str());

        self.execute(&self.command(args(&["init", "-input=false"]), None))
            .map_err(|error| partial_if(error, workspace.created, &handle))?;
        if !workspace.created {
            self.execute(&self.command(args(&["workspace", "new", "-no-color", name.as_str()]), None))
                .map_err(ApplyFailure::clean)?;
            self.mark_created(&name).map_err(|error| ApplyFailure::partial(error, handle.clone()))?;
        }

        let mut apply = args(&["apply", "-input=false", "-auto-approve", "-no-color"]);
        apply.extend(workspace.vars.iter().cloned());
        self.execute(&self.command(apply, Some(&name))).map_err(|error| match error {
            BackendError::Configuration(_) => ApplyFailure::clean(error),
            other => ApplyFailure::partial(other, handle.clone()),
        })?;
        Ok(handle)
    }

    fn output(&self, handle: &BackendHandle, key: &str) -> Result<String, BackendError> {
        let spec = self.command(args(&["output", "-no-color", "-json", key]), Some(handle.as_str()));
        let output = self.runner.run(&spec).map_err(BackendError::from)?;
        if !output.success {
            let text = output.failure_text();
            if text.contains("not found") || text.contains("No outputs found") {
                return Err(BackendError::NotFound {
                    key: key.to_string(),
                });
            }
            return Err(classify_failure(&text));
        }
        render_output(key, output.stdout.trim())
    }

    fn destroy(&self, handle: &BackendHandle) -> Result<(), BackendError> {
        let Some(workspace) = self.destroy_target(handle)? else {
            return Ok(());
        };
        if workspace.created {
            let mut destroy = args(&["destroy", "-auto-approve", "-input=false", "-no-color"]);
            destroy.extend(workspace.vars);
            self.execute(&self.command(destroy, Some(handle.as_str())))?;
        }
        self.retire(handle)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

impl From<TerraformError> for BackendError {
    fn from(error: TerraformError) -> Self {
        match error {
            TerraformError::Spawn {
                ..
            } => Self::Configuration(error.to_string()),
            TerraformError::Poisoned => Self::Backend(error.to_string()),
        }
    }
}

/// Maps terraform error text onto a backend error variant.
#[must_use]
pub fn classify_failure(text: &str) -> BackendError {
    if CONFIGURATION_MARKERS.iter().any(|marker| text.contains(marker)) {
        return BackendError::Configuration(text.to_string());
    }
    if PERMISSION_MARKERS.iter().any(|marker| text.contains(marker)) {
        return BackendError::PermissionDenied(text.to_string());
    }
    BackendError::Backend(text.to_string())
}

/// Renders one `-var` pair per parameter, in name order.
fn render_vars(config: &Configuration) -> Vec<String> {
    config
        .iter()
        .flat_map(|(name, value)| ["-var".to_string(), format!("{name}={}", value.to_literal())])
        .collect()
}

/// Stable identity of a configuration for retry convergence.
fn fingerprint(config: &Configuration) -> String {
    render_vars(config).join("\u{1f}")
}

/// Converts a string slice list to owned arguments.
fn args(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| (*value).to_string()).collect()
}

/// Wraps `error` as partial when the workspace already holds state.
fn partial_if(error: BackendError, created: bool, handle: &BackendHandle) -> ApplyFailure {
    if created { ApplyFailure::partial(error, handle.clone()) } else { ApplyFailure::clean(error) }
}

/// Unwraps a JSON output value: strings unquoted, everything else compact JSON.
fn render_output(key: &str, raw: &str) -> Result<String, BackendError> {
    let value: Value = serde_json::from_str(raw).map_err(|err| {
        BackendError::Backend(format!("output {key} is not valid json: {err}"))
    })?;
    match value {
        Value::Null => Err(BackendError::NotFound {
            key: key.to_string(),
        }),
        Value::String(text) => Ok(text),
        other => Ok(other.to_string()),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
