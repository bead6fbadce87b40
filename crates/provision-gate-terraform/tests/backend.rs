// crates/provision-gate-terraform/tests/backend.rs
// ============================================================================
// Module: Terraform Backend Tests
// Description: Command sequencing and error mapping with a scripted runner.
// ============================================================================
//! ## Overview
//! Drives [`TerraformBackend`] through a scripted [`CommandRunner`] and
//! checks the exact CLI invocations, workspace reuse across retries, and the
//! mapping of terraform error text onto backend error variants.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only assertions are permitted."
)]

use std::collections::BTreeMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;

use provision_gate_config::EndpointConfig;
use provision_gate_core::BackendAdapter;
use provision_gate_core::BackendError;
use provision_gate_core::BackendHandle;
use provision_gate_core::Check;
use provision_gate_core::Configuration;
use provision_gate_core::ControllerConfig;
use provision_gate_core::Expected;
use provision_gate_core::InspectError;
use provision_gate_core::LifecycleController;
use provision_gate_core::RegionChoice;
use provision_gate_core::ResourceInspector;
use provision_gate_core::ResourceRef;
use provision_gate_core::RetryPolicy;
use provision_gate_core::TestPlan;
use provision_gate_terraform::CommandOutput;
use provision_gate_terraform::CommandRunner;
use provision_gate_terraform::CommandSpec;
use provision_gate_terraform::TerraformBackend;
use provision_gate_terraform::TerraformError;
use provision_gate_terraform::classify_failure;

// ============================================================================
// SECTION: Scripted Runner
// ============================================================================

type Scripted = Result<CommandOutput, TerraformError>;

#[derive(Default)]
struct RunnerState {
    calls: Vec<CommandSpec>,
    script: BTreeMap<String, VecDeque<Scripted>>,
}

/// Runner answering per subcommand; unscripted commands succeed silently.
#[derive(Clone, Default)]
struct ScriptedRunner {
    state: Arc<Mutex<RunnerState>>,
}

impl ScriptedRunner {
    fn on(self, subcommand: &str, result: Scripted) -> Self {
        self.state
            .lock()
            .unwrap()
            .script
            .entry(subcommand.to_string())
            .or_default()
            .push_back(result);
        self
    }

    fn calls(&self) -> Vec<CommandSpec> {
        self.state.lock().unwrap().calls.clone()
    }

    fn subcommands(&self) -> Vec<String> {
        self.calls()
            .iter()
            .map(|spec| {
                let words = if spec.subcommand() == Some("workspace") { 2 } else { 1 };
                spec.args[.. words].join(" ")
            })
            .collect()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, TerraformError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(spec.clone());
        let key = spec.subcommand().unwrap_or_default().to_string();
        state
            .script
            .get_mut(&key)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Ok(CommandOutput::ok("")))
    }
}

fn backend(runner: &ScriptedRunner) -> TerraformBackend<ScriptedRunner> {
    TerraformBackend::with_runner("terraform", "fixtures/s3-bucket", runner.clone())
}

fn bucket_config() -> Configuration {
    let mut builder = Configuration::builder();
    builder.insert("name", "bucket-abc").unwrap();
    builder.insert("versioning", true).unwrap();
    builder.insert("region", "us-west-2").unwrap();
    builder.build()
}

// ============================================================================
// SECTION: Apply
// ============================================================================

#[test]
fn apply_runs_init_workspace_and_apply_with_vars() {
    let runner = ScriptedRunner::default();
    let endpoint = EndpointConfig {
        url: Some("http://localhost:5000".to_string()),
        access_key_id: Some("dummy".to_string()),
        secret_access_key: Some("dummy".to_string()),
        force_path_style: true,
    };
    let backend = backend(&runner).with_endpoint(&endpoint);

    let handle = backend.apply(&bucket_config()).unwrap();

    assert!(handle.as_str().starts_with("pg-"));
    assert_eq!(runner.subcommands(), vec!["init", "workspace new", "apply"]);
    let calls = runner.calls();
    assert_eq!(calls[0].args, vec!["init", "-input=false"]);
    assert_eq!(calls[1].args.last().map(String::as_str), Some(handle.as_str()));
    assert_eq!(
        calls[2].args,
        vec![
            "apply",
            "-input=false",
            "-auto-approve",
            "-no-color",
            "-var",
            "name=bucket-abc",
            "-var",
            "region=us-west-2",
            "-var",
            "versioning=true",
        ]
    );
    assert_eq!(calls[2].env_value("TF_WORKSPACE"), Some(handle.as_str()));
    assert_eq!(calls[2].env_value("AWS_ENDPOINT_URL"), Some("http://localhost:5000"));
    assert_eq!(calls[2].env_value("AWS_ACCESS_KEY_ID"), Some("dummy"));
    assert_eq!(calls[2].env_value("TF_IN_AUTOMATION"), Some("1"));
    assert!(calls[0].env_value("TF_WORKSPACE").is_none());
    assert!(calls.iter().all(|spec| spec.cwd.ends_with("fixtures/s3-bucket")));
}

#[test]
fn failed_apply_step_returns_partial_handle_and_retry_reuses_it() {
    let runner = ScriptedRunner::default()
        .on("apply", Ok(CommandOutput::failed("Error: Throttling: Rate exceeded")));
    let backend = backend(&runner);

    let failure = backend.apply(&bucket_config()).unwrap_err();
    let partial = failure.handle.clone().expect("partial handle");
    assert_eq!(failure.error, BackendError::Backend("Error: Throttling: Rate exceeded".to_string()));

    let handle = backend.apply(&bucket_config()).unwrap();
    assert_eq!(handle, partial);
    assert_eq!(
        runner.subcommands(),
        vec!["init", "workspace new", "apply", "init", "apply"]
    );
}

#[test]
fn init_failure_is_clean() {
    let runner = ScriptedRunner::default().on(
        "init",
        Ok(CommandOutput::failed("Error: Failed to query available provider packages")),
    );
    let failure = backend(&runner).apply(&bucket_config()).unwrap_err();
    assert!(failure.handle.is_none());
    assert!(matches!(failure.error, BackendError::Backend(_)));
    assert_eq!(runner.subcommands(), vec!["init"]);
}

#[test]
fn undeclared_variable_is_a_clean_configuration_error() {
    let runner = ScriptedRunner::default().on(
        "apply",
        Ok(CommandOutput::failed(
            "Error: Value for undeclared variable\n\nA variable named \"bogus\" was assigned",
        )),
    );
    let failure = backend(&runner).apply(&bucket_config()).unwrap_err();
    assert!(failure.handle.is_none());
    assert!(matches!(failure.error, BackendError::Configuration(_)));
}

#[test]
fn missing_binary_is_a_configuration_error() {
    let runner = ScriptedRunner::default().on(
        "init",
        Err(TerraformError::Spawn {
            program: "terraform".to_string(),
            reason: "No such file or directory".to_string(),
        }),
    );
    let failure = backend(&runner).apply(&bucket_config()).unwrap_err();
    assert!(matches!(failure.error, BackendError::Configuration(ref text) if text.contains("terraform")));
}

// ============================================================================
// SECTION: Output and Destroy
// ============================================================================

#[test]
fn output_unquotes_json_strings() {
    let runner = ScriptedRunner::default().on("output", Ok(CommandOutput::ok("\"bucket-abc\"\n")));
    let backend = backend(&runner);
    let handle = backend.apply(&bucket_config()).unwrap();

    assert_eq!(backend.output(&handle, "bucket_id").unwrap(), "bucket-abc");
    let call = runner.calls().pop().unwrap();
    assert_eq!(call.args, vec!["output", "-no-color", "-json", "bucket_id"]);
    assert_eq!(call.env_value("TF_WORKSPACE"), Some(handle.as_str()));
}

#[test]
fn missing_output_is_not_found() {
    let runner = ScriptedRunner::default().on(
        "output",
        Ok(CommandOutput::failed("Error: Output \"bucket_arn\" not found")),
    );
    let backend = backend(&runner);
    let handle = backend.apply(&bucket_config()).unwrap();
    assert_eq!(
        backend.output(&handle, "bucket_arn"),
        Err(BackendError::NotFound {
            key: "bucket_arn".to_string()
        })
    );
}

#[test]
fn destroy_reuses_vars_and_workspace_and_is_idempotent() {
    let runner = ScriptedRunner::default();
    let backend = backend(&runner);
    let handle = backend.apply(&bucket_config()).unwrap();

    backend.destroy(&handle).unwrap();
    backend.destroy(&handle).unwrap();

    let destroys: Vec<CommandSpec> =
        runner.calls().into_iter().filter(|spec| spec.subcommand() == Some("destroy")).collect();
    assert_eq!(destroys.len(), 1);
    assert_eq!(destroys[0].args[.. 4], ["destroy", "-auto-approve", "-input=false", "-no-color"]);
    assert!(destroys[0].args.contains(&"name=bucket-abc".to_string()));
    assert_eq!(destroys[0].env_value("TF_WORKSPACE"), Some(handle.as_str()));
}

#[test]
fn failed_destroy_keeps_workspace_for_another_attempt() {
    let runner = ScriptedRunner::default()
        .on("destroy", Ok(CommandOutput::failed("Error: deleting S3 Bucket: RequestTimeout")));
    let backend = backend(&runner);
    let handle = backend.apply(&bucket_config()).unwrap();

    assert!(backend.destroy(&handle).is_err());
    backend.destroy(&handle).unwrap();
    backend.destroy(&handle).unwrap();

    let destroys = runner.calls().iter().filter(|spec| spec.subcommand() == Some("destroy")).count();
    assert_eq!(destroys, 2);
}

#[test]
fn destroyed_configuration_gets_a_fresh_workspace() {
    let runner = ScriptedRunner::default();
    let backend = backend(&runner);
    let first = backend.apply(&bucket_config()).unwrap();
    backend.destroy(&first).unwrap();

    let second = backend.apply(&bucket_config()).unwrap();

    assert_ne!(first, second);
    assert_eq!(
        runner.subcommands(),
        vec!["init", "workspace new", "apply", "destroy", "init", "workspace new", "apply"]
    );
}

#[test]
fn workspace_creation_failure_is_clean() {
    let runner = ScriptedRunner::default()
        .on("workspace", Ok(CommandOutput::failed("Error: registry service is unreachable")));
    let backend = backend(&runner);
    assert!(backend.apply(&bucket_config()).unwrap_err().handle.is_none());
    assert_eq!(runner.calls().len(), 2);
}

#[test]
fn destroy_of_unknown_handle_fails() {
    let runner = ScriptedRunner::default();
    let result = backend(&runner).destroy(&BackendHandle::new("pg-unknown"));
    assert!(matches!(result, Err(BackendError::Configuration(_))));
    assert!(runner.calls().is_empty());
}

#[test]
fn permission_errors_are_classified() {
    assert!(matches!(
        classify_failure("Error: creating S3 Bucket: AccessDenied: Access Denied"),
        BackendError::PermissionDenied(_)
    ));
    assert!(matches!(classify_failure("Error: something odd"), BackendError::Backend(_)));
}

// ============================================================================
// SECTION: Lifecycle
// ============================================================================

struct StaticInspector;

impl ResourceInspector for StaticInspector {
    fn get_attribute(&self, resource: &ResourceRef, attribute: &str) -> Result<String, InspectError> {
        match attribute {
            "versioning" => Ok("Enabled".to_string()),
            "bucket" => Ok(resource.id().to_string()),
            _ => Err(InspectError::unavailable(attribute, "unsupported")),
        }
    }
}

#[test]
fn lifecycle_destroys_terraform_workspace_after_failed_assertion() {
    let runner = ScriptedRunner::default().on("output", Ok(CommandOutput::ok("\"bucket-abc\"")));
    let plan = TestPlan::new("bucket", "Automated Testing")
        .region(RegionChoice::Pinned("us-west-2".to_string()))
        .region_param("region")
        .param("name", "bucket-abc")
        .resource_output("bucket_id")
        .check(Check::attribute("bucket", Expected::equals("{resource_id}"), "bucket exists"))
        .check(Check::attribute("versioning", Expected::equals("Suspended"), "versioning suspended"));
    let config = ControllerConfig {
        retry: RetryPolicy::no_retry(),
        deadline: None,
    };
    let report = LifecycleController::new(backend(&runner), StaticInspector, config).run(&plan);

    assert_eq!(report.passed_assertions(), 1);
    assert_eq!(report.failed_assertions(), 1);
    assert_eq!(
        runner.subcommands(),
        vec!["init", "workspace new", "apply", "output", "destroy"]
    );
}
