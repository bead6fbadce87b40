// system-tests/tests/helpers/infra.rs
// ============================================================================
// Module: System Test Infrastructure
// Description: Mock S3 endpoint fixture for provisioning system-tests.
// Purpose: Give terraform and the inspector an isolated S3 API to talk to.
// Dependencies: testcontainers, aws-sdk-s3, provision-gate-config
// ============================================================================

//! ## Overview
//! [`MockEndpoint`] either reuses an endpoint named by
//! `PROVISION_GATE_SYSTEM_TEST_ENDPOINT` or starts a moto server container.
//! Credentials are dummies; moto accepts any key pair.

use aws_config::BehaviorVersion;
use aws_config::Region;
use aws_sdk_s3::Client;
use provision_gate_config::EndpointConfig;
use system_tests::config::SystemTestConfig;
use testcontainers::ContainerAsync;
use testcontainers::GenericImage;
use testcontainers::core::IntoContainerPort;
use testcontainers::core::WaitFor;
use testcontainers::runners::AsyncRunner;

/// Port moto listens on inside the container.
const MOTO_PORT: u16 = 5000;
/// Dummy credential value.
const DUMMY_CREDENTIAL: &str = "dummy";

pub struct MockEndpoint {
    pub url: String,
    _container: Option<ContainerAsync<GenericImage>>,
}

impl MockEndpoint {
    pub async fn start(config: &SystemTestConfig) -> Result<Self, String> {
        if let Some(url) = &config.mock_endpoint {
            return Ok(Self {
                url: url.clone(),
                _container: None,
            });
        }

        ensure_docker_available()?;
        let container = GenericImage::new("motoserver/moto", "latest")
            .with_exposed_port(MOTO_PORT.tcp())
            .with_wait_for(WaitFor::message_on_stderr("Running on"))
            .start()
            .await
            .map_err(|err| format!("failed to start moto container: {err}"))?;
        let port = container
            .get_host_port_ipv4(MOTO_PORT.tcp())
            .await
            .map_err(|err| format!("failed to resolve moto port: {err}"))?;
        Ok(Self {
            url: format!("http://127.0.0.1:{port}"),
            _container: Some(container),
        })
    }

    /// Endpoint settings shared by the backend and the inspector.
    pub fn endpoint_config(&self) -> EndpointConfig {
        EndpointConfig {
            url: Some(self.url.clone()),
            access_key_id: Some(DUMMY_CREDENTIAL.to_string()),
            secret_access_key: Some(DUMMY_CREDENTIAL.to_string()),
            force_path_style: true,
        }
    }

    /// Independent client for verifying state outside the harness.
    pub async fn client(&self, region: &str) -> Client {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .endpoint_url(self.url.clone())
            .credentials_provider(aws_sdk_s3::config::Credentials::new(
                DUMMY_CREDENTIAL,
                DUMMY_CREDENTIAL,
                None,
                None,
                "system-tests",
            ))
            .load()
            .await;
        let builder = aws_sdk_s3::config::Builder::from(&config).force_path_style(true);
        Client::from_conf(builder.build())
    }

    /// Names of every bucket currently known to the endpoint.
    pub async fn bucket_names(&self, region: &str) -> Result<Vec<String>, String> {
        let output = self
            .client(region)
            .await
            .list_buckets()
            .send()
            .await
            .map_err(|err| format!("list buckets failed: {err}"))?;
        Ok(output.buckets().iter().filter_map(|bucket| bucket.name().map(str::to_string)).collect())
    }
}

pub fn ensure_docker_available() -> Result<(), String> {
    ensure_command_runs("docker", &["info"])
}

pub fn ensure_terraform_available(binary: &str) -> Result<(), String> {
    ensure_command_runs(binary, &["version"])
}

fn ensure_command_runs(program: &str, args: &[&str]) -> Result<(), String> {
    let output = std::process::Command::new(program)
        .args(args)
        .output()
        .map_err(|err| format!("{program} {} failed: {err}", args.join(" ")))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!("{program} {} failed: {stderr}", args.join(" ")));
    }
    Ok(())
}
