// crates/provision-gate-aws/src/inspector.rs
// ============================================================================
// Module: S3 Resource Inspector
// Description: Read-only S3 bucket attribute lookups.
// Purpose: Let validation steps observe live bucket configuration.
// Dependencies: aws-config, aws-sdk-s3, provision-gate-config, provision-gate-core, tokio
// ============================================================================

//! ## Overview
//! [`S3Inspector`] answers attribute queries for a provisioned bucket. The
//! bucket name is the resource id reported by the backend and the region is
//! the run's region. Calls go through [`BucketApi`]; [`SdkBucketApi`] is the
//! real implementation, which keeps one S3 client per region and drives the
//! async SDK from synchronous callers on an owned runtime.
//!
//! Supported attributes:
//! - `versioning`: `Enabled`, `Suspended`, or empty when never configured
//! - `policy`: bucket policy JSON
//! - `policy_exists`: `true` or `false`
//! - `logging_target`: access log target bucket
//! - `logging_prefix`: access log key prefix

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::Mutex;

use aws_config::BehaviorVersion;
use aws_config::Region;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::error::ProvideErrorMetadata;
use provision_gate_config::EndpointConfig;
use provision_gate_core::InspectError;
use provision_gate_core::ResourceInspector;
use provision_gate_core::ResourceRef;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::runtime::Runtime;
use tokio::runtime::RuntimeFlavor;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// S3 lookup errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum S3InspectError {
    /// Invalid input or client configuration.
    #[error("s3 inspector invalid: {0}")]
    Invalid(String),
    /// Runtime or thread failure.
    #[error("s3 inspector io error: {0}")]
    Io(String),
    /// The API returned an error.
    #[error("s3 api error: {0}")]
    Backend(String),
}

/// Bucket access logging settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketLogging {
    /// Bucket receiving access logs.
    pub target_bucket: String,
    /// Key prefix for access log objects.
    pub target_prefix: String,
}

// ============================================================================
// SECTION: Bucket API
// ============================================================================

/// Minimal bucket read API used by the inspector.
pub trait BucketApi: Send + Sync {
    /// Versioning status; empty when never configured.
    ///
    /// # Errors
    ///
    /// Returns [`S3InspectError`] when the lookup fails.
    fn versioning(&self, region: &str, bucket: &str) -> Result<String, S3InspectError>;

    /// Bucket policy document, or `None` when no policy is attached.
    ///
    /// # Errors
    ///
    /// Returns [`S3InspectError`] when the lookup fails.
    fn policy(&self, region: &str, bucket: &str) -> Result<Option<String>, S3InspectError>;

    /// Access logging settings, or `None` when logging is disabled.
    ///
    /// # Errors
    ///
    /// Returns [`S3InspectError`] when the lookup fails.
    fn logging(&self, region: &str, bucket: &str) -> Result<Option<BucketLogging>, S3InspectError>;
}

// ============================================================================
// SECTION: Inspector
// ============================================================================

/// Resource inspector for S3 buckets.
pub struct S3Inspector<A = SdkBucketApi> {
    /// Bucket API implementation.
    api: A,
}

impl S3Inspector<SdkBucketApi> {
    /// Creates an inspector talking to S3 (or the configured endpoint).
    ///
    /// # Errors
    ///
    /// Returns [`S3InspectError`] when the runtime cannot be created.
    pub fn new(endpoint: &EndpointConfig) -> Result<Self, S3InspectError> {
        Ok(Self::with_api(SdkBucketApi::new(endpoint)?))
    }
}

impl<A: BucketApi> S3Inspector<A> {
    /// Creates an inspector over a custom bucket API.
    #[must_use]
    pub const fn with_api(api: A) -> Self {
        Self {
            api,
        }
    }

    /// Resolves one attribute.
    fn lookup(&self, region: &str, bucket: &str, attribute: &str) -> Result<String, InspectError> {
        let unavailable = |err: S3InspectError| InspectError::unavailable(attribute, err.to_string());
        match attribute {
            "versioning" => self.api.versioning(region, bucket).map_err(unavailable),
            "policy" => self
                .api
                .policy(region, bucket)
                .map_err(unavailable)?
                .ok_or_else(|| InspectError::unavailable(attribute, "no bucket policy attached")),
            "policy_exists" => self
                .api
                .policy(region, bucket)
                .map(|policy| policy.is_some().to_string())
                .map_err(unavailable),
            "logging_target" | "logging_prefix" => {
                let logging = self
                    .api
                    .logging(region, bucket)
                    .map_err(unavailable)?
                    .ok_or_else(|| InspectError::unavailable(attribute, "access logging disabled"))?;
                Ok(if attribute == "logging_target" {
                    logging.target_bucket
                } else {
                    logging.target_prefix
                })
            }
            _ => Err(InspectError::unavailable(attribute, "unsupported s3 attribute")),
        }
    }
}

impl<A: BucketApi> ResourceInspector for S3Inspector<A> {
    fn get_attribute(&self, resource: &ResourceRef, attribute: &str) -> Result<String, InspectError> {
        let bucket = resource.id();
        if bucket.trim().is_empty() {
            return Err(InspectError::unavailable(attribute, "empty bucket name"));
        }
        self.lookup(&resource.region, bucket, attribute)
    }
}

// ============================================================================
// SECTION: Runtime Helpers
// ============================================================================

/// Blocks on an S3 future using a compatible runtime.
fn block_on_with_runtime<F, T>(runtime: &Runtime, future: F) -> Result<T, S3InspectError>
where
    F: Future<Output = Result<T, S3InspectError>> + Send + 'static,
    T: Send + 'static,
{
    if let Ok(handle) = Handle::try_current() {
        if matches!(handle.runtime_flavor(), RuntimeFlavor::MultiThread) {
            return tokio::task::block_in_place(|| handle.block_on(future));
        }
        let (tx, rx) = std::sync::mpsc::sync_channel(1);
        std::thread::spawn(move || {
            let result = Runtime::new()
                .map_err(|err| S3InspectError::Io(err.to_string()))
                .and_then(|runtime| runtime.block_on(future));
            let _ = tx.send(result);
        });
        return rx
            .recv()
            .unwrap_or_else(|_| Err(S3InspectError::Io("s3 inspector thread join failed".to_string())));
    }

    runtime.block_on(future)
}

// ============================================================================
// SECTION: SDK Implementation
// ============================================================================

/// [`BucketApi`] backed by the AWS SDK.
pub struct SdkBucketApi {
    /// Endpoint override and credentials.
    endpoint: EndpointConfig,
    /// Clients by region.
    clients: Mutex<BTreeMap<String, Client>>,
    /// Tokio runtime for blocking S3 operations.
    runtime: Option<Arc<Runtime>>,
}

impl Drop for SdkBucketApi {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            let _ = std::thread::spawn(move || drop(runtime));
        }
    }
}

impl SdkBucketApi {
    /// Creates the API with its own runtime; clients are built per region on demand.
    ///
    /// # Errors
    ///
    /// Returns [`S3InspectError`] when the endpoint is invalid or the runtime fails.
    pub fn new(endpoint: &EndpointConfig) -> Result<Self, S3InspectError> {
        endpoint.validate().map_err(|err| S3InspectError::Invalid(err.to_string()))?;
        let runtime = Runtime::new().map_err(|err| S3InspectError::Io(err.to_string()))?;
        Ok(Self {
            endpoint: endpoint.clone(),
            clients: Mutex::new(BTreeMap::new()),
            runtime: Some(Arc::new(runtime)),
        })
    }

    /// Returns the runtime or an error if shut down.
    fn runtime(&self) -> Result<&Runtime, S3InspectError> {
        self.runtime
            .as_ref()
            .map(AsRef::as_ref)
            .ok_or_else(|| S3InspectError::Io("s3 inspector runtime closed".to_string()))
    }

    /// Returns the cached client for `region`, building it on first use.
    fn client(&self, region: &str) -> Result<Client, S3InspectError> {
        let mut clients =
            self.clients.lock().map_err(|_| S3InspectError::Io("client cache poisoned".to_string()))?;
        if let Some(client) = clients.get(region) {
            return Ok(client.clone());
        }
        let region_name = region.to_string();
        let url = self.endpoint.url.clone();
        let credentials = self
            .endpoint
            .credentials()
            .map(|(key, secret)| Credentials::new(key, secret, None, None, "provision-gate"));
        let shared_config = block_on_with_runtime(self.runtime()?, async move {
            let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(Region::new(region_name));
            if let Some(url) = url {
                loader = loader.endpoint_url(url);
            }
            if let Some(credentials) = credentials {
                loader = loader.credentials_provider(credentials);
            }
            Ok(loader.load().await)
        })?;
        let mut builder = aws_sdk_s3::config::Builder::from(&shared_config);
        if self.endpoint.force_path_style {
            builder = builder.force_path_style(true);
        }
        let client = Client::from_conf(builder.build());
        clients.insert(region.to_string(), client.clone());
        Ok(client)
    }
}

impl BucketApi for SdkBucketApi {
    fn versioning(&self, region: &str, bucket: &str) -> Result<String, S3InspectError> {
        let client = self.client(region)?;
        let bucket = bucket.to_string();
        block_on_with_runtime(self.runtime()?, async move {
            let output = client
                .get_bucket_versioning()
                .bucket(bucket)
                .send()
                .await
                .map_err(|err| S3InspectError::Backend(err.to_string()))?;
            Ok(output.status().map(|status| status.as_str().to_string()).unwrap_or_default())
        })
    }

    fn policy(&self, region: &str, bucket: &str) -> Result<Option<String>, S3InspectError> {
        let client = self.client(region)?;
        let bucket = bucket.to_string();
        block_on_with_runtime(self.runtime()?, async move {
            match client.get_bucket_policy().bucket(bucket).send().await {
                Ok(output) => Ok(output.policy().map(str::to_string)),
                Err(err)
                    if err.as_service_error().and_then(ProvideErrorMetadata::code)
                        == Some("NoSuchBucketPolicy") =>
                {
                    Ok(None)
                }
                Err(err) => Err(S3InspectError::Backend(err.to_string())),
            }
        })
    }

    fn logging(&self, region: &str, bucket: &str) -> Result<Option<BucketLogging>, S3InspectError> {
        let client = self.client(region)?;
        let bucket = bucket.to_string();
        block_on_with_runtime(self.runtime()?, async move {
            let output = client
                .get_bucket_logging()
                .bucket(bucket)
                .send()
                .await
                .map_err(|err| S3InspectError::Backend(err.to_string()))?;
            Ok(output.logging_enabled().map(|logging| BucketLogging {
                target_bucket: logging.target_bucket().to_string(),
                target_prefix: logging.target_prefix().to_string(),
            }))
        })
    }
}
