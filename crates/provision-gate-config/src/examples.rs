// crates/provision-gate-config/src/examples.rs
// ============================================================================
// Module: Config Examples
// Description: Canonical example configuration payload.
// Purpose: Deterministic example for docs and tooling.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Canonical example `provision-gate.toml`. Kept loadable by the config
//! tests so it never drifts from the model.

/// Returns a canonical example `provision-gate.toml` configuration.
#[must_use]
pub fn config_toml_example() -> String {
    String::from(
        r#"[endpoint]
url = "http://localhost:5000"
access_key_id = "dummy"
secret_access_key = "dummy"
force_path_style = true

[retry]
max_attempts = 3
initial_backoff_ms = 5000
max_backoff_ms = 60000

[retry.retryable_errors]
".*SlowDown.*" = "Object store asked the client to slow down."

[run]
deadline_secs = 900
forbidden_regions = ["ap-northeast-3"]

[terraform]
binary = "terraform"
working_dir = "fixtures/s3-bucket"
"#,
    )
}
