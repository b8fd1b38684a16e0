//! Local invocations through the binary.
//!
//! Every case here fails or finishes before any network call, so the tests
//! run without AWS or Salesforce access.

mod common;

use common::{invoke, relay_command};

#[test]
fn trigger_without_target_reports_error() {
    let result = invoke("trigger", &serde_json::json!({"release": "R2"}), &[]);

    assert!(result.success, "stderr: {}", result.stderr);
    assert_eq!(
        result.stdout_json(),
        serde_json::json!({"error": "Configuration error, Metaman State Machine ARN not found."})
    );
}

#[test]
fn trigger_with_blank_target_reports_error() {
    let result = invoke(
        "trigger",
        &serde_json::json!({}),
        &[("METAMAN_STATE_MACHINE_ARN", "   ")],
    );

    assert!(result.success, "stderr: {}", result.stderr);
    assert!(result.stdout_json()["error"]
        .as_str()
        .is_some_and(|error| error.contains("State Machine ARN not found")));
}

#[test]
fn completed_without_key_fails_validation() {
    let result = invoke(
        "status-relay",
        &serde_json::json!({
            "status": "COMPLETED",
            "metadata_diff_id": "a001",
            "s3_bucket": "b",
        }),
        &[],
    );

    assert!(!result.success);
    assert!(result.stdout.trim().is_empty());
    assert!(
        result
            .stderr
            .contains("Missing S3 bucket or key information."),
        "stderr: {}",
        result.stderr
    );
}

#[test]
fn status_relay_without_credentials_fails_before_dispatch() {
    let result = invoke(
        "status-relay",
        &serde_json::json!({"status": "IN-PROGRESS", "metadata_diff_id": "a003"}),
        &[],
    );

    assert!(!result.success);
    assert!(result.stderr.contains("PLM_CREDS"), "stderr: {}", result.stderr);
}

#[test]
fn malformed_sandbox_instance_is_rejected() {
    let creds = serde_json::json!({
        "instance_url": "acme.my.salesforce.com",
        "access_token": "token",
    });
    let encoded = serde_json::to_string(&creds.to_string()).unwrap();
    let result = invoke(
        "status-relay",
        &serde_json::json!({"status": "FAILED", "metadata_diff_id": "a002"}),
        &[("PLM_IS_SANDBOX", "TRUE"), ("PLM_CREDS", encoded.as_str())],
    );

    assert!(!result.success);
    assert!(
        result.stderr.contains("has no http(s) scheme"),
        "stderr: {}",
        result.stderr
    );
    assert!(!result.stderr.contains("token\""));
}

#[test]
fn diff_file_name_prints_name() {
    let output = relay_command()
        .args([
            "diff-file-name",
            "--old-release",
            "Spring 24",
            "--new-release",
            "Summer 24",
            "--diff-type",
            "data-model",
        ])
        .output()
        .expect("run metaman-relay");

    assert!(output.status.success());
    let name = String::from_utf8_lossy(&output.stdout);
    let pattern = regex::Regex::new(r"^Spring24-Summer24-data-model-\d{2}:\d{2}UTC\.xlsx$").unwrap();
    assert!(pattern.is_match(name.trim()), "name: {name}");
}

#[test]
fn unknown_function_is_a_usage_error() {
    let output = relay_command()
        .args(["invoke", "reporter", "--event", "-"])
        .output()
        .expect("run metaman-relay");
    assert!(!output.status.success());
}
