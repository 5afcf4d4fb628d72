//! E2E CLI tests for the read commands:
//! - `regroup merged` listing, paging cursor, and auth header
//! - `regroup similar` threshold filtering and `--all`
//! - `regroup config` output
//! - error reporting for failed fetches and missing settings
//!
//! Each test runs the binary against an in-process HTTP stub.

mod support;

use serde_json::Value;
use support::{Reply, StubServer, merged_page, regroup_cmd, similar_page};
use tempfile::TempDir;

const NEXT_LINK: &str = "<http://stub/?cursor=0:0:1>; rel=\"previous\"; results=\"false\"; cursor=\"0:0:1\", \
                         <http://stub/?cursor=0:50:0>; rel=\"next\"; results=\"true\"; cursor=\"0:50:0\"";

fn stdout_json(output: &std::process::Output) -> Value {
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

fn stderr_json(output: &std::process::Output) -> Value {
    assert!(!output.status.success(), "command should fail");
    serde_json::from_slice(&output.stderr).expect("stderr should be JSON")
}

#[test]
fn merged_lists_fingerprints_with_cursor() {
    let dir = TempDir::new().expect("tempdir");
    let server = StubServer::start(vec![(
        "GET /issues/1/hashes/",
        Reply::json(200, &merged_page()).with_link(NEXT_LINK),
    )]);

    let output = regroup_cmd(dir.path())
        .args(["--api-url", &server.base_url, "merged", "1", "--format", "json"])
        .output()
        .expect("run");
    let json = stdout_json(&output);

    assert_eq!(json["group_id"], "1");
    assert_eq!(json["count"], 3);
    assert_eq!(json["fingerprints"][0]["id"], "f1");
    assert_eq!(json["fingerprints"][0]["event_count"], 12);
    assert_eq!(json["fingerprints"][0]["latest_event_id"], "e1");
    assert_eq!(json["fingerprints"][0]["locked"], false);
    assert_eq!(json["fingerprints"][2]["locked"], true);
    assert_eq!(json["next_cursor"], "0:50:0");

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].query_values("limit"), vec!["50"]);
}

#[test]
fn merged_sends_bearer_token_and_limit() {
    let dir = TempDir::new().expect("tempdir");
    let server = StubServer::start(vec![(
        "GET /issues/1/hashes/",
        Reply::json(200, &merged_page()),
    )]);

    regroup_cmd(dir.path())
        .env("REGROUP_API_URL", &server.base_url)
        .env("REGROUP_AUTH_TOKEN", "tok-123")
        .args(["merged", "1", "--limit", "5", "--format", "text"])
        .assert()
        .success()
        .stdout(predicates::str::contains("f2  3  -  e2  open"));

    let requests = server.requests();
    assert_eq!(requests[0].authorization.as_deref(), Some("Bearer tok-123"));
    assert_eq!(requests[0].query_values("limit"), vec!["5"]);
}

#[test]
fn similar_hides_issues_below_threshold() {
    let dir = TempDir::new().expect("tempdir");
    let server = StubServer::start(vec![(
        "GET /issues/1/similar/",
        Reply::json(200, &similar_page()),
    )]);

    let output = regroup_cmd(dir.path())
        .args(["--api-url", &server.base_url, "similar", "1", "--format", "json"])
        .output()
        .expect("run");
    let json = stdout_json(&output);

    let issues = json["issues"].as_array().expect("issues array");
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0]["id"], "2");
    assert_eq!(issues[0]["short_id"], "WEB-2");
    assert_eq!(issues[0]["below_threshold"], false);
    assert_eq!(issues[0]["aggregate"]["message"], Value::Null);
    assert_eq!(json["hidden"], 1);

    let requests = server.requests();
    assert_eq!(requests[0].query_values("version"), vec!["1"]);
}

#[test]
fn similar_all_includes_low_scores() {
    let dir = TempDir::new().expect("tempdir");
    let server = StubServer::start(vec![(
        "GET /issues/1/similar/",
        Reply::json(200, &similar_page()),
    )]);

    let output = regroup_cmd(dir.path())
        .args(["--api-url", &server.base_url, "similar", "1", "--all", "--format", "json"])
        .output()
        .expect("run");
    let json = stdout_json(&output);

    let ids: Vec<&str> = json["issues"]
        .as_array()
        .expect("issues array")
        .iter()
        .filter_map(|issue| issue["id"].as_str())
        .collect();
    assert_eq!(ids, vec!["2", "3"]);
    assert_eq!(json["issues"][1]["below_threshold"], true);
    assert_eq!(json["hidden"], 0);
}

#[test]
fn fetch_failure_exits_nonzero_with_code() {
    let dir = TempDir::new().expect("tempdir");
    let server = StubServer::start(vec![(
        "GET /issues/1/hashes/",
        Reply::json(500, &serde_json::json!({"detail": "boom"})),
    )]);

    let output = regroup_cmd(dir.path())
        .args(["--api-url", &server.base_url, "merged", "1", "--format", "json"])
        .output()
        .expect("run");
    let json = stderr_json(&output);

    assert_eq!(json["error"]["error_code"], "E4001");
    assert!(output.stdout.is_empty());
}

#[test]
fn missing_api_url_suggests_flag() {
    let dir = TempDir::new().expect("tempdir");

    regroup_cmd(dir.path())
        .args(["merged", "1", "--format", "text"])
        .assert()
        .failure()
        .stderr(predicates::str::contains("API base URL not configured"))
        .stderr(predicates::str::contains("Pass --api-url"));
}

#[test]
fn project_config_file_supplies_settings() {
    let dir = TempDir::new().expect("tempdir");
    let server = StubServer::start(vec![(
        "GET /issues/9/hashes/",
        Reply::json(200, &serde_json::json!([])),
    )]);
    std::fs::create_dir_all(dir.path().join(".regroup")).expect("mkdir");
    std::fs::write(
        dir.path().join(".regroup/config.toml"),
        format!(
            "[api]\nbase_url = \"{}\"\n\n[grouping]\nmerged_limit = 20\n",
            server.base_url
        ),
    )
    .expect("write config");

    let output = regroup_cmd(dir.path())
        .args(["merged", "9", "--format", "json"])
        .output()
        .expect("run");
    let json = stdout_json(&output);

    assert_eq!(json["count"], 0);
    assert_eq!(server.requests()[0].query_values("limit"), vec!["20"]);
}

#[test]
fn broken_config_file_is_reported() {
    let dir = TempDir::new().expect("tempdir");
    std::fs::create_dir_all(dir.path().join(".regroup")).expect("mkdir");
    std::fs::write(dir.path().join(".regroup/config.toml"), "[api\nbase_url =").expect("write");

    let output = regroup_cmd(dir.path())
        .args(["config", "--format", "json"])
        .output()
        .expect("run");
    let json = stderr_json(&output);

    assert_eq!(json["error"]["error_code"], "E1002");
}

#[test]
fn config_reports_token_presence_only() {
    let dir = TempDir::new().expect("tempdir");

    let output = regroup_cmd(dir.path())
        .env("REGROUP_AUTH_TOKEN", "very-secret")
        .env("REGROUP_ORG", "acme")
        .args(["--api-url", "http://localhost:9/api/0/", "config", "--format", "json"])
        .output()
        .expect("run");
    let json = stdout_json(&output);

    assert_eq!(json["base_url"], "http://localhost:9/api/0");
    assert_eq!(json["organization"], "acme");
    assert_eq!(json["has_auth_token"], true);
    assert!(!String::from_utf8_lossy(&output.stdout).contains("very-secret"));
}
