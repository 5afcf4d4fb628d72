//! E2E CLI tests for the commands that change grouping:
//! - `regroup unmerge` success, refusal, unknown or locked fingerprints
//! - `regroup merge` success with a reported parent, missing project, unknown ids
//!
//! Progress messages share stderr with errors, so failures are matched as text.

mod support;

use predicates::str::contains;
use serde_json::{Value, json};
use support::{Reply, StubServer, merged_page, regroup_cmd, similar_page};
use tempfile::TempDir;

fn merged_stub(delete: Reply) -> StubServer {
    StubServer::start(vec![
        ("GET /issues/1/hashes/", Reply::json(200, &merged_page())),
        ("DELETE /issues/1/hashes/", delete),
    ])
}

fn similar_stub(put: Reply) -> StubServer {
    StubServer::start(vec![
        ("GET /issues/1/similar/", Reply::json(200, &similar_page())),
        ("PUT /projects/acme/web/issues/", put),
    ])
}

#[test]
fn unmerge_queues_selected_fingerprint() {
    let dir = TempDir::new().expect("tempdir");
    let server = merged_stub(Reply::empty(202));

    let output = regroup_cmd(dir.path())
        .args(["--api-url", &server.base_url, "unmerge", "1", "f1", "--format", "json"])
        .output()
        .expect("run");
    assert!(
        output.status.success(),
        "unmerge failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let json: Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(json["queued"], true);
    assert_eq!(json["fingerprints"], json!(["f1"]));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Unmerging events"));
    assert!(stderr.contains("Events successfully queued for unmerging."));

    let deletes = server.requests_with("DELETE");
    assert_eq!(deletes.len(), 1);
    assert_eq!(deletes[0].query_values("id"), vec!["f1"]);
}

#[test]
fn unmerge_quiet_keeps_stderr_clean() {
    let dir = TempDir::new().expect("tempdir");
    let server = merged_stub(Reply::empty(202));

    regroup_cmd(dir.path())
        .args(["--api-url", &server.base_url, "-q", "unmerge", "1", "f2"])
        .args(["--format", "text"])
        .assert()
        .success()
        .stdout("queued  f2\n")
        .stderr("");
}

#[test]
fn unmerge_of_every_selectable_fingerprint_is_refused() {
    let dir = TempDir::new().expect("tempdir");
    let server = merged_stub(Reply::empty(202));

    // f3 is locked, so f1 and f2 are everything that could move
    regroup_cmd(dir.path())
        .args(["--api-url", &server.base_url, "unmerge", "1", "f1", "f2"])
        .args(["--format", "text"])
        .assert()
        .failure()
        .stderr(contains("unmerge all"));

    assert!(server.requests_with("DELETE").is_empty());
}

#[test]
fn unmerge_rejects_locked_and_unknown_fingerprints() {
    let dir = TempDir::new().expect("tempdir");
    let server = merged_stub(Reply::empty(202));

    for fingerprint in ["f3", "nope"] {
        regroup_cmd(dir.path())
            .args(["--api-url", &server.base_url, "unmerge", "1", fingerprint])
            .args(["--format", "text"])
            .assert()
            .failure()
            .stderr(contains(fingerprint));
    }

    assert!(server.requests_with("DELETE").is_empty());
}

#[test]
fn unmerge_request_failure_is_reported() {
    let dir = TempDir::new().expect("tempdir");
    let server = merged_stub(Reply::json(500, &json!({"detail": "queue down"})));

    regroup_cmd(dir.path())
        .args(["--api-url", &server.base_url, "unmerge", "1", "f1"])
        .args(["--format", "text"])
        .assert()
        .failure()
        .stderr(contains("Unable to queue events for unmerging."))
        .stderr(contains("unmerge request failed"));
}

#[test]
fn merge_sends_selection_and_reports_parent() {
    let dir = TempDir::new().expect("tempdir");
    let server = similar_stub(Reply::json(200, &json!({"merge": {"parent": "1"}})));

    let output = regroup_cmd(dir.path())
        .args(["--api-url", &server.base_url, "--org", "acme", "--project", "web"])
        .args(["merge", "1", "2", "3", "--format", "json"])
        .output()
        .expect("run");
    assert!(
        output.status.success(),
        "merge failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let json: Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(json["merged"], json!(["2", "3"]));
    assert_eq!(json["parent"], "1");

    let puts = server.requests_with("PUT");
    assert_eq!(puts.len(), 1);
    assert_eq!(puts[0].query_values("id"), vec!["2", "3", "1"]);
    let body: Value = serde_json::from_str(&puts[0].body).expect("body json");
    assert_eq!(body, json!({"merge": 1}));
}

#[test]
fn merge_without_parent_still_succeeds() {
    let dir = TempDir::new().expect("tempdir");
    let server = similar_stub(Reply::empty(204));

    regroup_cmd(dir.path())
        .env("REGROUP_ORG", "acme")
        .env("REGROUP_PROJECT", "web")
        .args(["--api-url", &server.base_url, "merge", "1", "2", "--format", "text"])
        .assert()
        .success()
        .stdout("merged  2\n");
}

#[test]
fn merge_needs_a_project_before_any_request() {
    let dir = TempDir::new().expect("tempdir");
    let server = similar_stub(Reply::empty(204));

    regroup_cmd(dir.path())
        .args(["--api-url", &server.base_url, "--org", "acme"])
        .args(["merge", "1", "2", "--format", "text"])
        .assert()
        .failure()
        .stderr(contains("Project not configured"));

    assert!(server.requests().is_empty());
}

#[test]
fn merge_rejects_ids_not_listed_as_similar() {
    let dir = TempDir::new().expect("tempdir");
    let server = similar_stub(Reply::empty(204));

    regroup_cmd(dir.path())
        .args(["--api-url", &server.base_url, "--org", "acme", "--project", "web"])
        .args(["merge", "1", "99", "--format", "text"])
        .assert()
        .failure()
        .stderr(contains("99"));

    assert!(server.requests_with("PUT").is_empty());
}

#[test]
fn merge_failure_is_reported() {
    let dir = TempDir::new().expect("tempdir");
    let server = similar_stub(Reply::json(403, &json!({"detail": "forbidden"})));

    regroup_cmd(dir.path())
        .args(["--api-url", &server.base_url, "--org", "acme", "--project", "web"])
        .args(["merge", "1", "2", "--format", "text"])
        .assert()
        .failure()
        .stderr(contains("merge request failed"));
}
