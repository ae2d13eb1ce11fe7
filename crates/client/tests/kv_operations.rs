//! HTTP contract tests for the KV operations against a mock store

use std::collections::BTreeMap;
use vaultkit_client::{AuthMethod, VaultClient, WriteMode};
use vaultkit_core::Error;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "hvs.test-session-token";

async fn logged_in_client(server: &MockServer) -> VaultClient {
    Mock::given(method("POST"))
        .and(path("/v1/auth/approle/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "auth": { "client_token": TOKEN }
        })))
        .mount(server)
        .await;

    let mut client = VaultClient::new(server.uri()).unwrap();
    client
        .login(&AuthMethod::app_role("deploy-role", "deploy-secret"))
        .await
        .unwrap();
    client
}

fn mapping(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

/// A KV v2 read response wrapping `data` at the given version
fn read_body(data: serde_json::Value, version: u64) -> serde_json::Value {
    serde_json::json!({
        "data": {
            "data": data,
            "metadata": { "version": version, "created_time": "2025-11-04T16:58:33.000Z" }
        }
    })
}

/// A KV v2 write response carrying only the new revision metadata
fn write_body(version: u64) -> serde_json::Value {
    serde_json::json!({
        "data": { "version": version, "created_time": "2025-11-05T09:00:00.000Z" }
    })
}

fn list_body(keys: &[&str]) -> serde_json::Value {
    serde_json::json!({ "data": { "keys": keys } })
}

// =============================================================================
// Reads
// =============================================================================

#[tokio::test]
async fn read_returns_bundle_with_revision_metadata() {
    let server = MockServer::start().await;
    let client = logged_in_client(&server).await;

    Mock::given(method("GET"))
        .and(path("/v1/kv/data/infra/app1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(read_body(
            serde_json::json!({ "svc_a": "pw1", "port": 8200 }),
            4,
        )))
        .mount(&server)
        .await;

    let bundle = client.read("kv", "infra/app1", None).await.unwrap();
    assert_eq!(bundle.get("svc_a"), Some("pw1"));
    // Non-string values survive as rendered JSON instead of vanishing
    assert_eq!(bundle.get("port"), Some("8200"));
    assert_eq!(bundle.metadata.version, 4);
    assert_eq!(
        bundle.metadata.created_time.to_rfc3339(),
        "2025-11-04T16:58:33+00:00"
    );
}

#[tokio::test]
async fn read_requests_a_historical_version() {
    let server = MockServer::start().await;
    let client = logged_in_client(&server).await;

    Mock::given(method("GET"))
        .and(path("/v1/kv/data/infra/app1"))
        .and(query_param("version", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(read_body(
            serde_json::json!({ "svc_a": "old-pw" }),
            2,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let bundle = client.read("kv", "infra/app1", Some(2)).await.unwrap();
    assert_eq!(bundle.get("svc_a"), Some("old-pw"));
    assert_eq!(bundle.metadata.version, 2);
}

#[tokio::test]
async fn read_missing_path_is_not_found() {
    let server = MockServer::start().await;
    let client = logged_in_client(&server).await;

    Mock::given(method("GET"))
        .and(path("/v1/kv/data/infra/ghost"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({"errors": []})))
        .mount(&server)
        .await;

    let err = client.read("kv", "infra/ghost", None).await.unwrap_err();
    assert!(err.is_not_found());
    assert!(err.to_string().contains("kv/infra/ghost"));
}

#[tokio::test]
async fn read_key_wraps_a_single_entry_with_the_same_revision() {
    let server = MockServer::start().await;
    let client = logged_in_client(&server).await;

    Mock::given(method("GET"))
        .and(path("/v1/kv/data/infra/app1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(read_body(
            serde_json::json!({ "svc_a": "pw1", "svc_b": "pw2" }),
            3,
        )))
        .mount(&server)
        .await;

    let bundle = client
        .read_key("kv", "infra/app1", "svc_b", None)
        .await
        .unwrap();
    assert_eq!(bundle.len(), 1);
    assert_eq!(bundle.get("svc_b"), Some("pw2"));
    assert_eq!(bundle.metadata.version, 3);

    let err = client
        .read_key("kv", "infra/app1", "svc_c", None)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert!(err.to_string().contains("svc_c"));
}

#[tokio::test]
async fn read_key_missing_from_a_pinned_version_names_that_version() {
    let server = MockServer::start().await;
    let client = logged_in_client(&server).await;

    // svc_b only exists in later revisions; version 1 never held it.
    Mock::given(method("GET"))
        .and(path("/v1/kv/data/infra/app1"))
        .and(query_param("version", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(read_body(
            serde_json::json!({ "svc_a": "pw1" }),
            1,
        )))
        .mount(&server)
        .await;

    let err = client
        .read_key("kv", "infra/app1", "svc_b", Some(1))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert!(err.to_string().contains("kv/infra/app1 (version 1)"));
}

#[tokio::test]
async fn read_credential_materializes_the_pair() {
    let server = MockServer::start().await;
    let client = logged_in_client(&server).await;

    Mock::given(method("GET"))
        .and(path("/v1/kv/data/infra/app1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(read_body(
            serde_json::json!({ "svc_deploy": "pw1" }),
            1,
        )))
        .mount(&server)
        .await;

    let credential = client
        .read_credential("kv", "infra/app1", "svc_deploy", None)
        .await
        .unwrap();
    assert_eq!(credential.username(), "svc_deploy");
    assert_eq!(credential.expose(), "pw1");
    assert!(!format!("{credential:?}").contains("pw1"));

    let err = client
        .read_credential("kv", "infra/app1", "absent", None)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn read_credential_with_blank_key_sends_nothing() {
    let server = MockServer::start().await;
    let client = logged_in_client(&server).await;

    let err = client
        .read_credential("kv", "infra/app1", "  ", None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Precondition { .. }));

    // Only the login reached the server
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
}

// =============================================================================
// Listing
// =============================================================================

#[tokio::test]
async fn list_engine_root_returns_sorted_child_names() {
    let server = MockServer::start().await;
    let client = logged_in_client(&server).await;

    Mock::given(method("GET"))
        .and(path("/v1/kv/metadata"))
        .and(query_param("list", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(list_body(&["infra/", "app1"])))
        .mount(&server)
        .await;

    let names = client.list("kv", None).await.unwrap();
    assert_eq!(names, vec!["app1".to_string(), "infra/".to_string()]);
}

#[tokio::test]
async fn list_of_nested_path_queries_the_parent_folder() {
    let server = MockServer::start().await;
    let client = logged_in_client(&server).await;

    // The mock only answers for the parent folder
    Mock::given(method("GET"))
        .and(path("/v1/kv/metadata/infra"))
        .and(query_param("list", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(list_body(&["app1", "app2"])))
        .expect(1)
        .mount(&server)
        .await;

    let names = client.list("kv", Some("infra/app1")).await.unwrap();
    assert_eq!(names, vec!["app1".to_string(), "app2".to_string()]);
}

#[tokio::test]
async fn list_empty_folder_is_an_empty_vector() {
    let server = MockServer::start().await;
    let client = logged_in_client(&server).await;

    Mock::given(method("GET"))
        .and(path("/v1/kv/metadata/empty"))
        .and(query_param("list", "true"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({"errors": []})))
        .mount(&server)
        .await;

    let names = client.list("kv", Some("empty")).await.unwrap();
    assert!(names.is_empty());
}

#[tokio::test]
async fn subkeys_returns_key_names_without_values() {
    let server = MockServer::start().await;
    let client = logged_in_client(&server).await;

    Mock::given(method("GET"))
        .and(path("/v1/kv/subkeys/infra/app1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": { "subkeys": { "svc_b": null, "svc_a": null } }
        })))
        .mount(&server)
        .await;

    let keys = client.subkeys("kv", "infra/app1").await.unwrap();
    assert_eq!(keys, vec!["svc_a".to_string(), "svc_b".to_string()]);
}

// =============================================================================
// Writes
// =============================================================================

#[tokio::test]
async fn merge_write_unions_existing_keys_with_the_payload() {
    let server = MockServer::start().await;
    let client = logged_in_client(&server).await;

    Mock::given(method("GET"))
        .and(path("/v1/kv/metadata/infra"))
        .and(query_param("list", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(list_body(&["app1"])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/kv/data/infra/app1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(read_body(
            serde_json::json!({ "svc_a": "pw1" }),
            1,
        )))
        .mount(&server)
        .await;
    // The posted payload must be the union of both key sets
    Mock::given(method("POST"))
        .and(path("/v1/kv/data/infra/app1"))
        .and(body_json(serde_json::json!({
            "data": { "svc_a": "pw1", "svc_b": "pw2" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(write_body(2)))
        .expect(1)
        .mount(&server)
        .await;

    let bundle = client
        .write(
            "kv",
            "infra/app1",
            mapping(&[("svc_b", "pw2")]),
            WriteMode::Merge,
        )
        .await
        .unwrap();

    assert_eq!(bundle.get("svc_a"), Some("pw1"));
    assert_eq!(bundle.get("svc_b"), Some("pw2"));
    assert_eq!(bundle.metadata.version, 2);
}

#[tokio::test]
async fn merge_write_prefers_the_new_value_on_collision() {
    let server = MockServer::start().await;
    let client = logged_in_client(&server).await;

    Mock::given(method("GET"))
        .and(path("/v1/kv/metadata/infra"))
        .and(query_param("list", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(list_body(&["app1"])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/kv/data/infra/app1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(read_body(
            serde_json::json!({ "svc_a": "pw1", "svc_b": "pw2" }),
            2,
        )))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/kv/data/infra/app1"))
        .and(body_json(serde_json::json!({
            "data": { "svc_a": "pw3", "svc_b": "pw2" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(write_body(3)))
        .expect(1)
        .mount(&server)
        .await;

    let bundle = client
        .write(
            "kv",
            "infra/app1",
            mapping(&[("svc_a", "pw3")]),
            WriteMode::Merge,
        )
        .await
        .unwrap();
    assert_eq!(bundle.get("svc_a"), Some("pw3"));
    assert_eq!(bundle.get("svc_b"), Some("pw2"));
}

#[tokio::test]
async fn first_merge_write_to_an_empty_path_skips_the_read() {
    let server = MockServer::start().await;
    let client = logged_in_client(&server).await;

    Mock::given(method("GET"))
        .and(path("/v1/kv/metadata/infra"))
        .and(query_param("list", "true"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({"errors": []})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/kv/data/infra/app1"))
        .and(body_json(serde_json::json!({ "data": { "svc_a": "pw1" } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(write_body(1)))
        .expect(1)
        .mount(&server)
        .await;

    let bundle = client
        .write(
            "kv",
            "infra/app1",
            mapping(&[("svc_a", "pw1")]),
            WriteMode::Merge,
        )
        .await
        .unwrap();
    assert_eq!(bundle.metadata.version, 1);

    // login + list probe + post: the data endpoint was never read
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 3);
}

#[tokio::test]
async fn merge_probe_for_a_top_level_path_lists_the_engine_root() {
    let server = MockServer::start().await;
    let client = logged_in_client(&server).await;

    Mock::given(method("GET"))
        .and(path("/v1/kv/metadata"))
        .and(query_param("list", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(list_body(&["app1", "infra/"])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/kv/data/app1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(read_body(
            serde_json::json!({ "svc_a": "pw1" }),
            1,
        )))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/kv/data/app1"))
        .and(body_json(serde_json::json!({
            "data": { "svc_a": "pw1", "svc_b": "pw2" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(write_body(2)))
        .expect(1)
        .mount(&server)
        .await;

    client
        .write("kv", "app1", mapping(&[("svc_b", "pw2")]), WriteMode::Merge)
        .await
        .unwrap();
}

#[tokio::test]
async fn replace_write_posts_exactly_the_payload() {
    let server = MockServer::start().await;
    let client = logged_in_client(&server).await;

    Mock::given(method("POST"))
        .and(path("/v1/kv/data/infra/app1"))
        .and(body_json(serde_json::json!({ "data": { "svc_a": "pw3" } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(write_body(3)))
        .expect(1)
        .mount(&server)
        .await;

    let bundle = client
        .write(
            "kv",
            "infra/app1",
            mapping(&[("svc_a", "pw3")]),
            WriteMode::Replace,
        )
        .await
        .unwrap();
    assert_eq!(bundle.len(), 1);
    assert_eq!(bundle.metadata.version, 3);

    // login + post: replace neither lists nor reads
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
}

#[tokio::test]
async fn write_with_empty_payload_sends_nothing() {
    let server = MockServer::start().await;
    let client = logged_in_client(&server).await;

    let err = client
        .write("kv", "infra/app1", BTreeMap::new(), WriteMode::Merge)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Precondition { .. }));

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1); // just the login
}

#[tokio::test]
async fn write_cas_sends_the_expected_version() {
    let server = MockServer::start().await;
    let client = logged_in_client(&server).await;

    Mock::given(method("POST"))
        .and(path("/v1/kv/data/infra/app1"))
        .and(body_json(serde_json::json!({
            "data": { "svc_a": "pw4" },
            "options": { "cas": 3 }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(write_body(4)))
        .expect(1)
        .mount(&server)
        .await;

    let bundle = client
        .write_cas("kv", "infra/app1", mapping(&[("svc_a", "pw4")]), 3)
        .await
        .unwrap();
    assert_eq!(bundle.metadata.version, 4);
}

#[tokio::test]
async fn write_cas_conflict_surfaces_the_server_message() {
    let server = MockServer::start().await;
    let client = logged_in_client(&server).await;

    Mock::given(method("POST"))
        .and(path("/v1/kv/data/infra/app1"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "errors": ["check-and-set parameter did not match the current version"]
        })))
        .mount(&server)
        .await;

    let err = client
        .write_cas("kv", "infra/app1", mapping(&[("svc_a", "pw4")]), 2)
        .await
        .unwrap_err();
    match err {
        Error::Remote { status, message } => {
            assert_eq!(status, Some(400));
            assert!(message.contains("check-and-set"));
        }
        other => panic!("expected remote error, got {other}"),
    }
}

// =============================================================================
// Deletes
// =============================================================================

#[tokio::test]
async fn delete_removes_the_bundle_from_its_parent_listing() {
    let server = MockServer::start().await;
    let client = logged_in_client(&server).await;

    Mock::given(method("DELETE"))
        .and(path("/v1/kv/data/infra/app1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    // The parent folder as the store reports it after the delete
    Mock::given(method("GET"))
        .and(path("/v1/kv/metadata/infra"))
        .and(query_param("list", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(list_body(&["app2"])))
        .mount(&server)
        .await;

    client.delete("kv", "infra/app1").await.unwrap();

    let names = client.list("kv", Some("infra")).await.unwrap();
    assert!(!names.contains(&"app1".to_string()));
}

#[tokio::test]
async fn delete_key_rewrites_the_bundle_without_it() {
    let server = MockServer::start().await;
    let client = logged_in_client(&server).await;

    Mock::given(method("GET"))
        .and(path("/v1/kv/data/infra/app1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(read_body(
            serde_json::json!({ "svc_a": "pw1", "svc_b": "pw2" }),
            2,
        )))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/kv/data/infra/app1"))
        .and(body_json(serde_json::json!({ "data": { "svc_b": "pw2" } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(write_body(3)))
        .expect(1)
        .mount(&server)
        .await;

    client.delete_key("kv", "infra/app1", "svc_a").await.unwrap();
}

#[tokio::test]
async fn delete_key_missing_key_issues_no_rewrite() {
    let server = MockServer::start().await;
    let client = logged_in_client(&server).await;

    Mock::given(method("GET"))
        .and(path("/v1/kv/data/infra/app1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(read_body(
            serde_json::json!({ "svc_b": "pw2" }),
            2,
        )))
        .mount(&server)
        .await;

    let err = client
        .delete_key("kv", "infra/app1", "svc_a")
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    // login + read: nothing was written
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
}

// =============================================================================
// Metadata and error mapping
// =============================================================================

#[tokio::test]
async fn metadata_returns_numerically_sorted_history() {
    let server = MockServer::start().await;
    let client = logged_in_client(&server).await;

    Mock::given(method("GET"))
        .and(path("/v1/kv/metadata/infra/app1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": {
                "current_version": 10,
                "created_time": "2025-01-01T00:00:00.000Z",
                "updated_time": "2025-11-05T09:00:00.000Z",
                "versions": {
                    "10": { "created_time": "2025-11-05T09:00:00.000Z", "deletion_time": "", "destroyed": false },
                    "2": { "created_time": "2025-02-01T00:00:00.000Z", "deletion_time": "2025-03-01T00:00:00.000Z", "destroyed": true },
                    "1": { "created_time": "2025-01-01T00:00:00.000Z", "deletion_time": "", "destroyed": false }
                }
            }
        })))
        .mount(&server)
        .await;

    let metadata = client.metadata("kv", "infra/app1").await.unwrap();
    assert_eq!(metadata.current_version, 10);

    // Lexicographic order would put "10" before "2"; history is numeric
    let numbers: Vec<u64> = metadata.versions.iter().map(|v| v.version).collect();
    assert_eq!(numbers, vec![1, 2, 10]);

    assert!(metadata.versions[0].deletion_time.is_none());
    assert!(metadata.versions[1].deletion_time.is_some());
    assert!(metadata.versions[1].destroyed);
}

#[tokio::test]
async fn server_errors_carry_status_and_message() {
    let server = MockServer::start().await;
    let client = logged_in_client(&server).await;

    Mock::given(method("GET"))
        .and(path("/v1/kv/data/infra/app1"))
        .respond_with(ResponseTemplate::new(503).set_body_json(serde_json::json!({
            "errors": ["vault is sealed"]
        })))
        .mount(&server)
        .await;

    let err = client.read("kv", "infra/app1", None).await.unwrap_err();
    match &err {
        Error::Remote { status, message } => {
            assert_eq!(*status, Some(503));
            assert!(message.contains("vault is sealed"));
        }
        other => panic!("expected remote error, got {other}"),
    }
    assert!(err.is_retryable());
}

#[tokio::test]
async fn rejected_token_surfaces_as_authentication_error() {
    let server = MockServer::start().await;
    let client = logged_in_client(&server).await;

    Mock::given(method("GET"))
        .and(path("/v1/kv/data/infra/app1"))
        .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
            "errors": ["permission denied"]
        })))
        .mount(&server)
        .await;

    let err = client.read("kv", "infra/app1", None).await.unwrap_err();
    assert!(matches!(err, Error::Authentication { .. }));
    assert!(err.to_string().contains("permission denied"));
}

// =============================================================================
// End-to-end write/read scenario
// =============================================================================

/// Append twice, then overwrite: the documented lifecycle of a bundle.
/// Mocks are mounted in order; exhausted ones stop matching, so the
/// store's state appears to advance between calls.
#[tokio::test]
async fn append_append_replace_lifecycle() {
    let server = MockServer::start().await;
    let client = logged_in_client(&server).await;

    // Merge probes: the folder is empty first, then holds app1
    Mock::given(method("GET"))
        .and(path("/v1/kv/metadata/infra"))
        .and(query_param("list", "true"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({"errors": []})))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/kv/metadata/infra"))
        .and(query_param("list", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(list_body(&["app1"])))
        .mount(&server)
        .await;

    // Reads: v1 twice (read-back, then the second write's merge read),
    // then the union at v2, then the replaced bundle at v3
    Mock::given(method("GET"))
        .and(path("/v1/kv/data/infra/app1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(read_body(
            serde_json::json!({ "svc_a": "pw1" }),
            1,
        )))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/kv/data/infra/app1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(read_body(
            serde_json::json!({ "svc_a": "pw1", "svc_b": "pw2" }),
            2,
        )))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/kv/data/infra/app1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(read_body(
            serde_json::json!({ "svc_a": "pw3" }),
            3,
        )))
        .mount(&server)
        .await;

    // Writes, matched by their exact payloads
    Mock::given(method("POST"))
        .and(path("/v1/kv/data/infra/app1"))
        .and(body_json(serde_json::json!({ "data": { "svc_a": "pw1" } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(write_body(1)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/kv/data/infra/app1"))
        .and(body_json(serde_json::json!({
            "data": { "svc_a": "pw1", "svc_b": "pw2" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(write_body(2)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/kv/data/infra/app1"))
        .and(body_json(serde_json::json!({ "data": { "svc_a": "pw3" } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(write_body(3)))
        .expect(1)
        .mount(&server)
        .await;

    // Append to an empty path
    let first = client
        .write(
            "kv",
            "infra/app1",
            mapping(&[("svc_a", "pw1")]),
            WriteMode::Merge,
        )
        .await
        .unwrap();
    assert_eq!(first.metadata.version, 1);

    let readback = client.read("kv", "infra/app1", None).await.unwrap();
    assert_eq!(readback.get("svc_a"), Some("pw1"));
    assert_eq!(readback.len(), 1);

    // Append a second key: the union must survive
    let second = client
        .write(
            "kv",
            "infra/app1",
            mapping(&[("svc_b", "pw2")]),
            WriteMode::Merge,
        )
        .await
        .unwrap();
    assert_eq!(second.get("svc_a"), Some("pw1"));
    assert_eq!(second.get("svc_b"), Some("pw2"));
    assert_eq!(second.metadata.version, 2);

    let union = client.read("kv", "infra/app1", None).await.unwrap();
    assert_eq!(union.len(), 2);

    // Overwrite: only the new payload remains
    let third = client
        .write(
            "kv",
            "infra/app1",
            mapping(&[("svc_a", "pw3")]),
            WriteMode::Replace,
        )
        .await
        .unwrap();
    assert_eq!(third.metadata.version, 3);

    let replaced = client.read("kv", "infra/app1", None).await.unwrap();
    assert_eq!(replaced.get("svc_a"), Some("pw3"));
    assert_eq!(replaced.len(), 1);

    // login, write1 (list+post), read, write2 (list+read+post), read,
    // write3 (post), read
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 10);
}
