//! Integration tests for sessions, error bodies and the REST client.
//!
//! These tests require:
//! - A migrated and seeded `MySQL` database (gh-cli migrate && gh-cli seed)
//! - The admin server running with `DEMO_LOGIN=true`
//!
//! Run with: cargo test -p grouphome-integration-tests -- --ignored

use grouphome_admin::client::{ApiClient, ClientError};
use grouphome_integration_tests::{admin_base_url, session_client};
use reqwest::StatusCode;
use serde_json::Value;

#[tokio::test]
#[ignore = "Requires running admin server"]
async fn test_health_endpoints() {
    let client = session_client();
    let base_url = admin_base_url();

    let resp = client
        .get(format!("{base_url}/health"))
        .send()
        .await
        .expect("Failed to reach server");
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client
        .get(format!("{base_url}/health/ready"))
        .send()
        .await
        .expect("Failed to reach server");
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running admin server"]
async fn test_demo_login_then_logout() {
    let client = session_client();
    let base_url = admin_base_url();

    let me: Value = client
        .get(format!("{base_url}/api/session"))
        .send()
        .await
        .expect("Failed to get session")
        .json()
        .await
        .expect("Failed to parse session");
    assert_eq!(me["roleName"], "admin");
    assert!(
        me["permissions"]
            .as_array()
            .is_some_and(|p| p.iter().any(|v| v == "users.edit"))
    );

    let resp = client
        .delete(format!("{base_url}/api/session"))
        .send()
        .await
        .expect("Failed to log out");
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
#[ignore = "Requires running admin server"]
async fn test_error_bodies_are_json() {
    let client = session_client();
    let base_url = admin_base_url();

    let resp = client
        .get(format!("{base_url}/api/does-not-exist"))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = resp.json().await.expect("Failed to parse body");
    assert!(body["error"].is_string());

    let resp = client
        .patch(format!("{base_url}/api/residents"))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);

    let resp = client
        .get(format!("{base_url}/api/residents/not-a-number"))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires running admin server"]
async fn test_system_roles_are_immutable() {
    let client = session_client();
    let base_url = admin_base_url();

    let roles: Vec<Value> = client
        .get(format!("{base_url}/api/roles"))
        .send()
        .await
        .expect("Failed to list roles")
        .json()
        .await
        .expect("Failed to parse roles");
    let admin = roles
        .iter()
        .find(|r| r["name"] == "admin")
        .expect("admin role is seeded");

    let resp = client
        .delete(format!("{base_url}/api/roles/{}", admin["id"]))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore = "Requires running admin server"]
async fn test_api_client_lists_and_reports_errors() {
    let client = ApiClient::new(&admin_base_url()).expect("valid base url");

    assert!(client.ready().await.expect("server reachable"));

    let departments = client
        .list("/api/departments")
        .await
        .expect("Failed to list departments");
    assert!(!departments.is_empty(), "seed creates departments");

    let missing = client.get::<Value>("/api/users/2147483647").await;
    match missing {
        Err(ClientError::Status { status, message }) => {
            assert_eq!(status, StatusCode::NOT_FOUND);
            assert!(!message.is_empty());
        }
        other => panic!("expected 404, got {other:?}"),
    }
}
