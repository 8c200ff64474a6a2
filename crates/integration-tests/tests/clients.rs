//! Client registration, login and account management over HTTP.
//!
//! These tests require a migrated database and a running API server.
//! Run with: cargo test -p bilemo-integration-tests -- --ignored

use reqwest::StatusCode;
use serde_json::{Value, json};

use bilemo_core::Role;
use bilemo_integration_tests::{Session, TestClient, unique_email};

#[tokio::test]
#[ignore = "Requires running API server"]
async fn test_health() {
    let resp = Session::new().get("/health").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().contains_key("x-request-id"));
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_registration_ignores_submitted_roles() {
    let email = unique_email("sneaky");
    let resp = Session::new()
        .post(
            "/api/clients",
            &json!({
                "email": email,
                "password": "secret-pass",
                "company": "Sneaky Inc",
                "roles": [Role::Admin.as_str()],
            }),
        )
        .await;

    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = resp.json().await.expect("invalid client body");
    assert_eq!(body["roles"], json!([Role::User.as_str()]));
    assert!(body.get("password").is_none());
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_duplicate_registration_conflicts() {
    let client = TestClient::register("Acme").await;
    let resp = Session::new()
        .post(
            "/api/clients",
            &json!({"email": client.email, "password": "secret-pass", "company": "Acme"}),
        )
        .await;

    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = resp.json().await.expect("invalid error body");
    assert_eq!(body["code"], "uniqueness_conflict");
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_wrong_password_is_unauthorized() {
    let client = TestClient::register("Acme").await;
    let resp = Session::new()
        .post(
            "/api/login",
            &json!({"email": client.email, "password": "not-the-password"}),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_client_manages_only_itself() {
    let a = TestClient::register("Client A").await;
    let b = TestClient::register("Client B").await;

    let own = a.session.get(&format!("/api/clients/{}", a.id)).await;
    assert_eq!(own.status(), StatusCode::OK);

    let other = a.session.get(&format!("/api/clients/{}", b.id)).await;
    assert_eq!(other.status(), StatusCode::FORBIDDEN);

    let resp = a
        .session
        .put(&format!("/api/clients/{}", b.id), &json!({"company": "Hijacked"}))
        .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_client_listing_is_admin_only() {
    let client = TestClient::register("Acme").await;
    let resp = client.session.get("/api/clients").await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let admin = Session::admin().await;
    let resp = admin.get("/api/clients?company=Acme").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let page: Value = resp.json().await.expect("invalid page");
    assert!(page["total"].as_i64().is_some_and(|t| t >= 1));
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_deleting_self_ends_session() {
    let client = TestClient::register("Short Lived").await;

    let resp = client.session.delete(&format!("/api/clients/{}", client.id)).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = client.session.get("/api/customers").await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}
