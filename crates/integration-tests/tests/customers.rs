//! Customer reconciliation and scoping over HTTP.
//!
//! These tests require a migrated database and a running API server.
//! Run with: cargo test -p bilemo-integration-tests -- --ignored

use reqwest::StatusCode;
use serde_json::{Value, json};

use bilemo_integration_tests::{Session, TestClient, unique_email};

async fn submit(client: &TestClient, email: &str, firstname: &str, lastname: &str) -> (StatusCode, Value) {
    let resp = client
        .session
        .post(
            "/api/customers",
            &json!({"email": email, "firstname": firstname, "lastname": lastname}),
        )
        .await;
    let status = resp.status();
    (status, resp.json().await.expect("invalid customer body"))
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_second_client_links_existing_customer() {
    let a = TestClient::register("Client A").await;
    let b = TestClient::register("Client B").await;
    let email = unique_email("jane");

    let (status, created) = submit(&a, &email, "Jane", "Doe").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["clients"].as_array().map(Vec::len), Some(1));

    let (status, linked) = submit(&b, &email, "Jane", "Smith").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(linked["id"], created["id"]);
    assert_eq!(linked["lastname"], "Doe");
    assert_eq!(linked["clients"].as_array().map(Vec::len), Some(2));
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_resubmitting_is_duplicate_association() {
    let a = TestClient::register("Client A").await;
    let email = unique_email("dup");

    let (status, _) = submit(&a, &email, "Jane", "Doe").await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = submit(&a, &email, "Jane", "Doe").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "duplicate_association");
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_listing_is_scoped_to_linked_customers() {
    let a = TestClient::register("Client A").await;
    let b = TestClient::register("Client B").await;
    let email = unique_email("scoped");
    submit(&a, &email, "Jane", "Doe").await;

    let resp = b.session.get(&format!("/api/customers?email={email}")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let page: Value = resp.json().await.expect("invalid page");
    assert_eq!(page["total"], 0);

    let resp = a.session.get(&format!("/api/customers?email={email}")).await;
    let page: Value = resp.json().await.expect("invalid page");
    assert_eq!(page["total"], 1);
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_unlinked_client_cannot_manage_customer() {
    let a = TestClient::register("Client A").await;
    let b = TestClient::register("Client B").await;
    let (_, created) = submit(&a, &unique_email("private"), "Jane", "Doe").await;
    let path = format!("/api/customers/{}", created["id"]);

    assert_eq!(b.session.get(&path).await.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        b.session.put(&path, &json!({"lastname": "Smith"})).await.status(),
        StatusCode::FORBIDDEN
    );
    assert_eq!(b.session.delete(&path).await.status(), StatusCode::FORBIDDEN);
    assert_eq!(a.session.get(&path).await.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_detach_keeps_customer_for_other_clients() {
    let a = TestClient::register("Client A").await;
    let b = TestClient::register("Client B").await;
    let email = unique_email("shared");
    let (_, created) = submit(&a, &email, "Jane", "Doe").await;
    submit(&b, &email, "Jane", "Doe").await;
    let path = format!("/api/customers/{}", created["id"]);

    assert_eq!(a.session.delete(&path).await.status(), StatusCode::NO_CONTENT);
    assert_eq!(a.session.get(&path).await.status(), StatusCode::FORBIDDEN);

    let resp = b.session.get(&path).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let detail: Value = resp.json().await.expect("invalid customer body");
    assert_eq!(detail["clients"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_invalid_customer_lists_violations() {
    let a = TestClient::register("Client A").await;
    let (status, body) = submit(&a, "not-an-email", "J", "").await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "validation_failed");
    assert_eq!(body["violations"].as_array().map(Vec::len), Some(3));
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_anonymous_requests_are_unauthorized() {
    let resp = Session::new().get("/api/customers").await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}
