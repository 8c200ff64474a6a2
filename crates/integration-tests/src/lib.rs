//! Integration test helpers for the BileMo API.
//!
//! # Running Tests
//!
//! ```bash
//! # Migrate, create an admin and start the server
//! cargo run -p bilemo-cli -- migrate
//! BILEMO_CLIENT_PASSWORD=admin-secret cargo run -p bilemo-cli -- client create \
//!     -e admin@bilemo.test -c BileMo --admin
//! cargo run -p bilemo-api
//!
//! # Run the ignored HTTP tests
//! BILEMO_TEST_ADMIN_EMAIL=admin@bilemo.test BILEMO_TEST_ADMIN_PASSWORD=admin-secret \
//!     cargo test -p bilemo-integration-tests -- --ignored
//! ```
//!
//! # Environment Variables
//!
//! - `BILEMO_TEST_URL` - Server under test (default: `http://localhost:8000`)
//! - `BILEMO_TEST_ADMIN_EMAIL` / `BILEMO_TEST_ADMIN_PASSWORD` - An existing admin

#![allow(clippy::missing_panics_doc, clippy::expect_used)]

use reqwest::{Client, Response, StatusCode};
use serde_json::{Value, json};
use uuid::Uuid;

/// Base URL of the server under test.
#[must_use]
pub fn base_url() -> String {
    std::env::var("BILEMO_TEST_URL").unwrap_or_else(|_| "http://localhost:8000".to_owned())
}

/// A unique email so tests never collide across runs.
#[must_use]
pub fn unique_email(prefix: &str) -> String {
    format!("{prefix}-{}@bilemo.test", Uuid::new_v4().simple())
}

/// An HTTP session against the API. Each value has its own cookie jar.
pub struct Session {
    http: Client,
    base_url: String,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// A fresh, anonymous session.
    #[must_use]
    pub fn new() -> Self {
        Self {
            http: Client::builder()
                .cookie_store(true)
                .build()
                .expect("Failed to create HTTP client"),
            base_url: base_url(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub async fn get(&self, path: &str) -> Response {
        self.http
            .get(self.url(path))
            .send()
            .await
            .expect("GET failed")
    }

    pub async fn post(&self, path: &str, body: &Value) -> Response {
        self.http
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("POST failed")
    }

    pub async fn put(&self, path: &str, body: &Value) -> Response {
        self.http
            .put(self.url(path))
            .json(body)
            .send()
            .await
            .expect("PUT failed")
    }

    pub async fn delete(&self, path: &str) -> Response {
        self.http
            .delete(self.url(path))
            .send()
            .await
            .expect("DELETE failed")
    }

    /// Log in as the administrator named by the environment.
    pub async fn admin() -> Self {
        let email =
            std::env::var("BILEMO_TEST_ADMIN_EMAIL").expect("BILEMO_TEST_ADMIN_EMAIL not set");
        let password = std::env::var("BILEMO_TEST_ADMIN_PASSWORD")
            .expect("BILEMO_TEST_ADMIN_PASSWORD not set");

        let session = Self::new();
        session.login(&email, &password).await;
        session
    }

    /// Log in and return the client body.
    pub async fn login(&self, email: &str, password: &str) -> Value {
        let resp = self
            .post("/api/login", &json!({"email": email, "password": password}))
            .await;
        assert_eq!(resp.status(), StatusCode::OK, "login failed for {email}");
        resp.json().await.expect("invalid login body")
    }
}

/// A registered and logged-in client.
pub struct TestClient {
    pub session: Session,
    pub id: i64,
    pub email: String,
}

impl TestClient {
    /// Register a new client and log it in.
    pub async fn register(company: &str) -> Self {
        let session = Session::new();
        let email = unique_email("client");
        let password = "secret-pass";

        let resp = session
            .post(
                "/api/clients",
                &json!({"email": email, "password": password, "company": company}),
            )
            .await;
        assert_eq!(resp.status(), StatusCode::CREATED, "registration failed");
        let body: Value = resp.json().await.expect("invalid registration body");
        let id = body["id"].as_i64().expect("client id");

        session.login(&email, password).await;
        Self { session, id, email }
    }
}
