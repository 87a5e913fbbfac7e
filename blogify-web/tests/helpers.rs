//! Integration test helpers
//!
//! Spawns the full server on a random port, with peer addresses available to
//! the admission layer, and talks to it over real HTTP.

#![allow(dead_code)]

use blogify_core::BlogifyConfig;
use blogify_web::{server::BlogifyServerBuilder, AppState, WebConfig};
use serde_json::{json, Value};
use std::sync::LazyLock;
use tokio::net::TcpListener;
use uuid::Uuid;

// Ensure tracing is only initialized once
static TRACING: LazyLock<()> = LazyLock::new(|| {
    if std::env::var("TEST_LOG").is_ok() {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .finish();
        tracing::subscriber::set_global_default(subscriber).ok();
    } else {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_writer(std::io::sink)
            .finish();
        tracing::subscriber::set_global_default(subscriber).ok();
    }
});

pub const TEST_SECRET: &str = "integration-test-secret-0123456789";

pub struct TestApp {
    pub address: String,
    pub api_client: reqwest::Client,
    pub state: AppState,
}

/// A registered account
pub struct TestUser {
    pub id: String,
    pub token: String,
    pub username: String,
}

pub fn test_settings() -> BlogifyConfig {
    let mut settings = BlogifyConfig::default();
    settings.auth.jwt_secret = TEST_SECRET.to_string();
    settings
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(WebConfig::default(), test_settings()).await
}

pub async fn spawn_app_with(config: WebConfig, settings: BlogifyConfig) -> TestApp {
    LazyLock::force(&TRACING);

    let server = BlogifyServerBuilder::new()
        .config(config)
        .settings(settings)
        .build()
        .await
        .expect("Failed to build server");
    let state = server.state().clone();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        server
            .serve(listener, std::future::pending())
            .await
            .expect("Server failed");
    });

    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        api_client: client,
        state,
    }
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> reqwest::Response {
        let mut request = self.api_client.get(self.url(path));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        request.send().await.expect("Failed to execute request.")
    }

    pub async fn send_json(
        &self,
        method: reqwest::Method,
        path: &str,
        token: Option<&str>,
        body: &Value,
    ) -> reqwest::Response {
        let mut request = self.api_client.request(method, self.url(path)).json(body);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        request.send().await.expect("Failed to execute request.")
    }

    pub async fn delete(&self, path: &str, token: Option<&str>) -> reqwest::Response {
        let mut request = self.api_client.delete(self.url(path));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        request.send().await.expect("Failed to execute request.")
    }

    /// Register a fresh account with a unique name
    pub async fn register_user(&self) -> TestUser {
        let username = format!("user_{}", &Uuid::new_v4().simple().to_string()[..8]);
        let response = self
            .send_json(
                reqwest::Method::POST,
                "/api/auth/register",
                None,
                &json!({
                    "username": username,
                    "email": format!("{}@example.com", username),
                    "password": "password123",
                }),
            )
            .await;
        assert_eq!(response.status(), reqwest::StatusCode::CREATED);

        let body: Value = response.json().await.unwrap();
        TestUser {
            id: body["user"]["id"].as_str().unwrap().to_string(),
            token: body["token"].as_str().unwrap().to_string(),
            username,
        }
    }

    /// Create a post and return its id
    pub async fn create_post(&self, user: &TestUser, title: &str, published: bool) -> String {
        let response = self
            .send_json(
                reqwest::Method::POST,
                "/api/posts",
                Some(&user.token),
                &json!({
                    "title": title,
                    "content": format!("{} body text", title),
                    "tags": ["rust"],
                    "published": published,
                }),
            )
            .await;
        assert_eq!(response.status(), reqwest::StatusCode::CREATED);
        let body: Value = response.json().await.unwrap();
        body["id"].as_str().unwrap().to_string()
    }
}
