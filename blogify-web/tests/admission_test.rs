//! Admission control over real HTTP connections

mod helpers;

use blogify_web::WebConfig;
use helpers::{spawn_app_with, test_settings};
use reqwest::StatusCode;
use serde_json::Value;

#[tokio::test]
async fn requests_over_the_threshold_get_429() {
    let mut settings = test_settings();
    settings.admission.max_requests = 3;
    settings.admission.window_ms = 60_000;
    let app = spawn_app_with(WebConfig::default(), settings).await;

    for _ in 0..3 {
        let response = app.get("/api/health", None).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app.get("/api/health", None).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let retry_after: u64 = response
        .headers()
        .get("retry-after")
        .unwrap()
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!((1..=60).contains(&retry_after));

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "admission_rejected");
}

#[tokio::test]
async fn rejection_happens_before_authentication() {
    let mut settings = test_settings();
    settings.admission.max_requests = 1;
    let app = spawn_app_with(WebConfig::default(), settings).await;

    let response = app.get("/api/auth/me", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Over the limit, a missing credential is no longer the first complaint
    let response = app.get("/api/auth/me", None).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn every_route_shares_the_same_budget() {
    let mut settings = test_settings();
    settings.admission.max_requests = 2;
    let app = spawn_app_with(WebConfig::default(), settings).await;

    let response = app.get("/", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(app.state.admission.tracked_clients(), 1);

    let response = app.get("/api/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    for path in ["/", "/api-docs/openapi.json", "/swagger-ui/"] {
        let response = app.get(path, None).await;
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS, "{}", path);
    }
    assert_eq!(app.state.admission.tracked_clients(), 1);
}
