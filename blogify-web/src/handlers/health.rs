//! Health check handlers

use super::types::HealthResponse;
use axum::response::Json;
use serde_json::{json, Value};

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "Health",
    summary = "Health check",
    description = "Check the server health status",
    responses(
        (status = 200, description = "Server is healthy", body = HealthResponse)
    )
)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Service banner at `/`
pub async fn root() -> Json<Value> {
    Json(json!({ "message": "Blogify API" }))
}
