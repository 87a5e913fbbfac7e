//! Blogify Web Server
//!
//! HTTP surface for the blog: sliding-window admission control in front of
//! every route, identity resolution per route group, and the post, account
//! and admin handlers.

pub mod auth;
#[cfg(feature = "sqlite")]
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
#[cfg(feature = "openapi")]
pub mod openapi;
pub mod routes;
pub mod security;
pub mod server;
pub mod state;

// Re-export main types
pub use error::{ApiError, ApiResult};
pub use security::{AdmissionController, ClientKey};
pub use server::BlogifyServer;
pub use state::AppState;

use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware::from_fn_with_state,
    routing::get,
    Router,
};
use blogify_core::BlogifyError;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

/// Origins always allowed in addition to `FRONTEND_URL`
const LOCAL_ORIGINS: [&str; 2] = ["http://localhost:3000", "http://localhost:3001"];

/// Create the main application router
pub fn create_app(state: AppState) -> Router {
    let router = Router::new()
        .route("/", get(handlers::root))
        .nest("/api", routes::api_routes(&state));

    #[cfg(feature = "openapi")]
    let router = router.merge(openapi::swagger_ui());

    // Also wraps the fallback, so unknown paths are metered too
    router
        .layer(from_fn_with_state(
            state.clone(),
            security::admission_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config))
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024)) // 10MB max body size
        .with_state(state)
}

fn cors_layer(config: &WebConfig) -> CorsLayer {
    let mut origins: Vec<HeaderValue> = Vec::new();
    let configured = config.frontend_url.iter().map(String::as_str);
    for origin in configured.chain(LOCAL_ORIGINS) {
        match origin.parse::<HeaderValue>() {
            Ok(value) if !origins.contains(&value) => origins.push(value),
            Ok(_) => {}
            Err(_) => warn!("Ignoring invalid CORS origin: {}", origin),
        }
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_credentials(true)
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE])
}

/// Configuration for the web server
#[derive(Debug, Clone)]
pub struct WebConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Enable development mode (seeds the default admin account)
    pub dev_mode: bool,
    /// SQLite database URL; in-memory storage when absent
    pub database_url: Option<String>,
    /// Browser origin allowed by CORS
    pub frontend_url: Option<String>,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            dev_mode: false,
            database_url: None,
            frontend_url: None,
        }
    }
}

impl WebConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("BLOGIFY_HOST").unwrap_or(defaults.host),
            port: std::env::var("BLOGIFY_PORT")
                .or_else(|_| std::env::var("PORT"))
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            dev_mode: std::env::var("BLOGIFY_DEV_MODE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.dev_mode),
            database_url: std::env::var("DATABASE_URL").ok(),
            frontend_url: std::env::var("FRONTEND_URL").ok(),
        }
    }

    /// Get the server address
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Error types for the web server
#[derive(thiserror::Error, Debug)]
pub enum WebError {
    #[error("Server error: {0}")]
    Server(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Core(#[from] BlogifyError),
}

/// Result type for web operations
pub type WebResult<T> = Result<T, WebError>;
