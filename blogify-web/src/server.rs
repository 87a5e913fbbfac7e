//! Blogify Web Server
//!
//! Binds the listener, runs the admission compaction task alongside the
//! router, and tears both down on shutdown.

use crate::{create_app, AppState, WebConfig, WebError, WebResult};
use axum::serve;
use blogify_core::BlogifyConfig;
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info};

pub struct BlogifyServer {
    config: WebConfig,
    state: AppState,
}

impl BlogifyServer {
    pub async fn new(config: WebConfig, settings: BlogifyConfig) -> WebResult<Self> {
        settings
            .validate()
            .map_err(|e| WebError::Config(e.to_string()))?;
        let state = AppState::new(config.clone(), settings).await?;
        Ok(Self { config, state })
    }

    /// Bind the configured address and serve until Ctrl+C
    pub async fn start(self) -> WebResult<()> {
        let address = self.config.address();
        let listener = TcpListener::bind(&address)
            .await
            .map_err(WebError::Server)?;

        info!("Server listening on http://{}", address);
        info!("Development mode: {}", self.config.dev_mode);
        info!(
            "Admission: {} requests per {} ms per client",
            self.state.admission.max_requests(),
            self.state.admission.window_ms()
        );

        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on an already bound listener until `shutdown` resolves
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> WebResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let interval = Duration::from_millis(self.state.settings.admission.compaction_interval_ms);
        let compaction = self.state.admission.spawn_compaction(interval);

        let app = create_app(self.state.clone());
        let result = serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await;

        compaction.shutdown().await;

        if let Err(e) = result {
            error!("Server error: {}", e);
            return Err(WebError::Server(e));
        }

        info!("Server stopped");
        Ok(())
    }

    pub fn config(&self) -> &WebConfig {
        &self.config
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Builder for BlogifyServer
pub struct BlogifyServerBuilder {
    config: WebConfig,
    settings: BlogifyConfig,
}

impl BlogifyServerBuilder {
    pub fn new() -> Self {
        Self {
            config: WebConfig::default(),
            settings: BlogifyConfig::default(),
        }
    }

    pub fn config(mut self, config: WebConfig) -> Self {
        self.config = config;
        self
    }

    pub fn settings(mut self, settings: BlogifyConfig) -> Self {
        self.settings = settings;
        self
    }

    pub fn host<S: Into<String>>(mut self, host: S) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn dev_mode(mut self, dev_mode: bool) -> Self {
        self.config.dev_mode = dev_mode;
        self
    }

    pub fn database_url<S: Into<String>>(mut self, database_url: S) -> Self {
        self.config.database_url = Some(database_url.into());
        self
    }

    pub async fn build(self) -> WebResult<BlogifyServer> {
        BlogifyServer::new(self.config, self.settings).await
    }
}

impl Default for BlogifyServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
