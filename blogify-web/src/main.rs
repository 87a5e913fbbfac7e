//! Blogify Web Server
//!
//! Command-line entry point for the blog API server.

use anyhow::Context;
use blogify_core::{init_logging, BlogifyConfig};
use blogify_web::server::BlogifyServerBuilder;
use blogify_web::WebConfig;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

/// Blogify Web Server - blog API with admission control and role-gated administration
#[derive(Parser)]
#[command(name = "blogify-web")]
#[command(about = "HTTP server for the Blogify blog API")]
#[command(version)]
struct Args {
    /// Server host to bind to (overrides BLOGIFY_HOST)
    #[arg(long)]
    host: Option<String>,

    /// Server port to listen on (overrides BLOGIFY_PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// SQLite database URL (overrides DATABASE_URL)
    #[arg(long)]
    database_url: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long)]
    log_level: Option<String>,

    /// Enable development mode (seeds the default admin account)
    #[arg(long)]
    dev: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load environment variables
    dotenvy::dotenv().ok();

    let mut settings =
        BlogifyConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(level) = &args.log_level {
        settings.logging = settings.logging.with_level(level);
    }
    init_logging(&settings.logging).map_err(|e| anyhow::anyhow!(e))?;

    // Command line arguments override the environment
    let mut config = WebConfig::from_env();
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if args.database_url.is_some() {
        config.database_url = args.database_url;
    }
    config.dev_mode |= args.dev;

    info!("Starting Blogify Web Server on http://{}", config.address());
    match &config.database_url {
        Some(url) => info!("Database: {}", url),
        None => info!("No DATABASE_URL configured, data is kept in memory"),
    }

    let server = BlogifyServerBuilder::new()
        .config(config)
        .settings(settings)
        .build()
        .await
        .context("Failed to initialize server")?;

    server.start().await.context("Server terminated with an error")?;
    Ok(())
}
