//! SQLite connection setup

use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

use crate::{WebError, WebResult};

/// Open a pool for `database_url`, creating the database file and its parent directory when needed.
///
/// In-memory databases get a single connection so every query sees the same database.
pub async fn connect(database_url: &str) -> WebResult<SqlitePool> {
    info!("Connecting to database: {}", database_url);

    if database_url.contains(":memory:") {
        return SqlitePoolOptions::new()
            .max_connections(1)
            .connect(database_url)
            .await
            .map_err(|e| WebError::Database(format!("Failed to connect to database: {}", e)));
    }

    let db_path = database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))
        .unwrap_or(database_url);

    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            debug!("Creating parent directory: {}", parent.display());
            std::fs::create_dir_all(parent).map_err(|e| {
                WebError::Database(format!("Failed to create directory: {}", e))
            })?;
        }
    }

    let options = SqliteConnectOptions::from_str(database_url)
        .map_err(|e| WebError::Database(format!("Invalid database url: {}", e)))?
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .map_err(|e| WebError::Database(format!("Failed to connect to database: {}", e)))?;

    info!("Database connection established");
    Ok(pool)
}
