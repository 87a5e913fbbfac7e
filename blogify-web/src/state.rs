//! Application state shared by every handler and middleware

use crate::{
    auth::users::{UserService, UserStore},
    security::AdmissionController,
    WebConfig, WebResult,
};
use blogify_applications::{
    IdentityResolver, MemoryPostStorage, PostService, PostStorage, TokenIssuer,
};
use blogify_core::BlogifyConfig;
use std::sync::Arc;
use tracing::info;

#[cfg(feature = "sqlite")]
use crate::{auth::database::DatabaseUserStore, WebError};
#[cfg(feature = "sqlite")]
use blogify_applications::SqlitePostStorage;

#[derive(Clone)]
pub struct AppState {
    /// Server configuration
    pub config: WebConfig,
    /// Admission, auth and logging settings
    pub settings: Arc<BlogifyConfig>,
    /// Per-client sliding-window admission
    pub admission: Arc<AdmissionController>,
    /// Resolves request identities in the three modes
    pub identity: Arc<IdentityResolver>,
    pub posts: PostService,
    pub users: UserService,
}

impl AppState {
    /// Build the state, picking storage from `config.database_url`
    pub async fn new(config: WebConfig, settings: BlogifyConfig) -> WebResult<Self> {
        let (user_store, post_storage) = Self::storage(&config).await?;

        let users = UserService::new(user_store, TokenIssuer::from_config(&settings.auth));
        if config.dev_mode {
            users.ensure_default_admin().await?;
        }

        let identity = IdentityResolver::from_config(&settings.auth, users.role_lookup());
        let admission = AdmissionController::new(&settings.admission);

        info!(
            window_ms = settings.admission.window_ms,
            max_requests = settings.admission.max_requests,
            require_login_to_read_post = settings.auth.require_login_to_read_post,
            "Application state initialized"
        );

        Ok(Self {
            config,
            settings: Arc::new(settings),
            admission: Arc::new(admission),
            identity: Arc::new(identity),
            posts: PostService::new(post_storage),
            users,
        })
    }

    #[cfg(feature = "sqlite")]
    async fn storage(config: &WebConfig) -> WebResult<(UserStore, Arc<dyn PostStorage>)> {
        let Some(database_url) = &config.database_url else {
            return Ok(Self::memory_storage());
        };

        let pool = crate::database::connect(database_url).await?;
        let users = DatabaseUserStore::new(pool.clone())
            .await
            .map_err(|e| WebError::Database(e.to_string()))?;
        let posts = SqlitePostStorage::new(pool)
            .await
            .map_err(|e| WebError::Database(e.to_string()))?;

        info!("Using SQLite storage");
        Ok((UserStore::database(users), Arc::new(posts)))
    }

    #[cfg(not(feature = "sqlite"))]
    async fn storage(config: &WebConfig) -> WebResult<(UserStore, Arc<dyn PostStorage>)> {
        if config.database_url.is_some() {
            tracing::warn!("DATABASE_URL is set but the sqlite feature is disabled; using memory storage");
        }
        Ok(Self::memory_storage())
    }

    fn memory_storage() -> (UserStore, Arc<dyn PostStorage>) {
        info!("Using in-memory storage");
        (UserStore::memory(), Arc::new(MemoryPostStorage::new()))
    }
}
