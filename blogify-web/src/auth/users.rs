//! User accounts, password hashing and token issuing

#[cfg(feature = "sqlite")]
use super::database::DatabaseUserStore;
use crate::error::{ApiError, ApiResult};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use blogify_applications::TokenIssuer;
use blogify_core::{
    validation_error, BlogifyError, BlogifyResult, ErrorContext, Role, RoleLookup,
    RoleLookupResult, UserId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use utoipa::ToSchema;

pub const DEFAULT_ADMIN_EMAIL: &str = "admin@blogify.local";
const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

/// User registration request
#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl RegisterRequest {
    fn validate(&self) -> BlogifyResult<()> {
        let name_len = self.username.trim().chars().count();
        if !(3..=30).contains(&name_len) {
            return Err(validation_error!(
                "Username must be between 3 and 30 characters",
                "username",
                "users"
            ));
        }
        if !self.email.contains('@') {
            return Err(validation_error!("Please enter a valid email", "email", "users"));
        }
        if self.password.chars().count() < 6 {
            return Err(validation_error!(
                "Password must be at least 6 characters",
                "password",
                "users"
            ));
        }
        Ok(())
    }
}

/// User login request
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Registration/login response
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub success: bool,
    pub token: String,
    pub user: UserInfo,
}

/// Public user information
#[derive(Debug, Serialize, Clone, ToSchema)]
pub struct UserInfo {
    #[schema(value_type = String)]
    pub id: UserId,
    pub username: String,
    pub email: String,
    #[schema(value_type = String)]
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Internal user data with password hash
#[derive(Debug, Clone)]
pub struct UserData {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl UserData {
    /// Create new user with hashed password
    pub fn new(username: &str, email: &str, password: &str, role: Role) -> BlogifyResult<Self> {
        Ok(Self {
            id: UserId::new(),
            username: username.trim().to_string(),
            email: normalize_email(email),
            password_hash: hash_password(password)?,
            role,
            created_at: Utc::now(),
        })
    }

    pub fn verify_password(&self, password: &str) -> bool {
        verify_password(password, &self.password_hash)
    }

    pub fn to_user_info(&self) -> UserInfo {
        UserInfo {
            id: self.id.clone(),
            username: self.username.clone(),
            email: self.email.clone(),
            role: self.role,
            created_at: self.created_at,
        }
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn duplicate_user() -> BlogifyError {
    BlogifyError::Conflict {
        message: "User with this email or username already exists".to_string(),
        context: ErrorContext::new("users").with_operation("register"),
    }
}

/// User store supporting both in-memory and database storage
#[derive(Debug, Clone)]
pub enum UserStore {
    /// In-memory storage (for development and testing)
    Memory {
        users: Arc<RwLock<HashMap<UserId, UserData>>>,
    },
    /// Database storage
    #[cfg(feature = "sqlite")]
    Database(DatabaseUserStore),
}

impl Default for UserStore {
    fn default() -> Self {
        Self::memory()
    }
}

impl UserStore {
    pub fn memory() -> Self {
        Self::Memory {
            users: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    #[cfg(feature = "sqlite")]
    pub fn database(store: DatabaseUserStore) -> Self {
        Self::Database(store)
    }

    /// Insert a new user, refusing duplicate emails or usernames
    pub async fn insert(&self, user: UserData) -> BlogifyResult<UserData> {
        match self {
            Self::Memory { users } => {
                let mut users = users.write().await;
                let taken = users
                    .values()
                    .any(|u| u.email == user.email || u.username == user.username);
                if taken {
                    return Err(duplicate_user());
                }
                users.insert(user.id.clone(), user.clone());
                Ok(user)
            }
            #[cfg(feature = "sqlite")]
            Self::Database(db) => db.insert(user).await,
        }
    }

    pub async fn get(&self, id: &UserId) -> BlogifyResult<Option<UserData>> {
        match self {
            Self::Memory { users } => Ok(users.read().await.get(id).cloned()),
            #[cfg(feature = "sqlite")]
            Self::Database(db) => db.get(id).await,
        }
    }

    pub async fn find_by_email(&self, email: &str) -> BlogifyResult<Option<UserData>> {
        let email = normalize_email(email);
        match self {
            Self::Memory { users } => Ok(users
                .read()
                .await
                .values()
                .find(|u| u.email == email)
                .cloned()),
            #[cfg(feature = "sqlite")]
            Self::Database(db) => db.find_by_email(&email).await,
        }
    }

    /// All users, newest first
    pub async fn list(&self) -> BlogifyResult<Vec<UserData>> {
        match self {
            Self::Memory { users } => {
                let mut all: Vec<UserData> = users.read().await.values().cloned().collect();
                all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                Ok(all)
            }
            #[cfg(feature = "sqlite")]
            Self::Database(db) => db.list().await,
        }
    }

    /// Change a user's role. `None` when the user does not exist.
    pub async fn set_role(&self, id: &UserId, role: Role) -> BlogifyResult<Option<UserData>> {
        match self {
            Self::Memory { users } => {
                let mut users = users.write().await;
                Ok(users.get_mut(id).map(|user| {
                    user.role = role;
                    user.clone()
                }))
            }
            #[cfg(feature = "sqlite")]
            Self::Database(db) => db.set_role(id, role).await,
        }
    }

    pub async fn count(&self) -> BlogifyResult<u64> {
        match self {
            Self::Memory { users } => Ok(users.read().await.len() as u64),
            #[cfg(feature = "sqlite")]
            Self::Database(db) => db.count().await,
        }
    }
}

#[async_trait]
impl RoleLookup for UserStore {
    async fn lookup_role(&self, user_id: &UserId) -> BlogifyResult<RoleLookupResult> {
        Ok(match self.get(user_id).await? {
            Some(user) => RoleLookupResult::found(user.role),
            None => RoleLookupResult::missing(),
        })
    }
}

/// Account operations used by the auth and admin handlers
#[derive(Clone)]
pub struct UserService {
    store: UserStore,
    issuer: Arc<TokenIssuer>,
}

impl UserService {
    pub fn new(store: UserStore, issuer: TokenIssuer) -> Self {
        Self {
            store,
            issuer: Arc::new(issuer),
        }
    }

    /// Register a new account with the `user` role
    pub async fn register(&self, request: RegisterRequest) -> ApiResult<AuthResponse> {
        debug!("Starting user registration for: {}", request.username);
        request.validate()?;

        let user = UserData::new(&request.username, &request.email, &request.password, Role::User)?;
        let user = self.store.insert(user).await?;

        info!(user_id = %user.id, "Registered new user: {}", user.username);
        self.respond(&user)
    }

    pub async fn login(&self, request: LoginRequest) -> ApiResult<AuthResponse> {
        let user = self
            .store
            .find_by_email(&request.email)
            .await?
            .ok_or(ApiError::InvalidCredentials)?;

        if !user.verify_password(&request.password) {
            warn!(user_id = %user.id, "Invalid password");
            return Err(ApiError::InvalidCredentials);
        }

        debug!(user_id = %user.id, "User authenticated");
        self.respond(&user)
    }

    pub async fn get(&self, id: &UserId) -> BlogifyResult<Option<UserData>> {
        self.store.get(id).await
    }

    pub async fn list(&self) -> BlogifyResult<Vec<UserInfo>> {
        Ok(self.store.list().await?.iter().map(UserData::to_user_info).collect())
    }

    pub async fn set_role(&self, id: &UserId, role: Role) -> BlogifyResult<Option<UserData>> {
        let updated = self.store.set_role(id, role).await?;
        if let Some(user) = &updated {
            info!(user_id = %user.id, role = %role, "User role changed");
        }
        Ok(updated)
    }

    pub async fn count(&self) -> BlogifyResult<u64> {
        self.store.count().await
    }

    /// Seed the development admin account unless it already exists
    pub async fn ensure_default_admin(&self) -> BlogifyResult<()> {
        if self.store.find_by_email(DEFAULT_ADMIN_EMAIL).await?.is_some() {
            return Ok(());
        }
        let admin = UserData::new("admin", DEFAULT_ADMIN_EMAIL, DEFAULT_ADMIN_PASSWORD, Role::Admin)?;
        self.store.insert(admin).await?;
        warn!(
            "Created default admin user {} (development mode only, change its password)",
            DEFAULT_ADMIN_EMAIL
        );
        Ok(())
    }

    /// The store doubles as the role lookup for admin-only routes
    pub fn role_lookup(&self) -> Arc<dyn RoleLookup> {
        Arc::new(self.store.clone())
    }

    pub fn store(&self) -> &UserStore {
        &self.store
    }

    fn respond(&self, user: &UserData) -> ApiResult<AuthResponse> {
        Ok(AuthResponse {
            success: true,
            token: self.issuer.issue(&user.id)?,
            user: user.to_user_info(),
        })
    }
}

/// Hash password using Argon2
fn hash_password(password: &str) -> BlogifyResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| BlogifyError::Internal {
            message: format!("Password hashing failed: {}", e),
            source: None,
            context: ErrorContext::new("users").with_operation("hash_password"),
        })
}

fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}
