//! Database-backed user storage implementation

use super::users::UserData;
use blogify_core::{storage_error, BlogifyError, BlogifyResult, ErrorContext, Role, UserId};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info};

/// Database user record
#[derive(Debug, sqlx::FromRow)]
struct UserRecord {
    id: String,
    username: String,
    email: String,
    password_hash: String,
    role: String,
    created_at: String, // RFC 3339
}

impl UserRecord {
    fn into_user_data(self) -> BlogifyResult<UserData> {
        let role: Role = self
            .role
            .parse()
            .map_err(|e: String| storage_error!(e, "users"))?;
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| storage_error!("Invalid created_at timestamp", "users", e))?;

        Ok(UserData {
            id: UserId::from(self.id),
            username: self.username,
            email: self.email,
            password_hash: self.password_hash,
            role,
            created_at,
        })
    }
}

fn db_error(operation: &str, e: sqlx::Error) -> BlogifyError {
    BlogifyError::Storage {
        message: format!("User query failed: {}", operation),
        source: Some(Box::new(e)),
        context: ErrorContext::new("users").with_operation(operation),
    }
}

/// Database-backed user store
#[derive(Debug, Clone)]
pub struct DatabaseUserStore {
    pool: SqlitePool,
}

impl DatabaseUserStore {
    /// Create the store, creating the users table when missing
    pub async fn new(pool: SqlitePool) -> BlogifyResult<Self> {
        let store = Self { pool };
        store.create_tables().await?;
        Ok(store)
    }

    async fn create_tables(&self) -> BlogifyResult<()> {
        let query = r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                username TEXT UNIQUE NOT NULL,
                email TEXT UNIQUE NOT NULL,
                password_hash TEXT NOT NULL,
                role TEXT NOT NULL DEFAULT 'user',
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_users_email ON users(email);
        "#;

        sqlx::query(query)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("create_tables", e))?;

        info!("Users table ready");
        Ok(())
    }

    pub async fn insert(&self, user: UserData) -> BlogifyResult<UserData> {
        let result = sqlx::query(
            "INSERT INTO users (id, username, email, password_hash, role, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(user.id.as_str())
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.created_at.to_rfc3339())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {
                debug!(user_id = %user.id, "User row inserted");
                Ok(user)
            }
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(BlogifyError::Conflict {
                    message: "User with this email or username already exists".to_string(),
                    context: ErrorContext::new("users").with_operation("register"),
                })
            }
            Err(e) => Err(db_error("insert", e)),
        }
    }

    pub async fn get(&self, id: &UserId) -> BlogifyResult<Option<UserData>> {
        sqlx::query_as::<_, UserRecord>("SELECT * FROM users WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("get", e))?
            .map(UserRecord::into_user_data)
            .transpose()
    }

    pub async fn find_by_email(&self, email: &str) -> BlogifyResult<Option<UserData>> {
        sqlx::query_as::<_, UserRecord>("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("find_by_email", e))?
            .map(UserRecord::into_user_data)
            .transpose()
    }

    pub async fn list(&self) -> BlogifyResult<Vec<UserData>> {
        sqlx::query_as::<_, UserRecord>("SELECT * FROM users ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("list", e))?
            .into_iter()
            .map(UserRecord::into_user_data)
            .collect()
    }

    pub async fn set_role(&self, id: &UserId, role: Role) -> BlogifyResult<Option<UserData>> {
        let updated = sqlx::query("UPDATE users SET role = ? WHERE id = ?")
            .bind(role.as_str())
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("set_role", e))?;

        if updated.rows_affected() == 0 {
            return Ok(None);
        }
        self.get(id).await
    }

    pub async fn count(&self) -> BlogifyResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("count", e))?;
        Ok(count.max(0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn store() -> DatabaseUserStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        DatabaseUserStore::new(pool).await.unwrap()
    }

    #[tokio::test]
    async fn users_round_trip_through_sqlite() {
        let store = store().await;
        let user = UserData::new("alice", "alice@example.com", "secret1", Role::User).unwrap();
        store.insert(user.clone()).await.unwrap();

        let loaded = store.find_by_email("alice@example.com").await.unwrap().unwrap();
        assert_eq!(loaded.id, user.id);
        assert!(loaded.verify_password("secret1"));
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn unique_email_is_a_conflict() {
        let store = store().await;
        let first = UserData::new("alice", "alice@example.com", "secret1", Role::User).unwrap();
        let second = UserData::new("alice2", "alice@example.com", "secret1", Role::User).unwrap();
        store.insert(first).await.unwrap();

        let err = store.insert(second).await.unwrap_err();
        assert!(matches!(err, BlogifyError::Conflict { .. }));
    }

    #[tokio::test]
    async fn role_changes_persist() {
        let store = store().await;
        let user = UserData::new("alice", "alice@example.com", "secret1", Role::User).unwrap();
        store.insert(user.clone()).await.unwrap();

        let promoted = store.set_role(&user.id, Role::Admin).await.unwrap().unwrap();
        assert_eq!(promoted.role, Role::Admin);
        assert!(store
            .set_role(&UserId::from("missing"), Role::Admin)
            .await
            .unwrap()
            .is_none());
    }
}
