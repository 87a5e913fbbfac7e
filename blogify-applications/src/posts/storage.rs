//! Post storage backends
//!
//! In-memory storage for development and tests, SQLite behind the `sqlite` feature.

use async_trait::async_trait;
use blogify_core::{BlogifyResult, PostId, UserId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use super::filter::{fold, PostFilter};
use super::types::{LikeStatus, PageRequest, Post, PostStats};

/// Persistence collaborator for posts
#[async_trait]
pub trait PostStorage: Send + Sync {
    async fn insert(&self, post: &Post) -> BlogifyResult<()>;

    async fn get(&self, id: &PostId) -> BlogifyResult<Option<Post>>;

    /// Replace the stored post with the same id. Views and likes are not touched.
    async fn update(&self, post: &Post) -> BlogifyResult<()>;

    /// Returns whether a post was removed
    async fn delete(&self, id: &PostId) -> BlogifyResult<bool>;

    /// Matching posts, newest first, plus the total match count
    async fn list(&self, filter: &PostFilter, page: PageRequest)
        -> BlogifyResult<(Vec<Post>, u64)>;

    async fn increment_views(&self, id: &PostId) -> BlogifyResult<()>;

    /// Flip `user_id`'s like; `None` when the post does not exist
    async fn toggle_like(&self, id: &PostId, user_id: &UserId)
        -> BlogifyResult<Option<LikeStatus>>;

    async fn stats(&self) -> BlogifyResult<PostStats>;
}

/// In-memory post storage
#[derive(Default, Clone)]
pub struct MemoryPostStorage {
    posts: Arc<RwLock<HashMap<PostId, Post>>>,
}

impl MemoryPostStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PostStorage for MemoryPostStorage {
    async fn insert(&self, post: &Post) -> BlogifyResult<()> {
        self.posts.write().await.insert(post.id.clone(), post.clone());
        debug!("Stored post {} in memory", post.id);
        Ok(())
    }

    async fn get(&self, id: &PostId) -> BlogifyResult<Option<Post>> {
        Ok(self.posts.read().await.get(id).cloned())
    }

    async fn update(&self, post: &Post) -> BlogifyResult<()> {
        let mut posts = self.posts.write().await;
        if let Some(existing) = posts.get_mut(&post.id) {
            let views = existing.views;
            let likes = std::mem::take(&mut existing.likes);
            *existing = post.clone();
            existing.views = views;
            existing.likes = likes;
        }
        Ok(())
    }

    async fn delete(&self, id: &PostId) -> BlogifyResult<bool> {
        Ok(self.posts.write().await.remove(id).is_some())
    }

    async fn list(
        &self,
        filter: &PostFilter,
        page: PageRequest,
    ) -> BlogifyResult<(Vec<Post>, u64)> {
        let posts = self.posts.read().await;
        let mut matching: Vec<&Post> = posts.values().filter(|p| filter.matches(p)).collect();
        matching.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.as_str().cmp(b.id.as_str()))
        });

        let total = matching.len() as u64;
        let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let items = matching
            .into_iter()
            .skip(offset)
            .take(page.limit as usize)
            .cloned()
            .collect();
        Ok((items, total))
    }

    async fn increment_views(&self, id: &PostId) -> BlogifyResult<()> {
        if let Some(post) = self.posts.write().await.get_mut(id) {
            post.views = post.views.saturating_add(1);
        }
        Ok(())
    }

    async fn toggle_like(
        &self,
        id: &PostId,
        user_id: &UserId,
    ) -> BlogifyResult<Option<LikeStatus>> {
        let mut posts = self.posts.write().await;
        let Some(post) = posts.get_mut(id) else {
            return Ok(None);
        };

        let is_liked = if post.is_liked_by(user_id) {
            post.likes.retain(|id| id != user_id);
            false
        } else {
            post.likes.push(user_id.clone());
            true
        };

        Ok(Some(LikeStatus {
            likes: post.likes.len() as u64,
            is_liked,
        }))
    }

    async fn stats(&self) -> BlogifyResult<PostStats> {
        let posts = self.posts.read().await;
        let mut stats = PostStats::default();
        for post in posts.values() {
            stats.total_posts += 1;
            if post.published {
                stats.published_posts += 1;
            } else {
                stats.draft_posts += 1;
            }
            stats.total_views = stats.total_views.saturating_add(post.views);
        }
        Ok(stats)
    }
}

#[cfg(feature = "sqlite")]
pub use sqlite::SqlitePostStorage;

#[cfg(feature = "sqlite")]
mod sqlite {
    use super::*;
    use blogify_core::storage_error;
    use chrono::{DateTime, SecondsFormat, Utc};
    use sqlx::{Row, SqlitePool};
    use tracing::info;

    const COMPONENT: &str = "sqlite_post_storage";

    #[derive(Debug, sqlx::FromRow)]
    struct PostRecord {
        id: String,
        title: String,
        content: String,
        excerpt: String,
        featured_image: Option<String>,
        published: bool,
        author_id: String,
        author_name: String,
        views: i64,
        created_at: String,
        updated_at: String,
    }

    fn parse_time(value: &str) -> BlogifyResult<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(value)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| storage_error!(format!("Invalid timestamp {}", value), COMPONENT, e))
    }

    fn format_time(value: &DateTime<Utc>) -> String {
        value.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    /// SQLite post storage
    #[derive(Clone)]
    pub struct SqlitePostStorage {
        pool: SqlitePool,
    }

    impl SqlitePostStorage {
        pub async fn new(pool: SqlitePool) -> BlogifyResult<Self> {
            let storage = Self { pool };
            storage.create_tables().await?;
            Ok(storage)
        }

        async fn create_tables(&self) -> BlogifyResult<()> {
            let query = r#"
                CREATE TABLE IF NOT EXISTS posts (
                    id TEXT PRIMARY KEY,
                    title TEXT NOT NULL,
                    content TEXT NOT NULL,
                    title_folded TEXT NOT NULL,
                    content_folded TEXT NOT NULL,
                    excerpt TEXT NOT NULL DEFAULT '',
                    featured_image TEXT,
                    published BOOLEAN NOT NULL DEFAULT FALSE,
                    author_id TEXT NOT NULL,
                    author_name TEXT NOT NULL,
                    views INTEGER NOT NULL DEFAULT 0,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS post_tags (
                    post_id TEXT NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
                    position INTEGER NOT NULL,
                    tag TEXT NOT NULL,
                    tag_folded TEXT NOT NULL,
                    PRIMARY KEY (post_id, position)
                );

                CREATE TABLE IF NOT EXISTS post_likes (
                    post_id TEXT NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
                    user_id TEXT NOT NULL,
                    PRIMARY KEY (post_id, user_id)
                );

                CREATE INDEX IF NOT EXISTS idx_posts_created_at ON posts(created_at);
                CREATE INDEX IF NOT EXISTS idx_posts_author ON posts(author_id);
            "#;

            sqlx::query(query)
                .execute(&self.pool)
                .await
                .map_err(|e| storage_error!("Failed to create post tables", COMPONENT, e))?;

            info!("Post tables ready");
            Ok(())
        }

        async fn hydrate(&self, record: PostRecord) -> BlogifyResult<Post> {
            let tags: Vec<String> =
                sqlx::query_scalar("SELECT tag FROM post_tags WHERE post_id = ? ORDER BY position")
                    .bind(&record.id)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(|e| storage_error!("Failed to load post tags", COMPONENT, e))?;

            let likes: Vec<String> =
                sqlx::query_scalar("SELECT user_id FROM post_likes WHERE post_id = ? ORDER BY rowid")
                    .bind(&record.id)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(|e| storage_error!("Failed to load post likes", COMPONENT, e))?;

            Ok(Post {
                id: PostId::from(record.id),
                title: record.title,
                content: record.content,
                excerpt: record.excerpt,
                tags,
                featured_image: record.featured_image,
                published: record.published,
                author_id: UserId::from(record.author_id),
                author_name: record.author_name,
                views: u64::try_from(record.views).unwrap_or(0),
                likes: likes.into_iter().map(UserId::from).collect(),
                created_at: parse_time(&record.created_at)?,
                updated_at: parse_time(&record.updated_at)?,
            })
        }

        async fn write_tags(
            tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
            post: &Post,
        ) -> BlogifyResult<()> {
            sqlx::query("DELETE FROM post_tags WHERE post_id = ?")
                .bind(post.id.as_str())
                .execute(&mut **tx)
                .await
                .map_err(|e| storage_error!("Failed to clear post tags", COMPONENT, e))?;

            for (position, tag) in post.tags.iter().enumerate() {
                sqlx::query(
                    "INSERT INTO post_tags (post_id, position, tag, tag_folded) VALUES (?, ?, ?, ?)",
                )
                .bind(post.id.as_str())
                .bind(position as i64)
                .bind(tag)
                .bind(fold(tag))
                .execute(&mut **tx)
                .await
                .map_err(|e| storage_error!("Failed to store post tag", COMPONENT, e))?;
            }
            Ok(())
        }
    }

    #[async_trait]
    impl PostStorage for SqlitePostStorage {
        async fn insert(&self, post: &Post) -> BlogifyResult<()> {
            let mut tx = self
                .pool
                .begin()
                .await
                .map_err(|e| storage_error!("Failed to begin transaction", COMPONENT, e))?;

            sqlx::query(
                r#"
                INSERT INTO posts
                (id, title, content, title_folded, content_folded, excerpt, featured_image, published, author_id, author_name, views, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(post.id.as_str())
            .bind(&post.title)
            .bind(&post.content)
            .bind(fold(&post.title))
            .bind(fold(&post.content))
            .bind(&post.excerpt)
            .bind(&post.featured_image)
            .bind(post.published)
            .bind(post.author_id.as_str())
            .bind(&post.author_name)
            .bind(i64::try_from(post.views).unwrap_or(i64::MAX))
            .bind(format_time(&post.created_at))
            .bind(format_time(&post.updated_at))
            .execute(&mut *tx)
            .await
            .map_err(|e| storage_error!("Failed to insert post", COMPONENT, e))?;

            Self::write_tags(&mut tx, post).await?;

            tx.commit()
                .await
                .map_err(|e| storage_error!("Failed to commit post", COMPONENT, e))?;

            debug!("Saved post {} to SQLite storage", post.id);
            Ok(())
        }

        async fn get(&self, id: &PostId) -> BlogifyResult<Option<Post>> {
            let record = sqlx::query_as::<_, PostRecord>("SELECT * FROM posts WHERE id = ?")
                .bind(id.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| storage_error!("Failed to load post", COMPONENT, e))?;

            match record {
                Some(record) => Ok(Some(self.hydrate(record).await?)),
                None => Ok(None),
            }
        }

        async fn update(&self, post: &Post) -> BlogifyResult<()> {
            let mut tx = self
                .pool
                .begin()
                .await
                .map_err(|e| storage_error!("Failed to begin transaction", COMPONENT, e))?;

            sqlx::query(
                r#"
                UPDATE posts
                SET title = ?, content = ?, title_folded = ?, content_folded = ?,
                    excerpt = ?, featured_image = ?, published = ?, updated_at = ?
                WHERE id = ?
                "#,
            )
            .bind(&post.title)
            .bind(&post.content)
            .bind(fold(&post.title))
            .bind(fold(&post.content))
            .bind(&post.excerpt)
            .bind(&post.featured_image)
            .bind(post.published)
            .bind(format_time(&post.updated_at))
            .bind(post.id.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| storage_error!("Failed to update post", COMPONENT, e))?;

            Self::write_tags(&mut tx, post).await?;

            tx.commit()
                .await
                .map_err(|e| storage_error!("Failed to commit post update", COMPONENT, e))?;
            Ok(())
        }

        async fn delete(&self, id: &PostId) -> BlogifyResult<bool> {
            let mut tx = self
                .pool
                .begin()
                .await
                .map_err(|e| storage_error!("Failed to begin transaction", COMPONENT, e))?;

            for table in ["post_tags", "post_likes"] {
                sqlx::query(&format!("DELETE FROM {} WHERE post_id = ?", table))
                    .bind(id.as_str())
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| storage_error!("Failed to delete post children", COMPONENT, e))?;
            }

            let result = sqlx::query("DELETE FROM posts WHERE id = ?")
                .bind(id.as_str())
                .execute(&mut *tx)
                .await
                .map_err(|e| storage_error!("Failed to delete post", COMPONENT, e))?;

            tx.commit()
                .await
                .map_err(|e| storage_error!("Failed to commit delete", COMPONENT, e))?;

            Ok(result.rows_affected() > 0)
        }

        async fn list(
            &self,
            filter: &PostFilter,
            page: PageRequest,
        ) -> BlogifyResult<(Vec<Post>, u64)> {
            let mut binds = Vec::new();
            let condition = filter.to_sql(&mut binds);

            let count_sql = format!("SELECT COUNT(*) FROM posts WHERE {}", condition);
            let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
            for value in &binds {
                count_query = count_query.bind(value);
            }
            let total = count_query
                .fetch_one(&self.pool)
                .await
                .map_err(|e| storage_error!("Failed to count posts", COMPONENT, e))?;

            let list_sql = format!(
                "SELECT * FROM posts WHERE {} ORDER BY created_at DESC, id ASC LIMIT ? OFFSET ?",
                condition
            );
            let mut list_query = sqlx::query_as::<_, PostRecord>(&list_sql);
            for value in &binds {
                list_query = list_query.bind(value);
            }
            let records = list_query
                .bind(i64::from(page.limit))
                .bind(i64::try_from(page.offset()).unwrap_or(i64::MAX))
                .fetch_all(&self.pool)
                .await
                .map_err(|e| storage_error!("Failed to list posts", COMPONENT, e))?;

            let mut posts = Vec::with_capacity(records.len());
            for record in records {
                posts.push(self.hydrate(record).await?);
            }

            Ok((posts, u64::try_from(total).unwrap_or(0)))
        }

        async fn increment_views(&self, id: &PostId) -> BlogifyResult<()> {
            sqlx::query("UPDATE posts SET views = views + 1 WHERE id = ?")
                .bind(id.as_str())
                .execute(&self.pool)
                .await
                .map_err(|e| storage_error!("Failed to increment views", COMPONENT, e))?;
            Ok(())
        }

        async fn toggle_like(
            &self,
            id: &PostId,
            user_id: &UserId,
        ) -> BlogifyResult<Option<LikeStatus>> {
            let mut tx = self
                .pool
                .begin()
                .await
                .map_err(|e| storage_error!("Failed to begin transaction", COMPONENT, e))?;

            let exists: Option<String> = sqlx::query_scalar("SELECT id FROM posts WHERE id = ?")
                .bind(id.as_str())
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| storage_error!("Failed to load post", COMPONENT, e))?;
            if exists.is_none() {
                return Ok(None);
            }

            let removed = sqlx::query("DELETE FROM post_likes WHERE post_id = ? AND user_id = ?")
                .bind(id.as_str())
                .bind(user_id.as_str())
                .execute(&mut *tx)
                .await
                .map_err(|e| storage_error!("Failed to remove like", COMPONENT, e))?
                .rows_affected();

            if removed == 0 {
                sqlx::query("INSERT INTO post_likes (post_id, user_id) VALUES (?, ?)")
                    .bind(id.as_str())
                    .bind(user_id.as_str())
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| storage_error!("Failed to add like", COMPONENT, e))?;
            }

            let likes: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM post_likes WHERE post_id = ?")
                .bind(id.as_str())
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| storage_error!("Failed to count likes", COMPONENT, e))?;

            tx.commit()
                .await
                .map_err(|e| storage_error!("Failed to commit like", COMPONENT, e))?;

            Ok(Some(LikeStatus {
                likes: u64::try_from(likes).unwrap_or(0),
                is_liked: removed == 0,
            }))
        }

        async fn stats(&self) -> BlogifyResult<PostStats> {
            let row = sqlx::query(
                r#"
                SELECT COUNT(*) AS total,
                       COALESCE(SUM(CASE WHEN published THEN 1 ELSE 0 END), 0) AS published,
                       COALESCE(SUM(views), 0) AS views
                FROM posts
                "#,
            )
            .fetch_one(&self.pool)
            .await
            .map_err(|e| storage_error!("Failed to compute post stats", COMPONENT, e))?;

            let total: i64 = row.try_get("total").unwrap_or(0);
            let published: i64 = row.try_get("published").unwrap_or(0);
            let views: i64 = row.try_get("views").unwrap_or(0);

            Ok(PostStats {
                total_posts: total as u64,
                published_posts: published as u64,
                draft_posts: (total - published).max(0) as u64,
                total_views: views as u64,
            })
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::visibility::listing_filter;

    #[tokio::test]
    async fn memory_list_pages_newest_first() {
        let storage = MemoryPostStorage::new();
        let base = chrono::Utc::now();
        for i in 0..5 {
            let mut p = Post::draft(UserId::from("a"), "a", &format!("post {}", i), "c");
            p.published = true;
            p.created_at = base + chrono::Duration::seconds(i);
            storage.insert(&p).await.unwrap();
        }

        let (page, total) = storage
            .list(&listing_filter(None, None), PageRequest::new(Some(1), Some(2)))
            .await
            .unwrap();
        assert_eq!(total, 5);
        assert_eq!(page[0].title, "post 4");
        assert_eq!(page[1].title, "post 3");
    }

    #[tokio::test]
    async fn update_preserves_counters() {
        let storage = MemoryPostStorage::new();
        let mut p = Post::draft(UserId::from("a"), "a", "t", "c");
        storage.insert(&p).await.unwrap();
        storage.increment_views(&p.id).await.unwrap();
        storage.toggle_like(&p.id, &UserId::from("b")).await.unwrap();

        p.title = "changed".into();
        storage.update(&p).await.unwrap();

        let loaded = storage.get(&p.id).await.unwrap().unwrap();
        assert_eq!(loaded.title, "changed");
        assert_eq!(loaded.views, 1);
        assert_eq!(loaded.likes.len(), 1);
    }

    #[cfg(feature = "sqlite")]
    #[tokio::test]
    async fn search_results_match_across_backends() {
        use crate::posts::filter::SearchTerm;
        use sqlx::sqlite::SqlitePoolOptions;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let sqlite = SqlitePostStorage::new(pool).await.unwrap();
        let memory = MemoryPostStorage::new();

        let base = chrono::Utc::now();
        let samples = [
            ("Été à Paris", "voyage", vec![]),
            ("Winter", "ÉTÉ prochain", vec![]),
            ("Tagged", "body", vec!["ÉtÉ".to_string()]),
            ("Unrelated", "ete without accents", vec![]),
        ];
        for (i, (title, content, tags)) in samples.into_iter().enumerate() {
            let mut p = Post::draft(UserId::from("a"), "a", title, content);
            p.tags = tags;
            p.published = true;
            p.created_at = base + chrono::Duration::seconds(i as i64);
            memory.insert(&p).await.unwrap();
            sqlite.insert(&p).await.unwrap();
        }

        for search in ["ÉTÉ", "été", "PARIS", "ete"] {
            let filter = listing_filter(None, SearchTerm::parse(search));
            let (from_memory, memory_total) =
                memory.list(&filter, PageRequest::default()).await.unwrap();
            let (from_sqlite, sqlite_total) =
                sqlite.list(&filter, PageRequest::default()).await.unwrap();

            let memory_ids: Vec<_> = from_memory.iter().map(|p| p.id.clone()).collect();
            let sqlite_ids: Vec<_> = from_sqlite.iter().map(|p| p.id.clone()).collect();
            assert_eq!(memory_total, sqlite_total, "total for {:?}", search);
            assert_eq!(memory_ids, sqlite_ids, "posts for {:?}", search);
        }

        let filter = listing_filter(None, SearchTerm::parse("ÉTÉ"));
        let (_, total) = sqlite.list(&filter, PageRequest::default()).await.unwrap();
        assert_eq!(total, 3);
    }
}
