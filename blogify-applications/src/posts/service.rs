//! Post operations gated by the visibility policy

use std::sync::Arc;

use blogify_core::{not_found_error, OwnershipSource, PostId, Role};
use tracing::info;

use super::filter::SearchTerm;
use super::storage::PostStorage;
use super::types::{LikeStatus, NewPost, PageRequest, Pagination, Post, PostPage, PostStats, PostUpdate};
use crate::auth::identity::IdentityClaim;
use crate::auth::visibility::{can_mutate, can_read, listing_filter};
use crate::error::{AccessError, ApplicationResult};
use crate::posts::filter::PostFilter;

#[derive(Clone)]
pub struct PostService {
    storage: Arc<dyn PostStorage>,
}

impl PostService {
    pub fn new(storage: Arc<dyn PostStorage>) -> Self {
        Self { storage }
    }

    /// Paged listing scoped by the caller's identity
    pub async fn list(
        &self,
        identity: Option<&IdentityClaim>,
        page: PageRequest,
        search: Option<&str>,
    ) -> ApplicationResult<PostPage> {
        let filter = listing_filter(identity, search.and_then(SearchTerm::parse));
        self.page(&filter, page).await
    }

    /// Single post. Successful reads count as a view.
    pub async fn get(&self, identity: Option<&IdentityClaim>, id: &PostId) -> ApplicationResult<Post> {
        let mut post = self.load(id).await?;
        can_read(identity, &post.ownership_fact()).into_result()?;

        self.storage.increment_views(id).await?;
        post.views = post.views.saturating_add(1);
        Ok(post)
    }

    pub async fn create(
        &self,
        identity: &IdentityClaim,
        author_name: &str,
        new_post: NewPost,
    ) -> ApplicationResult<Post> {
        new_post.validate()?;
        let post = new_post.into_post(identity.subject_id().clone(), author_name);
        self.storage.insert(&post).await?;

        info!(post_id = %post.id, author = %post.author_id, published = post.published, "Post created");
        Ok(post)
    }

    pub async fn update(
        &self,
        identity: &IdentityClaim,
        id: &PostId,
        update: PostUpdate,
    ) -> ApplicationResult<Post> {
        let mut post = self.load(id).await?;
        can_mutate(identity, &post.ownership_fact()).into_result()?;
        update.validate()?;

        update.apply(&mut post);
        self.storage.update(&post).await?;

        info!(post_id = %post.id, "Post updated");
        Ok(post)
    }

    pub async fn delete(&self, identity: &IdentityClaim, id: &PostId) -> ApplicationResult<()> {
        let post = self.load(id).await?;
        can_mutate(identity, &post.ownership_fact()).into_result()?;

        self.storage.delete(id).await?;
        info!(post_id = %id, "Post deleted");
        Ok(())
    }

    /// Toggle the caller's like. Anything the caller can read may be liked.
    pub async fn toggle_like(
        &self,
        identity: &IdentityClaim,
        id: &PostId,
    ) -> ApplicationResult<LikeStatus> {
        let post = self.load(id).await?;
        can_read(Some(identity), &post.ownership_fact()).into_result()?;

        self.storage
            .toggle_like(id, identity.subject_id())
            .await?
            .ok_or_else(|| not_found_error!(format!("post {}", id), "posts").into())
    }

    /// Every post, newest first, regardless of publication state
    pub async fn admin_list(&self, admin: &IdentityClaim, page: PageRequest) -> ApplicationResult<PostPage> {
        ensure_admin(admin)?;
        self.page(&PostFilter::All, page).await
    }

    /// Delete any post. Only reachable through an admin-confirmed identity.
    pub async fn admin_delete(&self, admin: &IdentityClaim, id: &PostId) -> ApplicationResult<()> {
        ensure_admin(admin)?;
        if !self.storage.delete(id).await? {
            return Err(not_found_error!(format!("post {}", id), "posts").into());
        }
        info!(post_id = %id, admin = %admin.subject_id(), "Post deleted by admin");
        Ok(())
    }

    pub async fn admin_stats(&self, admin: &IdentityClaim) -> ApplicationResult<PostStats> {
        ensure_admin(admin)?;
        Ok(self.storage.stats().await?)
    }

    async fn load(&self, id: &PostId) -> ApplicationResult<Post> {
        self.storage
            .get(id)
            .await?
            .ok_or_else(|| not_found_error!(format!("post {}", id), "posts").into())
    }

    async fn page(&self, filter: &PostFilter, page: PageRequest) -> ApplicationResult<PostPage> {
        let (posts, total) = self.storage.list(filter, page).await?;
        Ok(PostPage {
            posts,
            pagination: Pagination::new(page, total),
        })
    }
}

/// Admin operations require a claim whose role came from a fresh lookup
fn ensure_admin(claim: &IdentityClaim) -> Result<(), AccessError> {
    match claim.role() {
        Some(Role::Admin) => Ok(()),
        _ => Err(AccessError::RoleInsufficient),
    }
}
