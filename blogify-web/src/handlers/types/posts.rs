//! Post request and response types

use blogify_applications::{LikeStatus, NewPost, Pagination, Post, PostPage, PostUpdate};
use blogify_core::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Listing query parameters
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListPostsQuery {
    /// Page number, starting at 1
    #[param(example = 1)]
    pub page: Option<u32>,
    /// Page size, at most 100
    #[param(example = 10)]
    pub limit: Option<u32>,
    /// Case-insensitive match on title, content or tags
    pub search: Option<String>,
}

/// Create post request
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePostRequest {
    #[schema(example = "Hello, world")]
    pub title: String,
    pub content: String,
    pub excerpt: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub featured_image: Option<String>,
    #[serde(default)]
    pub published: bool,
}

impl From<CreatePostRequest> for NewPost {
    fn from(req: CreatePostRequest) -> Self {
        NewPost {
            title: req.title,
            content: req.content,
            excerpt: req.excerpt,
            tags: req.tags,
            featured_image: req.featured_image,
            published: req.published,
        }
    }
}

/// Partial post update; omitted fields are left unchanged
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdatePostRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub tags: Option<Vec<String>>,
    pub featured_image: Option<String>,
    pub published: Option<bool>,
}

impl From<UpdatePostRequest> for PostUpdate {
    fn from(req: UpdatePostRequest) -> Self {
        PostUpdate {
            title: req.title,
            content: req.content,
            excerpt: req.excerpt,
            tags: req.tags,
            featured_image: req.featured_image,
            published: req.published,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthorInfo {
    pub id: String,
    pub username: String,
}

/// Post as returned to clients
#[derive(Debug, Serialize, ToSchema)]
pub struct PostResponse {
    pub id: String,
    pub title: String,
    pub content: String,
    pub excerpt: String,
    pub tags: Vec<String>,
    pub featured_image: Option<String>,
    pub published: bool,
    pub author: AuthorInfo,
    pub views: u64,
    pub likes: u64,
    /// Whether the caller has liked this post; false for anonymous callers
    pub is_liked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PostResponse {
    pub fn from_post(post: Post, viewer: Option<&UserId>) -> Self {
        let is_liked = viewer.is_some_and(|id| post.is_liked_by(id));
        Self {
            id: post.id.to_string(),
            title: post.title,
            content: post.content,
            excerpt: post.excerpt,
            tags: post.tags,
            featured_image: post.featured_image,
            published: post.published,
            author: AuthorInfo {
                id: post.author_id.to_string(),
                username: post.author_name,
            },
            views: post.views,
            likes: post.likes.len() as u64,
            is_liked,
            created_at: post.created_at,
            updated_at: post.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginationInfo {
    pub current_page: u32,
    pub total_pages: u64,
    pub total_posts: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl From<Pagination> for PaginationInfo {
    fn from(p: Pagination) -> Self {
        Self {
            current_page: p.current_page,
            total_pages: p.total_pages,
            total_posts: p.total_posts,
            has_next: p.has_next,
            has_prev: p.has_prev,
        }
    }
}

/// One page of posts
#[derive(Debug, Serialize, ToSchema)]
pub struct PostListResponse {
    pub posts: Vec<PostResponse>,
    pub pagination: PaginationInfo,
}

impl PostListResponse {
    pub fn from_page(page: PostPage, viewer: Option<&UserId>) -> Self {
        Self {
            posts: page
                .posts
                .into_iter()
                .map(|post| PostResponse::from_post(post, viewer))
                .collect(),
            pagination: page.pagination.into(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LikeResponse {
    pub likes: u64,
    pub is_liked: bool,
}

impl From<LikeStatus> for LikeResponse {
    fn from(status: LikeStatus) -> Self {
        Self {
            likes: status.likes,
            is_liked: status.is_liked,
        }
    }
}
