//! Post domain types

use blogify_core::{
    validation_error, BlogifyResult, OwnershipFact, OwnershipSource, PostId, UserId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MAX_TITLE_LEN: usize = 200;
pub const EXCERPT_LEN: usize = 300;
pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Post {
    pub id: PostId,
    pub title: String,
    pub content: String,
    pub excerpt: String,
    pub tags: Vec<String>,
    pub featured_image: Option<String>,
    pub published: bool,
    pub author_id: UserId,
    pub author_name: String,
    pub views: u64,
    pub likes: Vec<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    /// Unpublished post with defaults for everything but the text
    pub fn draft(author_id: UserId, author_name: &str, title: &str, content: &str) -> Self {
        let now = Utc::now();
        Self {
            id: PostId::new(),
            title: title.to_string(),
            content: content.to_string(),
            excerpt: default_excerpt(content),
            tags: Vec::new(),
            featured_image: None,
            published: false,
            author_id,
            author_name: author_name.to_string(),
            views: 0,
            likes: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_liked_by(&self, user_id: &UserId) -> bool {
        self.likes.iter().any(|id| id == user_id)
    }
}

impl OwnershipSource for Post {
    fn ownership_fact(&self) -> OwnershipFact {
        OwnershipFact::new(self.author_id.clone(), self.published)
    }
}

/// First `EXCERPT_LEN` characters of the content
pub fn default_excerpt(content: &str) -> String {
    content.chars().take(EXCERPT_LEN).collect()
}

fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().to_string();
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub excerpt: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub featured_image: Option<String>,
    #[serde(default)]
    pub published: bool,
}

impl NewPost {
    pub fn validate(&self) -> BlogifyResult<()> {
        validate_title(&self.title)?;
        validate_content(&self.content)?;
        if let Some(excerpt) = &self.excerpt {
            validate_excerpt(excerpt)?;
        }
        Ok(())
    }

    pub fn into_post(self, author_id: UserId, author_name: &str) -> Post {
        let mut post = Post::draft(author_id, author_name, self.title.trim(), &self.content);
        if let Some(excerpt) = self.excerpt.filter(|e| !e.trim().is_empty()) {
            post.excerpt = excerpt;
        }
        post.tags = normalize_tags(self.tags);
        post.featured_image = self.featured_image;
        post.published = self.published;
        post
    }
}

/// Partial update; absent fields keep their stored value
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub tags: Option<Vec<String>>,
    pub featured_image: Option<String>,
    pub published: Option<bool>,
}

impl PostUpdate {
    pub fn validate(&self) -> BlogifyResult<()> {
        if let Some(title) = &self.title {
            validate_title(title)?;
        }
        if let Some(content) = &self.content {
            validate_content(content)?;
        }
        if let Some(excerpt) = &self.excerpt {
            validate_excerpt(excerpt)?;
        }
        Ok(())
    }

    pub fn apply(self, post: &mut Post) {
        if let Some(title) = self.title {
            post.title = title.trim().to_string();
        }
        if let Some(content) = self.content {
            post.content = content;
        }
        if let Some(excerpt) = self.excerpt {
            post.excerpt = excerpt;
        }
        if let Some(tags) = self.tags {
            post.tags = normalize_tags(tags);
        }
        if let Some(image) = self.featured_image {
            post.featured_image = Some(image).filter(|i| !i.is_empty());
        }
        if let Some(published) = self.published {
            post.published = published;
        }
        post.updated_at = Utc::now();
    }
}

fn validate_title(title: &str) -> BlogifyResult<()> {
    let title = title.trim();
    if title.is_empty() {
        return Err(validation_error!("Title is required", "title", "posts"));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(validation_error!(
            format!("Title cannot exceed {} characters", MAX_TITLE_LEN),
            "title",
            "posts"
        ));
    }
    Ok(())
}

fn validate_content(content: &str) -> BlogifyResult<()> {
    if content.trim().is_empty() {
        return Err(validation_error!("Content is required", "content", "posts"));
    }
    Ok(())
}

fn validate_excerpt(excerpt: &str) -> BlogifyResult<()> {
    if excerpt.chars().count() > EXCERPT_LEN {
        return Err(validation_error!(
            format!("Excerpt cannot exceed {} characters", EXCERPT_LEN),
            "excerpt",
            "posts"
        ));
    }
    Ok(())
}

/// Page request, clamped to sane bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: u64,
    pub total_posts: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    pub fn new(request: PageRequest, total_posts: u64) -> Self {
        let total_pages = total_posts.div_ceil(u64::from(request.limit));
        Self {
            current_page: request.page,
            total_pages,
            total_posts,
            has_next: u64::from(request.page) < total_pages,
            has_prev: request.page > 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PostPage {
    pub posts: Vec<Post>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct LikeStatus {
    pub likes: u64,
    pub is_liked: bool,
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct PostStats {
    pub total_posts: u64,
    pub published_posts: u64,
    pub draft_posts: u64,
    pub total_views: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excerpt_defaults_to_leading_content() {
        let content = "é".repeat(400);
        let post = NewPost {
            title: "t".into(),
            content: content.clone(),
            ..Default::default()
        }
        .into_post(UserId::from("a"), "alice");

        assert_eq!(post.excerpt.chars().count(), EXCERPT_LEN);
        assert!(!post.published);
        assert!(post.tags.is_empty());
    }

    #[test]
    fn title_and_content_are_required() {
        let missing_title = NewPost {
            content: "body".into(),
            ..Default::default()
        };
        assert!(missing_title.validate().is_err());

        let missing_content = NewPost {
            title: "t".into(),
            content: "  ".into(),
            ..Default::default()
        };
        assert!(missing_content.validate().is_err());
    }

    #[test]
    fn update_keeps_unspecified_fields() {
        let mut post = Post::draft(UserId::from("a"), "alice", "Old", "body");
        post.published = true;

        PostUpdate {
            title: Some("New".into()),
            ..Default::default()
        }
        .apply(&mut post);

        assert_eq!(post.title, "New");
        assert!(post.published);
        assert_eq!(post.content, "body");
    }

    #[test]
    fn pagination_math() {
        let p = Pagination::new(PageRequest::new(Some(2), Some(10)), 25);
        assert_eq!(p.total_pages, 3);
        assert!(p.has_next && p.has_prev);

        let req = PageRequest::new(Some(0), Some(1000));
        assert_eq!(req.page, 1);
        assert_eq!(req.limit, MAX_PAGE_SIZE);
        assert_eq!(PageRequest::new(Some(3), Some(5)).offset(), 10);

        let empty = Pagination::new(PageRequest::default(), 0);
        assert_eq!(empty.total_pages, 0);
        assert!(!empty.has_next && !empty.has_prev);
    }

    #[test]
    fn tags_are_trimmed_and_deduplicated() {
        let post = NewPost {
            title: "t".into(),
            content: "c".into(),
            tags: vec![" rust ".into(), "rust".into(), "".into(), "web".into()],
            ..Default::default()
        }
        .into_post(UserId::from("a"), "alice");
        assert_eq!(post.tags, vec!["rust".to_string(), "web".to_string()]);
    }
}
