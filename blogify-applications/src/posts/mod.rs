//! Post domain: types, listing filters, storage backends and the gated service

pub mod filter;
pub mod service;
pub mod storage;
pub mod types;

pub use filter::{PostFilter, SearchTerm};
pub use service::PostService;
pub use storage::{MemoryPostStorage, PostStorage};
#[cfg(feature = "sqlite")]
pub use storage::SqlitePostStorage;
pub use types::{
    default_excerpt, LikeStatus, NewPost, PageRequest, Pagination, Post, PostPage, PostStats,
    PostUpdate,
};
