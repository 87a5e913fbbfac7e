//! Blogify Applications - access control and the post domain
//!
//! This crate holds everything between the HTTP layer and storage:
//!
//! - Bearer token issuing and verification
//! - Identity resolution in `Required`, `Optional` and `AdminOnly` modes
//! - The read/mutate visibility policy and listing filters
//! - Post storage backends and the service that applies the policy
//!
//! ## Architecture
//!
//! - **Core** (blogify-core): errors, configuration, shared types
//! - **Applications** (this crate): policy and domain logic
//! - **Presentation** (blogify-web): routing, admission control, accounts

pub mod auth;
pub mod error;
pub mod posts;

pub use auth::{
    can_mutate, can_read, extract_bearer, listing_filter, Claims, Decision, DenyReason,
    IdentityClaim, IdentityMode, IdentityResolver, TokenIssuer, TokenVerifier, VerificationError,
};
pub use error::{AccessError, ApplicationError, ApplicationResult};
pub use posts::{
    LikeStatus, MemoryPostStorage, NewPost, PageRequest, Pagination, Post, PostFilter, PostPage,
    PostService, PostStats, PostStorage, PostUpdate, SearchTerm,
};
#[cfg(feature = "sqlite")]
pub use posts::SqlitePostStorage;
