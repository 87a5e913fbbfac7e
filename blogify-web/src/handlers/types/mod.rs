//! Type definitions for handlers
//!
//! Request/response bodies for every endpoint, with their OpenAPI schemas.

pub mod admin;
pub mod common;
pub mod posts;

// Re-export all types for convenience
pub use admin::*;
pub use common::*;
pub use posts::*;
