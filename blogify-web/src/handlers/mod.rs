//! HTTP request handlers for the Blogify web server
//!
//! Auth handlers live next to the account code in `crate::auth::handlers`.

pub mod admin;
pub mod health;
pub mod posts;
pub mod types;

pub use health::*;

// Re-export all types for convenience
pub use types::*;
