//! Authentication and authorization
//!
//! - `token`: HS256 bearer credential issuing and verification
//! - `identity`: the three identity resolution modes
//! - `visibility`: read/mutate decisions over ownership facts

pub mod identity;
pub mod token;
pub mod visibility;

pub use identity::{IdentityClaim, IdentityMode, IdentityResolver};
pub use token::{extract_bearer, Claims, TokenIssuer, TokenVerifier, VerificationError};
pub use visibility::{can_mutate, can_read, listing_filter, Decision, DenyReason};
