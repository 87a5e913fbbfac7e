//! Core data type definitions

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::logging::LoggingConfig;

/// Opaque account identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<String> for UserId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque post identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(String);

impl PostId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for PostId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<String> for PostId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for PostId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Account role, persisted on the user record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

/// Answer from the role lookup collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleLookupResult {
    pub exists: bool,
    pub role: Role,
}

impl RoleLookupResult {
    pub fn found(role: Role) -> Self {
        Self { exists: true, role }
    }

    pub fn missing() -> Self {
        Self {
            exists: false,
            role: Role::User,
        }
    }
}

/// Ownership and publication state of a resource, snapshotted for one policy decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnershipFact {
    pub owner_id: UserId,
    pub is_published: bool,
}

impl OwnershipFact {
    pub fn new(owner_id: UserId, is_published: bool) -> Self {
        Self {
            owner_id,
            is_published,
        }
    }
}

/// Service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BlogifyConfig {
    pub admission: AdmissionConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
}

/// Sliding-window admission settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdmissionConfig {
    /// Length of the rolling window in milliseconds
    pub window_ms: u64,
    /// Requests admitted per client within one window
    pub max_requests: usize,
    /// Period of the background sweep in milliseconds
    pub compaction_interval_ms: u64,
    /// Key clients on the first X-Forwarded-For entry instead of the socket peer
    pub trust_forwarded_for: bool,
}

/// Credential and identity settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC secret for bearer tokens. Normally supplied via JWT_SECRET.
    pub jwt_secret: String,
    pub clock_tolerance_ms: u64,
    pub token_ttl_secs: u64,
    /// Upper bound on the admin role lookup
    pub role_lookup_timeout_ms: u64,
    /// Whether reading a single post needs a credential
    pub require_login_to_read_post: bool,
}
