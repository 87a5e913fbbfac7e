//! Identity resolution
//!
//! One resolver, three modes. Routes pick a mode; verification and the admin
//! role check live here and nowhere else.

use std::sync::Arc;

use blogify_core::{with_timeout, AuthConfig, Role, RoleLookup, UserId};
use tracing::{debug, warn};

use super::token::{extract_bearer, TokenVerifier};
use crate::error::AccessError;

/// Verified identity attached to a request.
///
/// Only the token verifier and the resolver can construct or elevate one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityClaim {
    subject_id: UserId,
    role: Option<Role>,
}

impl IdentityClaim {
    pub(crate) fn verified(subject_id: UserId) -> Self {
        Self {
            subject_id,
            role: None,
        }
    }

    pub(crate) fn with_role(self, role: Role) -> Self {
        Self {
            role: Some(role),
            ..self
        }
    }

    pub fn subject_id(&self) -> &UserId {
        &self.subject_id
    }

    /// Role confirmed by a fresh lookup; only set on admin-gated requests
    pub fn role(&self) -> Option<Role> {
        self.role
    }

    pub fn is_subject(&self, user_id: &UserId) -> bool {
        &self.subject_id == user_id
    }
}

/// How a route treats the caller's credential
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityMode {
    /// Reject when the credential is absent or invalid
    Required,
    /// Attach identity when valid, otherwise continue anonymously
    Optional,
    /// Required, plus a fresh role lookup confirming admin
    AdminOnly,
}

impl std::fmt::Display for IdentityMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdentityMode::Required => write!(f, "required"),
            IdentityMode::Optional => write!(f, "optional"),
            IdentityMode::AdminOnly => write!(f, "admin_only"),
        }
    }
}

pub struct IdentityResolver {
    verifier: TokenVerifier,
    role_lookup: Arc<dyn RoleLookup>,
    role_lookup_timeout_ms: u64,
}

impl IdentityResolver {
    pub fn new(
        verifier: TokenVerifier,
        role_lookup: Arc<dyn RoleLookup>,
        role_lookup_timeout_ms: u64,
    ) -> Self {
        Self {
            verifier,
            role_lookup,
            role_lookup_timeout_ms,
        }
    }

    pub fn from_config(config: &AuthConfig, role_lookup: Arc<dyn RoleLookup>) -> Self {
        Self::new(
            TokenVerifier::from_config(config),
            role_lookup,
            config.role_lookup_timeout_ms,
        )
    }

    /// Resolve the caller's identity from the raw `Authorization` header.
    ///
    /// `Ok(None)` is only ever returned in `Optional` mode.
    pub async fn resolve(
        &self,
        mode: IdentityMode,
        authorization: Option<&str>,
    ) -> Result<Option<IdentityClaim>, AccessError> {
        match mode {
            IdentityMode::Required => self.require(authorization).map(Some),
            IdentityMode::Optional => Ok(self.attach_if_valid(authorization)),
            IdentityMode::AdminOnly => self.require_admin(authorization).await.map(Some),
        }
    }

    fn require(&self, authorization: Option<&str>) -> Result<IdentityClaim, AccessError> {
        let token = extract_bearer(authorization)?;
        Ok(self.verifier.verify(token)?)
    }

    fn attach_if_valid(&self, authorization: Option<&str>) -> Option<IdentityClaim> {
        match self.require(authorization) {
            Ok(claim) => Some(claim),
            Err(AccessError::CredentialMissing) => None,
            Err(e) => {
                debug!(reason = %e.code(), "Ignoring invalid credential on optional route");
                None
            }
        }
    }

    async fn require_admin(
        &self,
        authorization: Option<&str>,
    ) -> Result<IdentityClaim, AccessError> {
        let claim = self.require(authorization)?;
        let subject = claim.subject_id().clone();

        let lookup = with_timeout(
            self.role_lookup.lookup_role(&subject),
            self.role_lookup_timeout_ms,
            "role_lookup",
        )
        .await;

        let record = match lookup {
            Ok(Ok(record)) => record,
            Ok(Err(e)) => {
                e.log();
                warn!(subject = %subject, "Role lookup failed, denying admin access");
                return Err(AccessError::RoleInsufficient);
            }
            Err(_) => {
                warn!(subject = %subject, "Role lookup timed out, denying admin access");
                return Err(AccessError::RoleInsufficient);
            }
        };

        if !record.exists {
            warn!(subject = %subject, "Admin check for deleted account");
            return Err(AccessError::IdentityNotFound);
        }

        if !record.role.is_admin() {
            warn!(subject = %subject, role = %record.role, "Admin access denied");
            return Err(AccessError::RoleInsufficient);
        }

        Ok(claim.with_role(record.role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::token::{TokenIssuer, VerificationError};
    use async_trait::async_trait;
    use blogify_core::{storage_error, BlogifyResult, RoleLookupResult};
    use std::collections::HashMap;
    use std::time::Duration;

    const SECRET: &[u8] = b"identity-test-secret-abcdef";

    enum Lookup {
        Table(HashMap<UserId, Role>),
        Failing,
        Slow,
    }

    #[async_trait]
    impl RoleLookup for Lookup {
        async fn lookup_role(&self, subject_id: &UserId) -> BlogifyResult<RoleLookupResult> {
            match self {
                Lookup::Table(roles) => Ok(roles
                    .get(subject_id)
                    .map(|role| RoleLookupResult::found(*role))
                    .unwrap_or_else(RoleLookupResult::missing)),
                Lookup::Failing => Err(storage_error!("store offline", "test")),
                Lookup::Slow => {
                    tokio::time::sleep(Duration::from_millis(500)).await;
                    Ok(RoleLookupResult::found(Role::Admin))
                }
            }
        }
    }

    fn resolver(lookup: Lookup) -> IdentityResolver {
        IdentityResolver::new(TokenVerifier::new(SECRET, 0), Arc::new(lookup), 50)
    }

    fn bearer(user: &str) -> String {
        let token = TokenIssuer::new(SECRET, 3600)
            .issue(&UserId::from(user))
            .unwrap();
        format!("Bearer {}", token)
    }

    fn expired_bearer(user: &str) -> String {
        let token = TokenIssuer::new(SECRET, 60)
            .issue_at(&UserId::from(user), 1_000)
            .unwrap();
        format!("Bearer {}", token)
    }

    fn roles() -> Lookup {
        let mut table = HashMap::new();
        table.insert(UserId::from("alice"), Role::Admin);
        table.insert(UserId::from("bob"), Role::User);
        Lookup::Table(table)
    }

    #[tokio::test]
    async fn optional_without_credential_is_anonymous() {
        let r = resolver(roles());
        assert_eq!(r.resolve(IdentityMode::Optional, None).await, Ok(None));
    }

    #[tokio::test]
    async fn optional_swallows_bad_credentials() {
        let r = resolver(roles());
        for header in [
            "Bearer garbage".to_string(),
            "Token abc".to_string(),
            expired_bearer("bob"),
        ] {
            assert_eq!(
                r.resolve(IdentityMode::Optional, Some(&header)).await,
                Ok(None)
            );
        }
    }

    #[tokio::test]
    async fn optional_attaches_valid_identity() {
        let r = resolver(roles());
        let claim = r
            .resolve(IdentityMode::Optional, Some(&bearer("bob")))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(claim.subject_id(), &UserId::from("bob"));
    }

    #[tokio::test]
    async fn required_rejects_missing_and_expired() {
        let r = resolver(roles());
        assert_eq!(
            r.resolve(IdentityMode::Required, None).await,
            Err(AccessError::CredentialMissing)
        );
        assert_eq!(
            r.resolve(IdentityMode::Required, Some(&expired_bearer("bob")))
                .await,
            Err(AccessError::CredentialInvalid(VerificationError::Expired))
        );
    }

    #[tokio::test]
    async fn required_does_not_look_up_role() {
        let r = resolver(Lookup::Failing);
        let claim = r
            .resolve(IdentityMode::Required, Some(&bearer("bob")))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(claim.role(), None);
    }

    #[tokio::test]
    async fn admin_only_outcomes() {
        let r = resolver(roles());

        let claim = r
            .resolve(IdentityMode::AdminOnly, Some(&bearer("alice")))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(claim.role(), Some(Role::Admin));

        assert_eq!(
            r.resolve(IdentityMode::AdminOnly, Some(&bearer("bob"))).await,
            Err(AccessError::RoleInsufficient)
        );
        assert_eq!(
            r.resolve(IdentityMode::AdminOnly, Some(&bearer("carol")))
                .await,
            Err(AccessError::IdentityNotFound)
        );
        assert_eq!(
            r.resolve(IdentityMode::AdminOnly, None).await,
            Err(AccessError::CredentialMissing)
        );
    }

    #[tokio::test]
    async fn admin_only_fails_closed_on_lookup_trouble() {
        let failing = resolver(Lookup::Failing);
        assert_eq!(
            failing
                .resolve(IdentityMode::AdminOnly, Some(&bearer("alice")))
                .await,
            Err(AccessError::RoleInsufficient)
        );

        let slow = resolver(Lookup::Slow);
        assert_eq!(
            slow.resolve(IdentityMode::AdminOnly, Some(&bearer("alice")))
                .await,
            Err(AccessError::RoleInsufficient)
        );
    }
}
