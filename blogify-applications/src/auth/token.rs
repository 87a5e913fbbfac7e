//! Bearer credential issuing and verification
//!
//! Tokens are HS256 JWTs carrying only `sub`, `iat` and `exp`. Roles are never
//! embedded; admin checks always consult the account store.

use blogify_core::{AuthConfig, BlogifyError, BlogifyResult, ErrorContext, UserId};
use chrono::Utc;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use super::identity::IdentityClaim;

const BEARER_SCHEME: &str = "Bearer";

/// JWT claims
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Issued at, seconds since the epoch
    pub iat: i64,
    /// Expiry, seconds since the epoch
    pub exp: i64,
}

/// Why a credential was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum VerificationError {
    #[error("credential missing")]
    Missing,
    #[error("credential malformed")]
    Malformed,
    #[error("credential expired")]
    Expired,
    #[error("credential signature invalid")]
    BadSignature,
}

/// Pull the token out of an `Authorization: Bearer <token>` header value.
/// The scheme name is matched case-insensitively.
pub fn extract_bearer(header: Option<&str>) -> Result<&str, VerificationError> {
    let header = header.ok_or(VerificationError::Missing)?;
    let (scheme, token) = header
        .split_once(' ')
        .ok_or(VerificationError::Malformed)?;
    if !scheme.eq_ignore_ascii_case(BEARER_SCHEME) {
        return Err(VerificationError::Malformed);
    }
    let token = token.trim();
    if token.is_empty() {
        return Err(VerificationError::Missing);
    }
    Ok(token)
}

/// Validates bearer credentials against the shared secret
#[derive(Clone)]
pub struct TokenVerifier {
    decoding: DecodingKey,
    validation: Validation,
    clock_tolerance_ms: i64,
}

impl TokenVerifier {
    pub fn new(secret: &[u8], clock_tolerance_ms: u64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked below with millisecond tolerance
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["sub", "exp"]);

        Self {
            decoding: DecodingKey::from_secret(secret),
            validation,
            clock_tolerance_ms: i64::try_from(clock_tolerance_ms).unwrap_or(i64::MAX),
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(config.jwt_secret.as_bytes(), config.clock_tolerance_ms)
    }

    /// Verify against the current wall clock
    pub fn verify(&self, credential: &str) -> Result<IdentityClaim, VerificationError> {
        self.verify_at(credential, Utc::now().timestamp_millis())
    }

    /// Verify as if the current time were `now_ms`
    pub fn verify_at(
        &self,
        credential: &str,
        now_ms: i64,
    ) -> Result<IdentityClaim, VerificationError> {
        if credential.trim().is_empty() {
            return Err(VerificationError::Missing);
        }

        let data = decode::<Claims>(credential, &self.decoding, &self.validation).map_err(|e| {
            let mapped = match e.kind() {
                ErrorKind::InvalidSignature
                | ErrorKind::InvalidAlgorithm
                | ErrorKind::InvalidAlgorithmName
                | ErrorKind::InvalidKeyFormat => VerificationError::BadSignature,
                ErrorKind::ExpiredSignature => VerificationError::Expired,
                _ => VerificationError::Malformed,
            };
            debug!(error = %e, reason = %mapped, "JWT verification failed");
            mapped
        })?;

        let claims = data.claims;
        if claims.sub.is_empty() {
            return Err(VerificationError::Malformed);
        }

        let exp_ms = claims.exp.saturating_mul(1000);
        if now_ms > exp_ms.saturating_add(self.clock_tolerance_ms) {
            return Err(VerificationError::Expired);
        }

        let iat_ms = claims.iat.saturating_mul(1000);
        if iat_ms > now_ms.saturating_add(self.clock_tolerance_ms) {
            debug!(sub = %claims.sub, "Token issued in the future");
            return Err(VerificationError::Malformed);
        }

        Ok(IdentityClaim::verified(UserId::from(claims.sub)))
    }
}

/// Signs credentials for login and registration
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    ttl_secs: i64,
}

impl TokenIssuer {
    pub fn new(secret: &[u8], ttl_secs: u64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            ttl_secs: i64::try_from(ttl_secs).unwrap_or(i64::MAX),
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(config.jwt_secret.as_bytes(), config.token_ttl_secs)
    }

    pub fn issue(&self, subject_id: &UserId) -> BlogifyResult<String> {
        self.issue_at(subject_id, Utc::now().timestamp())
    }

    /// Sign a token as if issued at `iat` (seconds)
    pub fn issue_at(&self, subject_id: &UserId, iat: i64) -> BlogifyResult<String> {
        let claims = Claims {
            sub: subject_id.to_string(),
            iat,
            exp: iat.saturating_add(self.ttl_secs),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(|e| {
            warn!("Failed to encode JWT token: {}", e);
            BlogifyError::Internal {
                message: "Failed to create authentication token".to_string(),
                source: Some(Box::new(e)),
                context: ErrorContext::new("token_issuer").with_operation("issue"),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"unit-test-secret-0123456789";

    fn pair(ttl: u64, tolerance_ms: u64) -> (TokenIssuer, TokenVerifier) {
        (
            TokenIssuer::new(SECRET, ttl),
            TokenVerifier::new(SECRET, tolerance_ms),
        )
    }

    #[test]
    fn issued_token_verifies() {
        let (issuer, verifier) = pair(3600, 0);
        let user = UserId::from("user-1");
        let token = issuer.issue(&user).unwrap();

        let claim = verifier.verify(&token).unwrap();
        assert_eq!(claim.subject_id(), &user);
        assert_eq!(claim.role(), None);
    }

    #[test]
    fn expired_token_is_rejected() {
        let (issuer, verifier) = pair(60, 0);
        let token = issuer.issue_at(&UserId::from("u"), 1_000).unwrap();

        // exp = 1060s; one millisecond past it
        assert_eq!(
            verifier.verify_at(&token, 1_060_001),
            Err(VerificationError::Expired)
        );
        assert!(verifier.verify_at(&token, 1_060_000).is_ok());
    }

    #[test]
    fn tolerance_extends_expiry_only_by_its_amount() {
        let (issuer, verifier) = pair(60, 500);
        let token = issuer.issue_at(&UserId::from("u"), 1_000).unwrap();

        assert!(verifier.verify_at(&token, 1_060_400).is_ok());
        assert_eq!(
            verifier.verify_at(&token, 1_060_501),
            Err(VerificationError::Expired)
        );
    }

    #[test]
    fn wrong_secret_is_bad_signature() {
        let issuer = TokenIssuer::new(b"another-secret-entirely-xyz", 3600);
        let verifier = TokenVerifier::new(SECRET, 0);
        let token = issuer.issue(&UserId::from("u")).unwrap();

        assert_eq!(verifier.verify(&token), Err(VerificationError::BadSignature));
    }

    #[test]
    fn other_algorithms_are_refused() {
        let claims = Claims {
            sub: "u".to_string(),
            iat: Utc::now().timestamp(),
            exp: Utc::now().timestamp() + 3600,
        };
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();

        let verifier = TokenVerifier::new(SECRET, 0);
        assert_eq!(verifier.verify(&token), Err(VerificationError::BadSignature));
    }

    #[test]
    fn garbage_is_malformed() {
        let verifier = TokenVerifier::new(SECRET, 0);
        assert_eq!(
            verifier.verify("not-a-token"),
            Err(VerificationError::Malformed)
        );
        assert_eq!(verifier.verify("   "), Err(VerificationError::Missing));
    }

    #[test]
    fn future_issue_time_is_malformed() {
        let (issuer, verifier) = pair(3600, 1000);
        let token = issuer.issue_at(&UserId::from("u"), 2_000).unwrap();

        assert_eq!(
            verifier.verify_at(&token, 1_998_000),
            Err(VerificationError::Malformed)
        );
        assert!(verifier.verify_at(&token, 1_999_500).is_ok());
    }

    #[test]
    fn bearer_header_parsing() {
        assert_eq!(extract_bearer(None), Err(VerificationError::Missing));
        assert_eq!(
            extract_bearer(Some("Basic abc")),
            Err(VerificationError::Malformed)
        );
        assert_eq!(extract_bearer(Some("Bearer ")), Err(VerificationError::Missing));
        assert_eq!(extract_bearer(Some("Bearer abc.def")), Ok("abc.def"));
        assert_eq!(extract_bearer(Some("bearer abc.def")), Ok("abc.def"));
        assert_eq!(extract_bearer(Some("BEARER abc.def")), Ok("abc.def"));
        assert_eq!(extract_bearer(Some("Bearerabc")), Err(VerificationError::Malformed));
    }
}
