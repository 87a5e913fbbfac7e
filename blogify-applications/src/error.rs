//! Error taxonomy for admission and access control

use blogify_core::BlogifyError;
use thiserror::Error;

use crate::auth::token::VerificationError;

/// Every way the admission and access-control layer can refuse a request
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    #[error("Too many requests, please try again later")]
    AdmissionRejected { retry_after_ms: u64 },

    #[error("Authentication required")]
    CredentialMissing,

    #[error("Invalid or expired token")]
    CredentialInvalid(VerificationError),

    #[error("User not found")]
    IdentityNotFound,

    #[error("Admin access required")]
    RoleInsufficient,

    #[error("Not authorized to modify this post")]
    OwnershipViolation,

    #[error("You can only view your own draft posts")]
    VisibilityViolation,
}

impl AccessError {
    /// Stable machine-readable code. All credential failures share one code.
    pub fn code(&self) -> &'static str {
        match self {
            AccessError::AdmissionRejected { .. } => "admission_rejected",
            AccessError::CredentialMissing => "credential_missing",
            AccessError::CredentialInvalid(_) => "credential_invalid",
            AccessError::IdentityNotFound => "identity_not_found",
            AccessError::RoleInsufficient => "role_insufficient",
            AccessError::OwnershipViolation => "ownership_violation",
            AccessError::VisibilityViolation => "visibility_violation",
        }
    }

    /// HTTP status code. 401 means "log in", 403 means "you may not do this".
    pub fn http_status(&self) -> u16 {
        match self {
            AccessError::AdmissionRejected { .. } => 429,
            AccessError::CredentialMissing | AccessError::CredentialInvalid(_) => 401,
            AccessError::IdentityNotFound => 404,
            AccessError::RoleInsufficient
            | AccessError::OwnershipViolation
            | AccessError::VisibilityViolation => 403,
        }
    }
}

impl From<VerificationError> for AccessError {
    fn from(err: VerificationError) -> Self {
        match err {
            VerificationError::Missing => AccessError::CredentialMissing,
            other => AccessError::CredentialInvalid(other),
        }
    }
}

/// Application-level error type
#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error(transparent)]
    Access(#[from] AccessError),

    #[error(transparent)]
    Core(#[from] BlogifyError),
}

pub type ApplicationResult<T> = Result<T, ApplicationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classes_are_distinct() {
        assert_eq!(AccessError::CredentialMissing.http_status(), 401);
        assert_eq!(
            AccessError::CredentialInvalid(VerificationError::Expired).http_status(),
            401
        );
        assert_eq!(AccessError::RoleInsufficient.http_status(), 403);
        assert_eq!(AccessError::IdentityNotFound.http_status(), 404);
        assert_eq!(
            AccessError::AdmissionRejected { retry_after_ms: 10 }.http_status(),
            429
        );
    }

    #[test]
    fn credential_failures_collapse_to_one_code() {
        for err in [
            VerificationError::Malformed,
            VerificationError::Expired,
            VerificationError::BadSignature,
        ] {
            assert_eq!(AccessError::from(err).code(), "credential_invalid");
        }
        assert_eq!(
            AccessError::from(VerificationError::Missing),
            AccessError::CredentialMissing
        );
    }
}
