//! Core trait definitions

use crate::error::BlogifyResult;
use crate::types::*;
use async_trait::async_trait;

/// Fresh role lookup used by admin-gated requests.
///
/// Implementations must read the persisted role every call; callers rely on
/// promotions and demotions taking effect without re-issuing credentials.
#[async_trait]
pub trait RoleLookup: Send + Sync {
    async fn lookup_role(&self, subject_id: &UserId) -> BlogifyResult<RoleLookupResult>;
}

/// Anything the visibility policy can make decisions about
pub trait OwnershipSource {
    fn ownership_fact(&self) -> OwnershipFact;
}
