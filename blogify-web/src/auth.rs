//! Accounts and request identity extractors

#[cfg(feature = "sqlite")]
pub mod database;
pub mod handlers;
pub mod users;

use crate::error::ApiError;
use axum::{extract::FromRequestParts, http::request::Parts};
use blogify_applications::{AccessError, IdentityClaim};
use blogify_core::Role;
use std::convert::Infallible;

/// Identity attached by the `Required` layer
#[derive(Debug, Clone)]
pub struct Identity(pub IdentityClaim);

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<IdentityClaim>()
            .cloned()
            .map(Identity)
            .ok_or(ApiError::Access(AccessError::CredentialMissing))
    }
}

/// Identity attached by the `Optional` layer, if any
#[derive(Debug, Clone)]
pub struct MaybeIdentity(pub Option<IdentityClaim>);

impl<S> FromRequestParts<S> for MaybeIdentity
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeIdentity(parts.extensions.get::<IdentityClaim>().cloned()))
    }
}

/// Identity whose admin role was confirmed by the `AdminOnly` layer
#[derive(Debug, Clone)]
pub struct AdminIdentity(pub IdentityClaim);

impl<S> FromRequestParts<S> for AdminIdentity
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<IdentityClaim>() {
            Some(claim) if claim.role() == Some(Role::Admin) => Ok(AdminIdentity(claim.clone())),
            Some(_) => Err(ApiError::Access(AccessError::RoleInsufficient)),
            None => Err(ApiError::Access(AccessError::CredentialMissing)),
        }
    }
}
