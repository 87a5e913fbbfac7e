//! Identity resolution middleware
//!
//! Each route group is wrapped in one of the three layers below. A resolved
//! [`IdentityClaim`] is stored in the request extensions, where the
//! extractors in [`crate::auth`] pick it up.

use crate::{error::ApiError, AppState};
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use blogify_applications::{IdentityClaim, IdentityMode};
use tracing::debug;

/// Resolve the caller's identity in `mode` and continue, or answer with the refusal
pub async fn resolve_identity(
    mode: IdentityMode,
    state: &AppState,
    mut request: Request,
    next: Next,
) -> Response {
    // A header that is not valid UTF-8 is still a credential, just a malformed one
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .map(|value| value.to_str().unwrap_or_default().to_owned());

    match state.identity.resolve(mode, header.as_deref()).await {
        Ok(Some(claim)) => {
            debug!(mode = %mode, subject = %claim.subject_id(), "Identity resolved");
            request.extensions_mut().insert::<IdentityClaim>(claim);
            next.run(request).await
        }
        Ok(None) => next.run(request).await,
        Err(e) => ApiError::from(e).into_response(),
    }
}

pub async fn require_identity(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    resolve_identity(IdentityMode::Required, &state, request, next).await
}

pub async fn optional_identity(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    resolve_identity(IdentityMode::Optional, &state, request, next).await
}

pub async fn admin_identity(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    resolve_identity(IdentityMode::AdminOnly, &state, request, next).await
}
