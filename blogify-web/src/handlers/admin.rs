//! Admin dashboard handlers
//!
//! Every route here sits behind the `AdminOnly` layer, so the role has
//! already been confirmed against the user store for this request.

use super::types::{
    AdminPostsQuery, MessageResponse, PostListResponse, RoleUpdateRequest, RoleUpdateResponse,
    StatsResponse, UserListResponse,
};
use crate::{
    auth::AdminIdentity,
    error::{ApiError, ApiResult},
    AppState,
};
use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use blogify_applications::PageRequest;
use blogify_core::{not_found_error, PostId, Role, UserId};

/// Site-wide counters
#[utoipa::path(
    get,
    path = "/api/admin/stats",
    tag = "Admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Dashboard counters", body = StatsResponse),
        (status = 403, description = "Admin access required")
    )
)]
pub async fn stats(
    State(state): State<AppState>,
    AdminIdentity(admin): AdminIdentity,
) -> ApiResult<Json<StatsResponse>> {
    let posts = state.posts.admin_stats(&admin).await?;
    let total_users = state.users.count().await?;

    Ok(Json(StatsResponse {
        total_posts: posts.total_posts,
        published_posts: posts.published_posts,
        draft_posts: posts.draft_posts,
        total_users,
        total_views: posts.total_views,
    }))
}

/// Every post, drafts included
#[utoipa::path(
    get,
    path = "/api/admin/posts",
    tag = "Admin",
    params(AdminPostsQuery),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All posts, newest first", body = PostListResponse),
        (status = 403, description = "Admin access required")
    )
)]
pub async fn list_posts(
    State(state): State<AppState>,
    AdminIdentity(admin): AdminIdentity,
    Query(query): Query<AdminPostsQuery>,
) -> ApiResult<Json<PostListResponse>> {
    let page = state
        .posts
        .admin_list(&admin, PageRequest::new(query.page, query.limit))
        .await?;
    Ok(Json(PostListResponse::from_page(page, Some(admin.subject_id()))))
}

/// Delete any post regardless of author
#[utoipa::path(
    delete,
    path = "/api/admin/posts/{id}",
    tag = "Admin",
    params(("id" = String, Path, description = "Post id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Post deleted", body = MessageResponse),
        (status = 403, description = "Admin access required"),
        (status = 404, description = "No such post")
    )
)]
pub async fn delete_post(
    State(state): State<AppState>,
    AdminIdentity(admin): AdminIdentity,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    state.posts.admin_delete(&admin, &PostId::from(id)).await?;
    Ok(Json(MessageResponse::ok("Post deleted successfully")))
}

/// All accounts, without password hashes
#[utoipa::path(
    get,
    path = "/api/admin/users",
    tag = "Admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All users", body = UserListResponse),
        (status = 403, description = "Admin access required")
    )
)]
pub async fn list_users(
    State(state): State<AppState>,
    AdminIdentity(_admin): AdminIdentity,
) -> ApiResult<Json<UserListResponse>> {
    Ok(Json(UserListResponse {
        users: state.users.list().await?,
    }))
}

/// Promote or demote a user
#[utoipa::path(
    put,
    path = "/api/admin/users/{id}/role",
    tag = "Admin",
    params(("id" = String, Path, description = "User id")),
    request_body = RoleUpdateRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Role updated", body = RoleUpdateResponse),
        (status = 400, description = "Unknown role"),
        (status = 403, description = "Admin access required"),
        (status = 404, description = "No such user")
    )
)]
pub async fn update_role(
    State(state): State<AppState>,
    AdminIdentity(_admin): AdminIdentity,
    Path(id): Path<String>,
    Json(request): Json<RoleUpdateRequest>,
) -> ApiResult<Json<RoleUpdateResponse>> {
    let role: Role = request
        .role
        .parse()
        .map_err(|_| ApiError::BadRequest("Role must be 'user' or 'admin'".to_string()))?;

    let user = state
        .users
        .set_role(&UserId::from(id.clone()), role)
        .await?
        .ok_or_else(|| not_found_error!(format!("user {}", id), "users"))?;

    Ok(Json(RoleUpdateResponse {
        id: user.id.to_string(),
        username: user.username,
        role: user.role.to_string(),
    }))
}
