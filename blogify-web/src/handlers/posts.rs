//! Post handlers

use super::types::{
    CreatePostRequest, LikeResponse, ListPostsQuery, MessageResponse, PostListResponse,
    PostResponse, UpdatePostRequest,
};
use crate::{
    auth::{Identity, MaybeIdentity},
    error::ApiResult,
    AppState,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use blogify_applications::{AccessError, PageRequest};
use blogify_core::PostId;

/// List posts visible to the caller
#[utoipa::path(
    get,
    path = "/api/posts",
    tag = "Posts",
    params(ListPostsQuery),
    responses(
        (status = 200, description = "One page of posts, newest first", body = PostListResponse)
    )
)]
pub async fn list_posts(
    State(state): State<AppState>,
    MaybeIdentity(identity): MaybeIdentity,
    Query(query): Query<ListPostsQuery>,
) -> ApiResult<Json<PostListResponse>> {
    let page = PageRequest::new(query.page, query.limit);
    let result = state
        .posts
        .list(identity.as_ref(), page, query.search.as_deref())
        .await?;
    let viewer = identity.as_ref().map(|claim| claim.subject_id());
    Ok(Json(PostListResponse::from_page(result, viewer)))
}

/// Fetch one post and count the view
#[utoipa::path(
    get,
    path = "/api/posts/{id}",
    tag = "Posts",
    params(("id" = String, Path, description = "Post id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "The post", body = PostResponse),
        (status = 401, description = "Login required"),
        (status = 403, description = "Draft belongs to someone else"),
        (status = 404, description = "No such post")
    )
)]
pub async fn get_post(
    State(state): State<AppState>,
    MaybeIdentity(identity): MaybeIdentity,
    Path(id): Path<String>,
) -> ApiResult<Json<PostResponse>> {
    let post = state.posts.get(identity.as_ref(), &PostId::from(id)).await?;
    let viewer = identity.as_ref().map(|claim| claim.subject_id());
    Ok(Json(PostResponse::from_post(post, viewer)))
}

/// Create a post authored by the caller
#[utoipa::path(
    post,
    path = "/api/posts",
    tag = "Posts",
    request_body = CreatePostRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Post created", body = PostResponse),
        (status = 400, description = "Missing title or content"),
        (status = 401, description = "Login required")
    )
)]
pub async fn create_post(
    State(state): State<AppState>,
    Identity(identity): Identity,
    Json(request): Json<CreatePostRequest>,
) -> ApiResult<(StatusCode, Json<PostResponse>)> {
    let author = state
        .users
        .get(identity.subject_id())
        .await?
        .ok_or(AccessError::IdentityNotFound)?;

    let post = state
        .posts
        .create(&identity, &author.username, request.into())
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(PostResponse::from_post(post, Some(identity.subject_id()))),
    ))
}

/// Update a post the caller owns
#[utoipa::path(
    put,
    path = "/api/posts/{id}",
    tag = "Posts",
    params(("id" = String, Path, description = "Post id")),
    request_body = UpdatePostRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Updated post", body = PostResponse),
        (status = 403, description = "Not the author"),
        (status = 404, description = "No such post")
    )
)]
pub async fn update_post(
    State(state): State<AppState>,
    Identity(identity): Identity,
    Path(id): Path<String>,
    Json(request): Json<UpdatePostRequest>,
) -> ApiResult<Json<PostResponse>> {
    let post = state
        .posts
        .update(&identity, &PostId::from(id), request.into())
        .await?;
    Ok(Json(PostResponse::from_post(post, Some(identity.subject_id()))))
}

/// Delete a post the caller owns
#[utoipa::path(
    delete,
    path = "/api/posts/{id}",
    tag = "Posts",
    params(("id" = String, Path, description = "Post id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Post deleted", body = MessageResponse),
        (status = 403, description = "Not the author"),
        (status = 404, description = "No such post")
    )
)]
pub async fn delete_post(
    State(state): State<AppState>,
    Identity(identity): Identity,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    state.posts.delete(&identity, &PostId::from(id)).await?;
    Ok(Json(MessageResponse::ok("Post deleted successfully")))
}

/// Like or unlike a readable post
#[utoipa::path(
    put,
    path = "/api/posts/{id}/like",
    tag = "Posts",
    params(("id" = String, Path, description = "Post id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "New like state", body = LikeResponse),
        (status = 403, description = "Post is not readable by the caller"),
        (status = 404, description = "No such post")
    )
)]
pub async fn toggle_like(
    State(state): State<AppState>,
    Identity(identity): Identity,
    Path(id): Path<String>,
) -> ApiResult<Json<LikeResponse>> {
    let status = state.posts.toggle_like(&identity, &PostId::from(id)).await?;
    Ok(Json(status.into()))
}
