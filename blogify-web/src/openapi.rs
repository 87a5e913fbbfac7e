//! OpenAPI specification for the Blogify API

use axum::Router;
use utoipa::{
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::users::{AuthResponse, LoginRequest, RegisterRequest, UserInfo},
    handlers::types::{
        AuthorInfo, CreatePostRequest, ErrorResponse, HealthResponse, LikeResponse,
        MessageResponse, PaginationInfo, PostListResponse, PostResponse, RoleUpdateRequest,
        RoleUpdateResponse, StatsResponse, UpdatePostRequest, UserListResponse,
    },
    AppState,
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Blogify API",
        version = "0.1.0",
        description = "Blog API with per-client admission control and role-gated administration",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:5000", description = "Local development server")
    ),
    paths(
        crate::handlers::health::health_check,

        crate::auth::handlers::register,
        crate::auth::handlers::login,
        crate::auth::handlers::me,

        crate::handlers::posts::list_posts,
        crate::handlers::posts::get_post,
        crate::handlers::posts::create_post,
        crate::handlers::posts::update_post,
        crate::handlers::posts::delete_post,
        crate::handlers::posts::toggle_like,

        crate::handlers::admin::stats,
        crate::handlers::admin::list_posts,
        crate::handlers::admin::delete_post,
        crate::handlers::admin::list_users,
        crate::handlers::admin::update_role,
    ),
    components(
        schemas(
            HealthResponse,
            MessageResponse,
            ErrorResponse,
            RegisterRequest,
            LoginRequest,
            AuthResponse,
            UserInfo,
            CreatePostRequest,
            UpdatePostRequest,
            AuthorInfo,
            PostResponse,
            PaginationInfo,
            PostListResponse,
            LikeResponse,
            StatsResponse,
            UserListResponse,
            RoleUpdateRequest,
            RoleUpdateResponse,
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Auth", description = "Registration, login and the current user"),
        (name = "Posts", description = "Reading and writing posts"),
        (name = "Admin", description = "Administration, admin role required"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Bearer token security scheme
pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}

/// Swagger UI at `/swagger-ui`, spec at `/api-docs/openapi.json`
pub fn swagger_ui() -> Router<AppState> {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .into()
}
