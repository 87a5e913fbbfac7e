//! Route definitions for the Blogify web server
//!
//! Routes are grouped by identity mode; each group carries its own identity
//! layer. Admission control wraps the whole router in [`crate::create_app`].

use crate::{
    auth::handlers as auth,
    handlers::{self, admin, posts},
    middleware::{admin_identity, optional_identity, require_identity},
    AppState,
};
use axum::{
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
    Router,
};

/// Create API routes
pub fn api_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .merge(public_routes())
        .merge(optional_routes(state))
        .merge(required_routes(state))
        .merge(single_post_routes(state))
        .nest("/admin", admin_routes(state))
}

/// No identity at all
fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
}

/// Identity attached when a valid credential is present
fn optional_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/posts", get(posts::list_posts))
        .route_layer(from_fn_with_state(state.clone(), optional_identity))
}

fn required_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/auth/me", get(auth::me))
        .route("/posts", post(posts::create_post))
        .route(
            "/posts/{id}",
            put(posts::update_post).delete(posts::delete_post),
        )
        .route("/posts/{id}/like", put(posts::toggle_like))
        .route_layer(from_fn_with_state(state.clone(), require_identity))
}

/// Reading a single post needs a login unless configured otherwise
fn single_post_routes(state: &AppState) -> Router<AppState> {
    let router = Router::new().route("/posts/{id}", get(posts::get_post));
    if state.settings.auth.require_login_to_read_post {
        router.route_layer(from_fn_with_state(state.clone(), require_identity))
    } else {
        router.route_layer(from_fn_with_state(state.clone(), optional_identity))
    }
}

fn admin_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/stats", get(admin::stats))
        .route("/posts", get(admin::list_posts))
        .route("/posts/{id}", delete(admin::delete_post))
        .route("/users", get(admin::list_users))
        .route("/users/{id}/role", put(admin::update_role))
        .route_layer(from_fn_with_state(state.clone(), admin_identity))
}
