//! HTTP router.

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::auth::handlers as auth;
use crate::history::handlers as history;
use crate::state::AppState;

/// Build the application router
pub fn router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/login", post(auth::login))
        .route("/signup", post(auth::signup))
        .route("/userinfo", post(auth::user_info))
        .route("/logout", post(auth::logout))
        .route("/guest-login", post(auth::guest_login));

    let history_routes = Router::new()
        .route("/list", get(history::list))
        .route("/get", get(history::get))
        .route("/save", post(history::save))
        .route("/rename", put(history::rename))
        .route("/delete", delete(history::delete));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/history", history_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
