pub mod auth;
pub mod health;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::state::AppState;
use crate::views::handlers;

pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        // Home listing
        .route("/api/v1/resumes", get(handlers::handle_list_resumes))
        // Detail view sessions
        .route("/api/v1/views", post(handlers::handle_open_view))
        .route(
            "/api/v1/views/:view_id",
            get(handlers::handle_view_state).delete(handlers::handle_close_view),
        )
        .route("/api/v1/views/:view_id/load", post(handlers::handle_load))
        // Display handles
        .route("/api/v1/blobs/:handle", get(handlers::handle_get_blob))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth,
        ));

    Router::new()
        .route("/health", get(health::health_handler))
        .route(auth::LOGIN_PATH, get(auth::login_handler))
        .merge(api)
        .with_state(state)
}
