pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod rate_limit;
pub mod state;

pub use state::ApiState;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};

use crate::infra::http::RouterState;
use crate::infra::http::middleware::log_responses;

pub fn build_api_router(state: RouterState) -> Router<RouterState> {
    let auth_state = state.api.clone();

    Router::new()
        .route(
            "/api/v1/newsletters",
            get(handlers::list_newsletters).post(handlers::create_newsletter),
        )
        .route(
            "/api/v1/newsletters/{id}",
            get(handlers::get_newsletter)
                .patch(handlers::update_newsletter)
                .delete(handlers::delete_newsletter),
        )
        .route(
            "/api/v1/subscribers",
            get(handlers::list_subscribers).post(handlers::create_subscriber),
        )
        .route("/api/v1/subscribers/counts", get(handlers::subscriber_counts))
        .route(
            "/api/v1/subscribers/{id}",
            get(handlers::get_subscriber)
                .patch(handlers::update_subscriber)
                .delete(handlers::delete_subscriber),
        )
        .route(
            "/api/v1/issues",
            get(handlers::list_issues).post(handlers::create_issue),
        )
        .route(
            "/api/v1/issues/{id}",
            get(handlers::get_issue)
                .patch(handlers::update_issue)
                .delete(handlers::delete_issue),
        )
        .route("/api/v1/issues/{id}/preview", get(handlers::preview_issue))
        .route("/api/v1/issues/{id}/send", post(handlers::send_issue))
        .route("/api/v1/assistant/models", get(handlers::list_models))
        .route("/api/v1/assistant/chat", post(handlers::assistant_chat))
        .with_state(state)
        .layer(axum_middleware::from_fn_with_state(
            auth_state,
            middleware::api_auth,
        ))
        .layer(axum_middleware::from_fn(log_responses))
}
