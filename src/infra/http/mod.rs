//! JSON HTTP surface.

mod handlers;
mod middleware;
mod models;
mod state;

pub use state::HttpState;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    middleware as axum_middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};

use crate::application::error::ErrorReport;
use crate::application::repos::RepoError;

use middleware::{log_responses, set_request_context};

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/", get(handlers::landing))
        .route("/users", post(handlers::create_user))
        .route("/users/{id}", get(handlers::get_user))
        .route("/users/{id}/messages", get(handlers::list_inbox))
        .route(
            "/users/{id}/activities/{name}/join",
            post(handlers::join_activity),
        )
        .route(
            "/users/{id}/activities/{name}/leave",
            post(handlers::leave_activity),
        )
        .route(
            "/users/{id}/activities/{name}/limit",
            post(handlers::set_activity_limit),
        )
        .route("/comments", post(handlers::create_comment))
        .route("/gallery", post(handlers::create_gallery_item))
        .route("/gallery/{id}", delete(handlers::delete_gallery_item))
        .route("/gallery/{id}/messages", post(handlers::send_message))
        .route("/messages/{id}", get(handlers::get_message))
        .route("/messages/{id}/reply", post(handlers::reply_to_message))
        .route(
            "/plans",
            get(handlers::list_plans).post(handlers::create_plan),
        )
        .route("/_health/db", get(db_health))
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}

async fn db_health(State(state): State<HttpState>) -> Response {
    db_health_response(state.health.health_check().await)
}

fn db_health_response(result: Result<(), RepoError>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::db_health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}
