use std::time::Duration;

use axum::{
    http::{header, Method, StatusCode},
    routing::{delete, get, patch, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::{
    handlers::{
        health::{healthz, livez},
        users,
    },
    state::AppState,
};

/// Create the application router with all routes and middleware.
pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE]);

    let user_routes = Router::new()
        .route("/getAll", get(users::get_all))
        .route("/insert", post(users::insert))
        .route("/update", patch(users::update))
        .route("/delete/{id}", delete(users::delete))
        .route("/search/{name}", get(users::search))
        .route("/users/{id}", get(users::get_by_id))
        .route("/flush", post(users::flush))
        .layer(cors);

    Router::new()
        .route("/livez", get(livez))
        .route("/healthz", get(healthz))
        .merge(user_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(10),
        ))
        .with_state(state)
}
