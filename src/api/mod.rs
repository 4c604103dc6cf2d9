pub mod product;
pub mod review;
pub mod user;

use axum::{
    http::StatusCode,
    middleware::{from_fn, from_fn_with_state},
    response::Response,
    routing::{get, MethodRouter},
    Json, Router,
};
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::auth::{auth_middleware, AuthState};
use crate::middleware::logging::{logging_middleware, to_response};
use crate::state::AppState;

use product::product_router;
use review::review_router;
use user::user_router;

pub fn create_api_router(state: &AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(product_router(state))
        .merge(review_router(state))
        .nest("/users", user_router(state))
        .layer(from_fn(logging_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

async fn health() -> Response {
    to_response((StatusCode::OK, Json(json!({ "status": "ok" }))), Ok(()))
}

/// Wraps a method router with the auth gate when one is configured.
pub(crate) fn guarded(route: MethodRouter, gate: Option<AuthState>) -> MethodRouter {
    match gate {
        Some(gate) => route.route_layer(from_fn_with_state(gate, auth_middleware)),
        None => route,
    }
}
