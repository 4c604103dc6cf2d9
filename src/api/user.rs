use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::StatusCode,
    response::Response,
    routing::{get, post},
    Json, Router,
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

use super::guarded;
use crate::config::AuthConfig;
use crate::error::ApiError;
use crate::middleware::auth::Claims;
use crate::middleware::logging::to_response;
use crate::services::user::{self as user_service, Credentials};
use crate::state::AppState;

pub fn user_router(state: &AppState) -> Router {
    Router::new()
        .route("/login", post(login))
        .route("/register", post(register))
        .route(
            "/profile",
            guarded(get(get_profile), Some(state.auth_gate(None))),
        )
        .layer(Extension(state.db.clone()))
        .layer(Extension(state.auth.clone()))
}

async fn login(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(auth): Extension<Arc<AuthConfig>>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(credentials) = payload?;
    let session = user_service::login(&db, &auth, credentials).await?;

    Ok(to_response((StatusCode::OK, Json(session)), Ok(())))
}

async fn register(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(auth): Extension<Arc<AuthConfig>>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(credentials) = payload?;
    let session = user_service::register(&db, &auth, credentials).await?;

    Ok(to_response((StatusCode::CREATED, Json(session)), Ok(())))
}

async fn get_profile(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(claims): Extension<Claims>,
) -> Result<Response, ApiError> {
    let profile = user_service::profile(&db, &claims).await?;

    Ok(to_response((StatusCode::OK, Json(profile)), Ok(())))
}
