use std::collections::BTreeMap;

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::DbErr;
use serde_json::json;
use thiserror::Error;
use validator::ValidationErrors;

use crate::middleware::logging::to_response;

/// Field name -> human readable message, sent back as `{"errors": {...}}`.
pub type FieldErrors = BTreeMap<String, String>;

#[derive(Error, Debug, Clone)]
pub enum ApiError {
    #[error("Failed to validate: {0:?}")]
    Validation(FieldErrors),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("Database error: {0}")]
    DbError(String),
    #[error("Failed to hash password: {0}")]
    PasswordHashFailed(String),
    #[error("Failed to generate token: {0}")]
    TokenGenerationFailed(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::DbError(_)
            | ApiError::PasswordHashFailed(_)
            | ApiError::TokenGenerationFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> serde_json::Value {
        match self {
            ApiError::Validation(errors) => json!({ "errors": errors }),
            ApiError::BadRequest(message)
            | ApiError::NotFound(message)
            | ApiError::Conflict(message)
            | ApiError::Unauthorized(message)
            | ApiError::Forbidden(message) => json!({ "message": message }),
            // Internal detail only goes to the log.
            _ => json!({ "message": "Internal server error" }),
        }
    }

    pub fn field(field: &str, message: &str) -> Self {
        ApiError::Validation(BTreeMap::from([(field.to_owned(), message.to_owned())]))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = self.body();
        to_response((status, Json(body)), Err(self))
    }
}

impl From<DbErr> for ApiError {
    fn from(err: DbErr) -> Self {
        ApiError::DbError(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        let fields = errors
            .field_errors()
            .into_iter()
            .filter_map(|(field, errs)| {
                let field = field.to_string();
                errs.first().map(|err| {
                    let message = err
                        .message
                        .as_ref()
                        .map(|message| message.to_string())
                        .unwrap_or_else(|| format!("{field} is invalid"));
                    (field, message)
                })
            })
            .collect();

        ApiError::Validation(fields)
    }
}

#[derive(Error, Debug)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),
    #[error("Database setup failed: {0}")]
    Db(#[from] DbErr),
    #[error("Failed to build http client: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Seeding failed: {0}")]
    Seed(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
