use crate::entities::user::{self, Entity as UserEntity, Role};
use crate::error::ApiError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Verifies the bearer token and, when `role` is set, that the caller holds
/// it. The decoded [`Claims`] are handed to the handler as an extension.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("No token provided".into()))?;

    let claims = authenticate(&state, token).await?;
    if let Some(role) = state.role {
        authorize(&claims, role)?;
    }

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i32,
    pub role: Role,
    pub exp: usize,
}

#[derive(Clone)]
pub struct AuthState {
    pub db: Arc<DatabaseConnection>,
    pub secret: Arc<str>,
    /// `None` admits any signed-in user.
    pub role: Option<Role>,
}

pub fn generate_token(
    secret: &str,
    user_id: i32,
    role: Role,
    ttl_hours: i64,
) -> Result<String, AuthMiddlewareError> {
    let exp = Utc::now()
        .checked_add_signed(Duration::hours(ttl_hours))
        .ok_or(AuthMiddlewareError::GenerationFail)?
        .timestamp() as usize;

    let claims = Claims { user_id, role, exp };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|_| AuthMiddlewareError::GenerationFail)
}

pub fn decode_token(secret: &str, token: &str) -> Result<Claims, AuthMiddlewareError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|err| match err.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthMiddlewareError::TokenExpired,
        _ => AuthMiddlewareError::ValidationFail,
    })
}

/// Token -> principal. The user must still exist with the role in the token.
pub async fn authenticate(state: &AuthState, token: &str) -> Result<Claims, ApiError> {
    let claims = decode_token(&state.secret, token)?;

    match UserEntity::find_by_id(claims.user_id)
        .filter(user::Column::Role.eq(claims.role))
        .one(&*state.db)
        .await
    {
        Ok(Some(_)) => Ok(claims),
        Ok(None) => Err(AuthMiddlewareError::InvalidUserOrRole.into()),
        Err(err) => Err(err.into()),
    }
}

pub fn authorize(claims: &Claims, required: Role) -> Result<(), ApiError> {
    if claims.role == required {
        Ok(())
    } else {
        Err(ApiError::Forbidden(format!("{} role required", required)))
    }
}

#[derive(Error, Debug)]
pub enum AuthMiddlewareError {
    #[error("Invalid user id or role")]
    InvalidUserOrRole,
    #[error("Token expired")]
    TokenExpired,
    #[error("Failed to validate token")]
    ValidationFail,
    #[error("Failed to generate token")]
    GenerationFail,
}

impl From<AuthMiddlewareError> for ApiError {
    fn from(err: AuthMiddlewareError) -> Self {
        match err {
            AuthMiddlewareError::GenerationFail => ApiError::TokenGenerationFailed(err.to_string()),
            _ => ApiError::Unauthorized(err.to_string()),
        }
    }
}
