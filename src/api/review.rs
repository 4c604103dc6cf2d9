use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::Response,
    routing::{delete, get, post, put},
    Json, Router,
};
use sea_orm::DatabaseConnection;
use serde_json::json;
use std::sync::Arc;

use super::guarded;
use crate::error::ApiError;
use crate::middleware::logging::to_response;
use crate::sentiment::SentimentClient;
use crate::services::{
    parse_id,
    review::{self as review_service, ReviewForm, ReviewPayload},
};
use crate::state::AppState;

//ROUTERS
pub fn review_router(state: &AppState) -> Router {
    // Any signed-in user may write reviews when the gate is on.
    let gate = state.write_gate(None);

    Router::new()
        .route(
            "/products/:productId/reviews",
            get(get_reviews).merge(guarded(post(create_review), gate.clone())),
        )
        .route(
            "/products/:productId/:reviewId",
            guarded(put(update_review).merge(delete(delete_review)), gate.clone()),
        )
        // Path used by the web client for edits.
        .route(
            "/products/:productId/reviews/:reviewId",
            guarded(put(update_review), gate),
        )
        .layer(Extension(state.db.clone()))
        .layer(Extension(state.sentiment.clone()))
}

//ROUTES
async fn get_reviews(
    Path(product_id): Path<String>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> Result<Response, ApiError> {
    let product_id = parse_id(&product_id, "product")?;
    let reviews = review_service::list_by_product(&db, product_id).await?;

    Ok(to_response((StatusCode::OK, Json(reviews)), Ok(())))
}

async fn create_review(
    Path(product_id): Path<String>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(sentiment): Extension<Arc<SentimentClient>>,
    payload: Result<Json<ReviewPayload>, JsonRejection>,
) -> Result<Response, ApiError> {
    let product_id = parse_id(&product_id, "product")?;
    let Json(payload) = payload?;
    let review =
        review_service::create(&db, &sentiment, product_id, ReviewForm::from(payload)).await?;

    Ok(to_response((StatusCode::CREATED, Json(review)), Ok(())))
}

async fn update_review(
    Path((product_id, review_id)): Path<(String, String)>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(sentiment): Extension<Arc<SentimentClient>>,
    payload: Result<Json<ReviewPayload>, JsonRejection>,
) -> Result<Response, ApiError> {
    let product_id = parse_id(&product_id, "product")?;
    let review_id = parse_id(&review_id, "review")?;
    let Json(payload) = payload?;

    let updated = review_service::update(
        &db,
        &sentiment,
        product_id,
        review_id,
        ReviewForm::from(payload),
    )
    .await?;

    Ok(to_response(
        (
            StatusCode::OK,
            Json(json!({
                "message": "Review updated successfully",
                "updatedReview": updated
            })),
        ),
        Ok(()),
    ))
}

async fn delete_review(
    Path((product_id, review_id)): Path<(String, String)>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> Result<Response, ApiError> {
    let product_id = parse_id(&product_id, "product")?;
    let review_id = parse_id(&review_id, "review")?;
    let deleted = review_service::delete(&db, product_id, review_id).await?;

    Ok(to_response(
        (
            StatusCode::OK,
            Json(json!({
                "message": "Review deleted successfully",
                "deletedReview": deleted
            })),
        ),
        Ok(()),
    ))
}
