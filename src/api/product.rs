use axum::{
    extract::{rejection::JsonRejection, Extension, Path, Query},
    http::StatusCode,
    response::Response,
    routing::{get, post, put},
    Json, Router,
};
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use std::sync::Arc;

use super::guarded;
use crate::entities::user::Role;
use crate::error::ApiError;
use crate::middleware::logging::to_response;
use crate::services::{
    parse_id, parse_page,
    product::{self as product_service, ProductForm, ProductPayload},
};
use crate::state::AppState;

//ROUTERS
pub fn product_router(state: &AppState) -> Router {
    let gate = state.write_gate(Some(Role::Admin));

    Router::new()
        .route(
            "/products",
            get(get_products).merge(guarded(post(create_product), gate.clone())),
        )
        .route("/products/search", get(search_products))
        .route("/products/filter", get(filter_products))
        .route(
            "/products/:productId",
            get(get_product).merge(guarded(put(update_product), gate)),
        )
        .layer(Extension(state.db.clone()))
}

//ROUTES
async fn get_products(
    Query(params): Query<ProductsQuery>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> Result<Response, ApiError> {
    let page = parse_page(params.page.as_deref())?;
    let result = product_service::list(&db, page, params.category.as_deref()).await?;

    Ok(to_response((StatusCode::OK, Json(result)), Ok(())))
}

async fn search_products(
    Query(params): Query<SearchQuery>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> Result<Response, ApiError> {
    let page = parse_page(params.page.as_deref())?;
    let query = params.q.unwrap_or_default();
    let result = product_service::search(&db, page, &query).await?;

    Ok(to_response((StatusCode::OK, Json(result)), Ok(())))
}

async fn filter_products(
    Query(params): Query<FilterQuery>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> Result<Response, ApiError> {
    let products = product_service::filter_by_category(&db, params.category.as_deref()).await?;

    Ok(to_response((StatusCode::OK, Json(products)), Ok(())))
}

async fn get_product(
    Path(id): Path<String>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id, "product")?;
    let product = product_service::get_by_id(&db, id).await?;

    Ok(to_response((StatusCode::OK, Json(product)), Ok(())))
}

async fn create_product(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    payload: Result<Json<ProductPayload>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload?;
    let product = product_service::create(&db, ProductForm::from(payload)).await?;

    Ok(to_response((StatusCode::CREATED, Json(product)), Ok(())))
}

async fn update_product(
    Path(id): Path<String>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    payload: Result<Json<ProductPayload>, JsonRejection>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id, "product")?;
    let Json(payload) = payload?;
    let product = product_service::update(&db, id, ProductForm::from(payload)).await?;

    Ok(to_response((StatusCode::OK, Json(product)), Ok(())))
}

//Structs
#[derive(Deserialize)]
struct ProductsQuery {
    page: Option<String>,
    category: Option<String>,
}

#[derive(Deserialize)]
struct SearchQuery {
    q: Option<String>,
    page: Option<String>,
}

#[derive(Deserialize)]
struct FilterQuery {
    category: Option<String>,
}
