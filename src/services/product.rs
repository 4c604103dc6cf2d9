use chrono::Utc;
use sea_orm::{
    sea_query::{Expr, Func, LikeExpr},
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use validator::Validate;

use super::{not_blank, number_from, total_pages, PAGE_SIZE};
use crate::entities::{
    product::{self, Entity as ProductEntity},
    sequence::{next_id, Sequence},
};
use crate::error::ApiError;

/// Body of `POST /products` and `PUT /products/:id`, as sent by the client.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProductPayload {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price: Option<Value>,
}

#[derive(Debug, Clone, Validate)]
pub struct ProductForm {
    #[validate(custom(function = "not_blank", message = "Name is required"))]
    pub name: String,
    #[validate(custom(function = "not_blank", message = "Description is required"))]
    pub description: String,
    #[validate(custom(function = "not_blank", message = "Category is required"))]
    pub category: String,
    #[validate(
        required(message = "Price must be a number"),
        range(min = 0.0, message = "Price must not be negative")
    )]
    pub price: Option<f64>,
}

impl From<ProductPayload> for ProductForm {
    fn from(payload: ProductPayload) -> Self {
        let text = |value: Option<String>| value.map(|v| v.trim().to_owned()).unwrap_or_default();

        ProductForm {
            name: text(payload.name),
            description: text(payload.description),
            category: text(payload.category),
            price: number_from(payload.price.as_ref()),
        }
    }
}

impl ProductForm {
    fn checked_price(&self) -> Result<f64, ApiError> {
        self.validate()?;
        self.price
            .ok_or_else(|| ApiError::field("price", "Price must be a number"))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPage {
    pub products: Vec<product::Model>,
    pub current_page: u64,
    pub total_pages: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_results: Option<u64>,
}

/// Newest first, optionally limited to one category.
pub async fn list(
    db: &DatabaseConnection,
    page: u64,
    category: Option<&str>,
) -> Result<ProductPage, ApiError> {
    let mut condition = Condition::all();
    if let Some(category) = category.filter(|c| !c.is_empty()) {
        condition = condition.add(product::Column::Category.eq(category));
    }

    let (products, total) = fetch_page(db, condition, page).await?;

    Ok(ProductPage {
        products,
        current_page: page,
        total_pages: total_pages(total),
        total_results: None,
    })
}

/// Case-insensitive (ASCII) substring match on the product name. The query is
/// matched as given, surrounding whitespace included.
pub async fn search(
    db: &DatabaseConnection,
    page: u64,
    query: &str,
) -> Result<ProductPage, ApiError> {
    // sqlite's lower() only folds ASCII, so the query is folded the same way.
    let pattern = format!("%{}%", escape_like(&query.to_ascii_lowercase()));
    let condition = Condition::all().add(
        Expr::expr(Func::lower(Expr::col(product::Column::Name)))
            .like(LikeExpr::new(pattern).escape('\\')),
    );

    let (products, total) = fetch_page(db, condition, page).await?;

    Ok(ProductPage {
        products,
        current_page: page,
        total_pages: total_pages(total),
        total_results: Some(total),
    })
}

pub async fn filter_by_category(
    db: &DatabaseConnection,
    category: Option<&str>,
) -> Result<Vec<product::Model>, ApiError> {
    let category = category
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| ApiError::field("category", "Category is required"))?;

    let products = ProductEntity::find()
        .filter(product::Column::Category.eq(category))
        .order_by_asc(product::Column::Id)
        .all(db)
        .await?;

    Ok(products)
}

pub async fn get_by_id(db: &DatabaseConnection, id: i32) -> Result<product::Model, ApiError> {
    ProductEntity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Product not found".into()))
}

pub async fn create(
    db: &DatabaseConnection,
    form: ProductForm,
) -> Result<product::Model, ApiError> {
    let price = form.checked_price()?;

    let txn = db.begin().await?;
    // The sequence bump takes the write lock up front; a rollback hands the
    // id back.
    let id = next_id(&txn, Sequence::Products).await?;

    let existing = ProductEntity::find()
        .filter(product::Column::Name.eq(form.name.as_str()))
        .one(&txn)
        .await?;
    if existing.is_some() {
        let _ = txn.rollback().await;
        return Err(ApiError::Conflict(
            "Product with this name already exists".into(),
        ));
    }

    let created = product::ActiveModel {
        id: Set(id),
        name: Set(form.name),
        description: Set(form.description),
        category: Set(form.category),
        price: Set(price),
        date_added: Set(Utc::now()),
        average_rating: Set(0.0),
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;
    info!(id = created.id, name = %created.name, "Product created");

    Ok(created)
}

/// Replaces name, description, category and price.
pub async fn update(
    db: &DatabaseConnection,
    id: i32,
    form: ProductForm,
) -> Result<product::Model, ApiError> {
    let price = form.checked_price()?;

    let not_found = || ApiError::NotFound("Product not found".into());
    let txn = db.begin().await?;

    // Write first, then read back: a read-then-write transaction cannot
    // upgrade its lock while another writer is active.
    let changed = ProductEntity::update_many()
        .col_expr(product::Column::Name, Expr::value(form.name))
        .col_expr(product::Column::Description, Expr::value(form.description))
        .col_expr(product::Column::Category, Expr::value(form.category))
        .col_expr(product::Column::Price, Expr::value(price))
        .filter(product::Column::Id.eq(id))
        .exec(&txn)
        .await?;
    if changed.rows_affected == 0 {
        let _ = txn.rollback().await;
        return Err(not_found());
    }

    let updated = ProductEntity::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or_else(not_found)?;
    txn.commit().await?;

    Ok(updated)
}

async fn fetch_page(
    db: &DatabaseConnection,
    condition: Condition,
    page: u64,
) -> Result<(Vec<product::Model>, u64), ApiError> {
    let query = ProductEntity::find().filter(condition);
    let total = query.clone().count(db).await?;

    let offset = (page.saturating_sub(1))
        .saturating_mul(PAGE_SIZE)
        .min(i64::MAX as u64);
    let products = query
        .order_by_desc(product::Column::DateAdded)
        .order_by_desc(product::Column::Id)
        .limit(PAGE_SIZE)
        .offset(offset)
        .all(db)
        .await?;

    Ok((products, total))
}

fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
