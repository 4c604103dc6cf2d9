use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;
use validator::Validate;

use super::not_blank;
use crate::entities::{
    review::{self, Entity as ReviewEntity},
    sequence::{next_id, Sequence},
};
use crate::error::ApiError;
use crate::sentiment::SentimentClient;

const RATING_MESSAGE: &str = "Rating must be a whole number from 1 to 5";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ReviewPayload {
    pub author: Option<String>,
    pub rating: Option<Value>,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Validate)]
pub struct ReviewForm {
    #[validate(custom(function = "not_blank", message = "Author is required"))]
    pub author: String,
    #[validate(
        required(message = "Rating must be a whole number from 1 to 5"),
        range(min = 1, max = 5, message = "Rating must be a whole number from 1 to 5")
    )]
    pub rating: Option<i32>,
    #[validate(custom(function = "not_blank", message = "Comment is required"))]
    pub comment: String,
}

impl From<ReviewPayload> for ReviewForm {
    fn from(payload: ReviewPayload) -> Self {
        let text = |value: Option<String>| value.map(|v| v.trim().to_owned()).unwrap_or_default();

        ReviewForm {
            author: text(payload.author),
            rating: payload.rating.as_ref().and_then(rating_from),
            comment: text(payload.comment),
        }
    }
}

impl ReviewForm {
    fn checked_rating(&self) -> Result<i32, ApiError> {
        self.validate()?;
        self.rating
            .ok_or_else(|| ApiError::field("rating", RATING_MESSAGE))
    }
}

fn rating_from(value: &Value) -> Option<i32> {
    let rating = match value {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    };
    rating.and_then(|r| i32::try_from(r).ok())
}

/// An empty result is reported as not found, whether or not the product
/// exists.
pub async fn list_by_product(
    db: &DatabaseConnection,
    product_id: i32,
) -> Result<Vec<review::Model>, ApiError> {
    let reviews = ReviewEntity::find()
        .filter(review::Column::ProductId.eq(product_id))
        .order_by_asc(review::Column::Id)
        .all(db)
        .await?;

    if reviews.is_empty() {
        return Err(ApiError::NotFound(
            "No reviews found for this product".into(),
        ));
    }

    Ok(reviews)
}

pub async fn create(
    db: &DatabaseConnection,
    sentiment: &SentimentClient,
    product_id: i32,
    form: ReviewForm,
) -> Result<review::Model, ApiError> {
    let rating = form.checked_rating()?;

    // Scored before the transaction opens so no lock is held over the call.
    let sentiment = sentiment.analyze(&form.comment).await;

    let txn = db.begin().await?;
    let id = next_id(&txn, Sequence::Reviews).await?;
    let created = review::ActiveModel {
        id: Set(id),
        product_id: Set(product_id),
        author: Set(form.author),
        rating: Set(rating),
        comment: Set(form.comment),
        date: Set(Utc::now()),
        sentiment: Set(sentiment),
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    info!(id = created.id, product_id, sentiment = %created.sentiment, "Review created");

    Ok(created)
}

pub async fn update(
    db: &DatabaseConnection,
    sentiment: &SentimentClient,
    product_id: i32,
    review_id: i32,
    form: ReviewForm,
) -> Result<review::Model, ApiError> {
    let rating = form.checked_rating()?;

    find_review(db, product_id, review_id).await?;
    let sentiment = sentiment.analyze(&form.comment).await;

    let txn = db.begin().await?;
    // Write first so the transaction never has to upgrade a read lock. Zero
    // rows means the review went away while sentiment was being scored.
    let changed = ReviewEntity::update_many()
        .col_expr(review::Column::Author, Expr::value(form.author))
        .col_expr(review::Column::Rating, Expr::value(rating))
        .col_expr(review::Column::Comment, Expr::value(form.comment))
        .col_expr(review::Column::Sentiment, Expr::value(sentiment))
        .col_expr(review::Column::Date, Expr::value(Utc::now()))
        .filter(review::Column::Id.eq(review_id))
        .filter(review::Column::ProductId.eq(product_id))
        .exec(&txn)
        .await?;
    if changed.rows_affected == 0 {
        let _ = txn.rollback().await;
        return Err(review_not_found());
    }

    let updated = find_one(&txn, product_id, review_id)
        .await?
        .ok_or_else(review_not_found)?;
    txn.commit().await?;

    Ok(updated)
}

/// Returns the removed row. The delete is a single statement; a concurrent
/// delete of the same review leaves this one with nothing to remove.
pub async fn delete(
    db: &DatabaseConnection,
    product_id: i32,
    review_id: i32,
) -> Result<review::Model, ApiError> {
    let existing = find_review(db, product_id, review_id).await?;

    let removed = ReviewEntity::delete_many()
        .filter(review::Column::Id.eq(review_id))
        .filter(review::Column::ProductId.eq(product_id))
        .exec(db)
        .await?;
    if removed.rows_affected == 0 {
        return Err(review_not_found());
    }

    info!(id = existing.id, product_id, "Review deleted");

    Ok(existing)
}

async fn find_review(
    db: &DatabaseConnection,
    product_id: i32,
    review_id: i32,
) -> Result<review::Model, ApiError> {
    find_one(db, product_id, review_id)
        .await?
        .ok_or_else(review_not_found)
}

async fn find_one<C: sea_orm::ConnectionTrait>(
    conn: &C,
    product_id: i32,
    review_id: i32,
) -> Result<Option<review::Model>, sea_orm::DbErr> {
    ReviewEntity::find_by_id(review_id)
        .filter(review::Column::ProductId.eq(product_id))
        .one(conn)
        .await
}

fn review_not_found() -> ApiError {
    ApiError::NotFound("Review not found".into())
}
