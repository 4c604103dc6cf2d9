use chrono::{DateTime, TimeZone, Utc};
use sea_orm::{DatabaseConnection, EntityTrait, PaginatorTrait, Set, TransactionTrait};
use tracing::info;

use crate::entities::{
    product, review,
    sequence::sync_sequences,
    user::{self, hash_password, Role},
};
use crate::error::StartupError;
use crate::sentiment::Sentiment;

/// Fills each empty table with demo data. Tables that already hold rows are
/// left alone.
pub async fn seed_database(db: &DatabaseConnection) -> Result<(), StartupError> {
    if product::Entity::find().count(db).await? == 0 {
        product::Entity::insert_many(seed_products()).exec(db).await?;
        info!("Seeded products");
    } else {
        info!("Products already exist, skipping");
    }

    if review::Entity::find().count(db).await? == 0 {
        review::Entity::insert_many(seed_reviews()).exec(db).await?;
        info!("Seeded reviews");
    } else {
        info!("Reviews already exist, skipping");
    }

    if user::Entity::find().count(db).await? == 0 {
        user::Entity::insert_many(seed_users()?).exec(db).await?;
        info!("Seeded users");
    } else {
        info!("Users already exist, skipping");
    }

    let txn = db.begin().await?;
    sync_sequences(&txn).await?;
    txn.commit().await?;

    Ok(())
}

fn day(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, day, 0, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

fn seed_products() -> Vec<product::ActiveModel> {
    vec![
        product::ActiveModel {
            id: Set(1),
            name: Set("Wireless Headphones".to_owned()),
            description: Set("High-quality wireless headphones with noise cancellation.".to_owned()),
            category: Set("Electronics".to_owned()),
            price: Set(129.99),
            date_added: Set(day(1)),
            average_rating: Set(4.5),
        },
        product::ActiveModel {
            id: Set(2),
            name: Set("Bluetooth Speaker".to_owned()),
            description: Set("Portable Bluetooth speaker with deep bass.".to_owned()),
            category: Set("Electronics".to_owned()),
            price: Set(49.99),
            date_added: Set(day(2)),
            average_rating: Set(4.2),
        },
    ]
}

fn seed_reviews() -> Vec<review::ActiveModel> {
    vec![
        review::ActiveModel {
            id: Set(1),
            product_id: Set(1),
            author: Set("John Doe".to_owned()),
            rating: Set(5),
            comment: Set("Amazing sound quality!".to_owned()),
            date: Set(day(2)),
            sentiment: Set(Sentiment::Neutral),
        },
        review::ActiveModel {
            id: Set(2),
            product_id: Set(1),
            author: Set("Jane Smith".to_owned()),
            rating: Set(4),
            comment: Set("Great bass, but a bit heavy.".to_owned()),
            date: Set(day(3)),
            sentiment: Set(Sentiment::Neutral),
        },
    ]
}

fn seed_users() -> Result<Vec<user::ActiveModel>, StartupError> {
    [("admin", "admin123", Role::Admin), ("user", "user123", Role::User)]
        .into_iter()
        .map(|(username, password, role)| {
            let password = hash_password(password).map_err(StartupError::Seed)?;
            Ok(user::ActiveModel {
                username: Set(username.to_lowercase()),
                password: Set(password),
                role: Set(role),
                ..Default::default()
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::DbErr;
    use crate::entities::{
        sequence::{next_id, Sequence},
        test_db,
    };

    async fn counts(db: &DatabaseConnection) -> Result<(u64, u64, u64), DbErr> {
        Ok((
            product::Entity::find().count(db).await?,
            review::Entity::find().count(db).await?,
            user::Entity::find().count(db).await?,
        ))
    }

    #[tokio::test]
    async fn seeding_runs_once() {
        let db = test_db().await;

        seed_database(&db).await.unwrap();
        seed_database(&db).await.unwrap();

        assert_eq!(counts(&db).await.unwrap(), (2, 2, 2));
    }

    #[tokio::test]
    async fn new_ids_continue_after_seeded_rows() {
        let db = test_db().await;
        seed_database(&db).await.unwrap();

        assert_eq!(next_id(&db, Sequence::Products).await.unwrap(), 3);
        assert_eq!(next_id(&db, Sequence::Reviews).await.unwrap(), 3);
    }
}
