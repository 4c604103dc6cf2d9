//! Store-backed id sequences.
//!
//! Products and reviews carry public integer ids. Each table owns a row here
//! that is bumped with a single `UPDATE ... SET value = value + 1` inside the
//! creating transaction, so concurrent creates never share an id.

use sea_orm::entity::prelude::*;
use sea_orm::{sea_query::Expr, ConnectionTrait, QueryOrder, Set};

use crate::entities::{product, review};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "sequences")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub name: String,
    /// Last id handed out.
    pub value: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sequence {
    Products,
    Reviews,
}

impl Sequence {
    pub const ALL: [Sequence; 2] = [Sequence::Products, Sequence::Reviews];

    pub fn as_str(&self) -> &'static str {
        match self {
            Sequence::Products => "products",
            Sequence::Reviews => "reviews",
        }
    }

    /// Highest id currently stored in the backing table, 0 when empty.
    async fn current_max<C: ConnectionTrait>(&self, conn: &C) -> Result<i32, DbErr> {
        let max = match self {
            Sequence::Products => product::Entity::find()
                .order_by_desc(product::Column::Id)
                .one(conn)
                .await?
                .map(|p| p.id),
            Sequence::Reviews => review::Entity::find()
                .order_by_desc(review::Column::Id)
                .one(conn)
                .await?
                .map(|r| r.id),
        };

        Ok(max.unwrap_or(0))
    }
}

/// Reserves the next id. Call it on the same transaction that inserts the row
/// so a rolled back insert also gives the id back.
pub async fn next_id<C: ConnectionTrait>(conn: &C, sequence: Sequence) -> Result<i32, DbErr> {
    let bumped = Entity::update_many()
        .col_expr(Column::Value, Expr::col(Column::Value).add(1))
        .filter(Column::Name.eq(sequence.as_str()))
        .exec(conn)
        .await?;

    if bumped.rows_affected == 0 {
        let first = sequence.current_max(conn).await? + 1;
        ActiveModel {
            name: Set(sequence.as_str().to_owned()),
            value: Set(first),
        }
        .insert(conn)
        .await?;
        return Ok(first);
    }

    Entity::find_by_id(sequence.as_str())
        .one(conn)
        .await?
        .map(|row| row.value)
        .ok_or_else(|| DbErr::RecordNotFound(format!("sequence {}", sequence.as_str())))
}

/// Moves every sequence past the highest stored id. Used after seeding, where
/// rows are inserted with explicit ids.
pub async fn sync_sequences<C: ConnectionTrait>(conn: &C) -> Result<(), DbErr> {
    for sequence in Sequence::ALL {
        let max = sequence.current_max(conn).await?;
        match Entity::find_by_id(sequence.as_str()).one(conn).await? {
            Some(row) if row.value >= max => {}
            Some(row) => {
                let mut row: ActiveModel = row.into();
                row.value = Set(max);
                row.update(conn).await?;
            }
            None => {
                ActiveModel {
                    name: Set(sequence.as_str().to_owned()),
                    value: Set(max),
                }
                .insert(conn)
                .await?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::test_db;
    use crate::sentiment::Sentiment;
    use chrono::Utc;

    #[tokio::test]
    async fn ids_start_at_one_and_increase() {
        let db = test_db().await;

        assert_eq!(next_id(&db, Sequence::Products).await.unwrap(), 1);
        assert_eq!(next_id(&db, Sequence::Products).await.unwrap(), 2);
        assert_eq!(next_id(&db, Sequence::Reviews).await.unwrap(), 1);
        assert_eq!(next_id(&db, Sequence::Products).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn first_use_continues_after_existing_rows() {
        let db = test_db().await;
        review::ActiveModel {
            id: Set(41),
            product_id: Set(1),
            author: Set("Jane".into()),
            rating: Set(4),
            comment: Set("Fine".into()),
            date: Set(Utc::now()),
            sentiment: Set(Sentiment::Neutral),
        }
        .insert(&db)
        .await
        .unwrap();

        assert_eq!(next_id(&db, Sequence::Reviews).await.unwrap(), 42);
    }

    #[tokio::test]
    async fn sync_never_moves_a_sequence_backwards() {
        let db = test_db().await;
        for _ in 0..5 {
            next_id(&db, Sequence::Products).await.unwrap();
        }

        sync_sequences(&db).await.unwrap();

        assert_eq!(next_id(&db, Sequence::Products).await.unwrap(), 6);
        assert_eq!(next_id(&db, Sequence::Reviews).await.unwrap(), 1);
    }
}
