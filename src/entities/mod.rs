pub mod product;
pub mod review;
pub mod sequence;
pub mod user;

use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, EntityTrait, Schema,
};
use tracing::info;

pub async fn connect(database_url: &str, max_connections: u32) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(database_url.to_owned());
    // Every pooled connection to `sqlite::memory:` would get its own database.
    let max_connections = if database_url.contains(":memory:") {
        1
    } else {
        max_connections.max(1)
    };
    options
        .max_connections(max_connections)
        .sqlx_logging(false);

    Database::connect(options).await
}

pub async fn setup_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    create_table(db, product::Entity).await?;
    create_table(db, review::Entity).await?;
    create_table(db, user::Entity).await?;
    create_table(db, sequence::Entity).await?;
    info!("Schema ready");

    Ok(())
}

async fn create_table<E: EntityTrait + Copy>(db: &DatabaseConnection, entity: E) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let mut table = schema.create_table_from_entity(entity);
    table.if_not_exists();
    db.execute(backend.build(&table)).await?;

    for mut index in schema.create_index_from_entity(entity) {
        index.if_not_exists();
        db.execute(backend.build(&index)).await?;
    }

    Ok(())
}

#[cfg(test)]
pub(crate) async fn test_db() -> DatabaseConnection {
    let db = connect("sqlite::memory:", 1).await.unwrap();
    setup_schema(&db).await.unwrap();
    db
}
