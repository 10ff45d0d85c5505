use std::time::Duration;

use sea_orm::sea_query::{Index, PostgresQueryBuilder};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr};
use tracing::info;

use crate::entity::{category, image, item};

pub async fn init_db(db_url: &str) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(db_url.to_owned());

    // Set connection pool options
    opt.max_connections(100)
        .min_connections(5)
        .connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8))
        .idle_timeout(Duration::from_secs(8))
        .max_lifetime(Duration::from_secs(8))
        .sqlx_logging(true);

    let db = Database::connect(opt).await?;
    db.get_schema_registry("server::entity::*")
        .sync(&db)
        .await?;

    ensure_indexes(&db).await?;

    Ok(db)
}

/// Ensure required database indexes exist.
///
/// SeaORM's schema-sync doesn't support composite indexes, so they are
/// created explicitly on startup. The two unique indexes are authoritative
/// for business invariants (duplicate category names, duplicate image
/// slots), so failure to create them is fatal; the query-support indexes
/// are best-effort.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    // Case-insensitive category name uniqueness per owner. The application
    // pre-checks for a friendly error, but this index decides races.
    let stmt = Index::create()
        .if_not_exists()
        .unique()
        .name("uq_category_owner_name_key")
        .table(category::Entity)
        .col(category::Column::OwnerId)
        .col(category::Column::NameKey)
        .to_string(PostgresQueryBuilder);
    db.execute_unprepared(&stmt).await?;
    info!("Ensured index uq_category_owner_name_key exists");

    // One image per slot per owning entity. Together with the 1..=5 range
    // check this also caps an entity at five images under racing uploads.
    let stmt = Index::create()
        .if_not_exists()
        .unique()
        .name("uq_image_entity_order")
        .table(image::Entity)
        .col(image::Column::EntityType)
        .col(image::Column::EntityId)
        .col(image::Column::DisplayOrder)
        .to_string(PostgresQueryBuilder);
    db.execute_unprepared(&stmt).await?;
    info!("Ensured index uq_image_entity_order exists");

    // Composite index for the item list query:
    // SELECT ... FROM item WHERE owner_id = ? ORDER BY created_at, id
    let stmt = Index::create()
        .if_not_exists()
        .name("idx_item_owner_created")
        .table(item::Entity)
        .col(item::Column::OwnerId)
        .col(item::Column::CreatedAt)
        .to_string(PostgresQueryBuilder);
    if let Err(e) = db.execute_unprepared(&stmt).await {
        tracing::warn!("Failed to create index idx_item_owner_created: {}", e);
    }

    // Composite index for image lookups by owning entity.
    let stmt = Index::create()
        .if_not_exists()
        .name("idx_image_entity")
        .table(image::Entity)
        .col(image::Column::EntityType)
        .col(image::Column::EntityId)
        .to_string(PostgresQueryBuilder);
    if let Err(e) = db.execute_unprepared(&stmt).await {
        tracing::warn!("Failed to create index idx_image_entity: {}", e);
    }

    Ok(())
}
