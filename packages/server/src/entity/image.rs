use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// The kind of entity an image is attached to.
///
/// Images attach polymorphically: there is no foreign key to the owning row,
/// only this tag plus `entity_id`. Existence and ownership of the target are
/// validated in application code before any write.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum OwnerKind {
    #[sea_orm(string_value = "item")]
    Item,
    #[sea_orm(string_value = "container")]
    Container,
}

impl OwnerKind {
    /// Lowercase noun for error messages and storage paths.
    pub fn noun(self) -> &'static str {
        match self {
            OwnerKind::Item => "item",
            OwnerKind::Container => "container",
        }
    }
}

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "image")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub owner_id: i32,

    pub entity_type: OwnerKind,
    pub entity_id: i32,

    /// Blob store key. Deleting the row orphans the blob at worst; the
    /// handlers delete blobs best-effort after the metadata commit.
    pub storage_path: String,

    /// Original upload filename.
    pub filename: String,

    /// MIME content type (one of the accepted image formats).
    pub content_type: String,

    /// Blob size in bytes.
    pub size: i64,

    /// Slot in 1..=5, unique per (entity_type, entity_id). Slot 1 is the
    /// thumbnail by convention; gaps are allowed after deletions.
    pub display_order: i32,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
