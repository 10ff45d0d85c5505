use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "item")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub owner_id: i32,

    pub name: String,

    /// Both references are required: an item never exists uncategorized or
    /// unplaced. The foreign keys restrict deletion of the targets, which is
    /// the authoritative guard behind the friendly dependent-count check.
    pub category_id: i32,
    pub container_id: i32,

    #[sea_orm(belongs_to, from = "category_id", to = "id")]
    pub category: HasOne<super::category::Entity>,

    #[sea_orm(belongs_to, from = "container_id", to = "id")]
    pub container: HasOne<super::container::Entity>,

    /// Whether the item is currently in its container.
    pub is_in: bool,

    pub description: Option<String>,

    /// Positive when present.
    pub quantity: Option<i32>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
