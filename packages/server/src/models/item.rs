use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, FieldError};

pub use super::shared::{Pagination, escape_like};
use super::image::ImageResponse;
use super::shared::{check_description, check_name, double_option, finish_validation};

/// Whether an item is currently in its container.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    In,
    Out,
}

impl ItemStatus {
    pub fn is_in(self) -> bool {
        matches!(self, ItemStatus::In)
    }

    pub fn from_is_in(is_in: bool) -> Self {
        if is_in { ItemStatus::In } else { ItemStatus::Out }
    }
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateItemRequest {
    #[schema(example = "Camping tent")]
    pub name: String,
    /// Must reference a category owned by the caller.
    pub category_id: i32,
    /// Must reference a container owned by the caller.
    pub container_id: i32,
    pub status: ItemStatus,
    pub description: Option<String>,
    /// Positive when present.
    pub quantity: Option<i32>,
}

#[derive(Deserialize, Default, PartialEq, utoipa::ToSchema)]
pub struct UpdateItemRequest {
    pub name: Option<String>,
    pub category_id: Option<i32>,
    pub container_id: Option<i32>,
    pub status: Option<ItemStatus>,
    /// Omit to leave unchanged, null to clear, value to set.
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    /// Omit to leave unchanged, null to clear, value to set.
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<i32>)]
    pub quantity: Option<Option<i32>>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ItemResponse {
    pub id: i32,
    pub name: String,
    pub category_id: i32,
    pub container_id: i32,
    pub status: ItemStatus,
    pub description: Option<String>,
    pub quantity: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Detail response including the item's attached images.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ItemDetailResponse {
    #[serde(flatten)]
    pub item: ItemResponse,
    pub images: Vec<ImageResponse>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ItemListResponse {
    pub data: Vec<ItemResponse>,
    pub pagination: Pagination,
}

#[derive(Deserialize, utoipa::IntoParams)]
pub struct ItemListQuery {
    /// Page number (1-based).
    pub page: Option<u64>,
    /// Items per page (1-100, default 20).
    pub per_page: Option<u64>,
    /// Case-insensitive substring match on item name. Blank means no filter.
    pub search: Option<String>,
    /// Comma-separated category ids; an item matches if it is in any of them.
    pub category_ids: Option<String>,
    /// Comma-separated container ids; an item matches if it is in any of them.
    pub container_ids: Option<String>,
    /// `in`, `out`, or `all` (default).
    pub status: Option<String>,
    /// Sort field: `name`, `created_at` (default), or `updated_at`.
    pub sort_by: Option<String>,
    /// Sort direction: `asc` or `desc` (default).
    pub sort_order: Option<String>,
}

impl From<crate::entity::item::Model> for ItemResponse {
    fn from(m: crate::entity::item::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            category_id: m.category_id,
            container_id: m.container_id,
            status: ItemStatus::from_is_in(m.is_in),
            description: m.description,
            quantity: m.quantity,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

fn check_quantity(quantity: Option<i32>, errors: &mut Vec<FieldError>) {
    if let Some(q) = quantity
        && q < 1
    {
        errors.push(FieldError {
            field: "quantity",
            message: "Quantity must be a positive integer".into(),
        });
    }
}

pub fn validate_create_item(req: &CreateItemRequest) -> Result<(), AppError> {
    let mut errors = Vec::new();
    check_name(&req.name, &mut errors);
    check_description(req.description.as_deref(), &mut errors);
    check_quantity(req.quantity, &mut errors);
    finish_validation(errors)
}

pub fn validate_update_item(req: &UpdateItemRequest) -> Result<(), AppError> {
    let mut errors = Vec::new();
    if let Some(ref name) = req.name {
        check_name(name, &mut errors);
    }
    if let Some(Some(ref desc)) = req.description {
        check_description(Some(desc), &mut errors);
    }
    if let Some(Some(q)) = req.quantity {
        check_quantity(Some(q), &mut errors);
    }
    finish_validation(errors)
}
