use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

use super::shared::{check_name, finish_validation};

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateCategoryRequest {
    /// Display name, unique per owner under case-insensitive comparison.
    #[schema(example = "Tools")]
    pub name: String,
}

#[derive(Deserialize, Default, PartialEq, utoipa::ToSchema)]
pub struct UpdateCategoryRequest {
    pub name: Option<String>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct CategoryResponse {
    pub id: i32,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct CategoryListResponse {
    pub data: Vec<CategoryResponse>,
    pub total: u64,
}

#[derive(Deserialize, utoipa::IntoParams)]
pub struct CategoryListQuery {
    /// Sort field: `name` (default) or `created_at`.
    pub sort_by: Option<String>,
    /// Sort direction: `asc` (default) or `desc`.
    pub sort_order: Option<String>,
}

impl From<crate::entity::category::Model> for CategoryResponse {
    fn from(m: crate::entity::category::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

/// Canonical comparison key for a category name.
pub fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

pub fn validate_create_category(req: &CreateCategoryRequest) -> Result<(), AppError> {
    let mut errors = Vec::new();
    check_name(&req.name, &mut errors);
    finish_validation(errors)
}

pub fn validate_update_category(req: &UpdateCategoryRequest) -> Result<(), AppError> {
    let mut errors = Vec::new();
    if let Some(ref name) = req.name {
        check_name(name, &mut errors);
    }
    finish_validation(errors)
}
