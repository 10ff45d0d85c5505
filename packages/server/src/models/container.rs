use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

use super::image::ImageResponse;
use super::shared::{check_description, check_name, double_option, finish_validation};

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateContainerRequest {
    #[schema(example = "Shelf A")]
    pub name: String,
    pub description: Option<String>,
}

#[derive(Deserialize, Default, PartialEq, utoipa::ToSchema)]
pub struct UpdateContainerRequest {
    pub name: Option<String>,
    /// Omit to leave unchanged, null to clear, value to set.
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ContainerResponse {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Detail response including the container's attached images.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ContainerDetailResponse {
    #[serde(flatten)]
    pub container: ContainerResponse,
    pub images: Vec<ImageResponse>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ContainerListResponse {
    pub data: Vec<ContainerResponse>,
    pub total: u64,
}

#[derive(Deserialize, utoipa::IntoParams)]
pub struct ContainerListQuery {
    /// Sort field: `name` (default) or `created_at`.
    pub sort_by: Option<String>,
    /// Sort direction: `asc` (default) or `desc`.
    pub sort_order: Option<String>,
}

impl From<crate::entity::container::Model> for ContainerResponse {
    fn from(m: crate::entity::container::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            description: m.description,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

pub fn validate_create_container(req: &CreateContainerRequest) -> Result<(), AppError> {
    let mut errors = Vec::new();
    check_name(&req.name, &mut errors);
    check_description(req.description.as_deref(), &mut errors);
    finish_validation(errors)
}

pub fn validate_update_container(req: &UpdateContainerRequest) -> Result<(), AppError> {
    let mut errors = Vec::new();
    if let Some(ref name) = req.name {
        check_name(name, &mut errors);
    }
    if let Some(Some(ref desc)) = req.description {
        check_description(Some(desc), &mut errors);
    }
    finish_validation(errors)
}
