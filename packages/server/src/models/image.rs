use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Serialize, utoipa::ToSchema)]
pub struct ImageResponse {
    pub id: i32,
    /// Slot in 1..=5. The lowest existing slot is the thumbnail.
    #[schema(example = 1)]
    pub display_order: i32,
    /// Original upload filename.
    #[schema(example = "front.jpg")]
    pub filename: String,
    /// MIME content type.
    #[schema(example = "image/jpeg")]
    pub content_type: String,
    /// Blob size in bytes.
    #[schema(example = 142857)]
    pub size: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct ReorderImagesRequest {
    /// Ordered list of image ids. Must contain exactly the entity's current
    /// images; slots are assigned 1, 2, 3, ... by array index.
    pub image_ids: Vec<i32>,
}

impl From<crate::entity::image::Model> for ImageResponse {
    fn from(m: crate::entity::image::Model) -> Self {
        Self {
            id: m.id,
            display_order: m.display_order,
            filename: m.filename,
            content_type: m.content_type,
            size: m.size,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

pub fn validate_reorder_images(req: &ReorderImagesRequest) -> Result<(), AppError> {
    if req.image_ids.is_empty() {
        return Err(AppError::Validation("image_ids must not be empty".into()));
    }
    let mut seen = HashSet::new();
    for &id in &req.image_ids {
        if !seen.insert(id) {
            return Err(AppError::Validation(format!(
                "Duplicate image_id {id} in reorder list"
            )));
        }
    }
    Ok(())
}
