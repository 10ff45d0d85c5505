//! Attachment rules for the 1-5-slot ordered image list carried by items and
//! containers, and the cleanup that keeps the blob store consistent with the
//! image metadata.
//!
//! Ordering is authoritative in the database: the unique index over
//! `(entity_type, entity_id, display_order)` decides slot races, and the
//! helpers here translate its verdicts. Blob writes and deletes are never
//! transactional with the metadata; every flow is sequenced so a failure
//! leaves at worst an orphaned blob, never a metadata row without its entity.

use common::BlobStore;
use sea_orm::*;
use uuid::Uuid;

use crate::entity::image::{self, OwnerKind};
use crate::error::AppError;

/// Maximum number of images attached to a single item or container.
pub const MAX_IMAGES_PER_ENTITY: usize = 5;

/// Valid display-order slots.
pub const SLOT_RANGE: std::ops::RangeInclusive<i32> = 1..=5;

/// Accepted upload formats, as (MIME type, storage extension).
const ACCEPTED_FORMATS: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/webp", "webp"),
];

/// Resolve an upload's declared filename to an accepted image format.
///
/// Returns the canonical MIME type and storage extension, or a validation
/// error naming the accepted formats.
pub fn accepted_format(filename: &str) -> Result<(&'static str, &'static str), AppError> {
    let guessed = mime_guess::from_path(filename).first();
    let mime = guessed.as_ref().map(|m| m.essence_str());
    ACCEPTED_FORMATS
        .iter()
        .find(|(accepted, _)| Some(*accepted) == mime)
        .copied()
        .ok_or_else(|| {
            AppError::Validation("Image must be JPEG, PNG, or WebP".into())
        })
}

/// Pick the display-order slot for a new image.
///
/// A requested slot must be in 1..=5 and unoccupied; otherwise the lowest
/// free slot is assigned. `used` is the set of occupied slots, which the
/// caller has already checked to be below the cap.
pub fn assign_slot(used: &[i32], requested: Option<i32>) -> Result<i32, AppError> {
    match requested {
        Some(slot) => {
            if !SLOT_RANGE.contains(&slot) {
                return Err(AppError::Validation(
                    "display_order must be between 1 and 5".into(),
                ));
            }
            if used.contains(&slot) {
                return Err(AppError::Conflict(format!(
                    "Image slot {slot} is already occupied"
                )));
            }
            Ok(slot)
        }
        None => SLOT_RANGE
            .clone()
            .find(|slot| !used.contains(slot))
            .ok_or_else(|| {
                AppError::Conflict(format!(
                    "Cannot attach more than {MAX_IMAGES_PER_ENTITY} images"
                ))
            }),
    }
}

/// Blob store key for a freshly uploaded image.
pub fn new_storage_path(owner_id: i32, kind: OwnerKind, entity_id: i32, ext: &str) -> String {
    format!(
        "images/{owner_id}/{}/{entity_id}/{}.{ext}",
        kind.noun(),
        Uuid::now_v7()
    )
}

/// All images attached to an entity, ordered by slot.
pub async fn images_for_entity<C: ConnectionTrait>(
    db: &C,
    kind: OwnerKind,
    entity_id: i32,
) -> Result<Vec<image::Model>, AppError> {
    Ok(image::Entity::find()
        .filter(image::Column::EntityType.eq(kind))
        .filter(image::Column::EntityId.eq(entity_id))
        .order_by_asc(image::Column::DisplayOrder)
        .all(db)
        .await?)
}

/// Delete all image metadata rows for an entity within the caller's
/// transaction, returning the storage paths of the removed blobs.
///
/// The caller commits the transaction together with the entity deletion,
/// then hands the paths to [`purge_blobs`]. A crash between commit and purge
/// orphans blobs, which is the recoverable side of the inconsistency.
pub async fn detach_all(
    txn: &DatabaseTransaction,
    kind: OwnerKind,
    entity_id: i32,
) -> Result<Vec<String>, AppError> {
    let paths: Vec<String> = image::Entity::find()
        .filter(image::Column::EntityType.eq(kind))
        .filter(image::Column::EntityId.eq(entity_id))
        .select_only()
        .column(image::Column::StoragePath)
        .into_tuple::<String>()
        .all(txn)
        .await?;

    image::Entity::delete_many()
        .filter(image::Column::EntityType.eq(kind))
        .filter(image::Column::EntityId.eq(entity_id))
        .exec(txn)
        .await?;

    Ok(paths)
}

/// Best-effort blob deletion after the owning metadata is gone.
pub async fn purge_blobs(blob_store: &dyn BlobStore, paths: &[String]) {
    for path in paths {
        if let Err(e) = blob_store.delete(path).await {
            tracing::warn!("Failed to delete blob {path}: {e}");
        }
    }
}
