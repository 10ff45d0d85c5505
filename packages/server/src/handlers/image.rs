use axum::Json;
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use sea_orm::prelude::Expr;
use sea_orm::*;
use tracing::instrument;

use crate::entity::image::{self, OwnerKind};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthOwner;
use crate::extractors::json::AppJson;
use crate::media;
use crate::models::image::*;
use crate::state::AppState;

use super::category::is_unique_violation;
use super::container::{find_container, find_container_for_update};
use super::item::{find_item, find_item_for_update};

/// Body limit layer for image upload routes. Slightly above the configured
/// blob cap to leave room for multipart framing.
pub fn upload_body_limit() -> DefaultBodyLimit {
    DefaultBodyLimit::max(12 * 1024 * 1024)
}

// Item image routes.

#[utoipa::path(
    post,
    path = "/",
    tag = "Item Images",
    operation_id = "uploadItemImage",
    summary = "Upload an image for an item",
    description = "Attaches an image (JPEG, PNG, or WebP) to an item. The `file` multipart \
        field is required; an optional `display_order` field requests a specific slot in \
        1-5, otherwise the lowest free slot is assigned. An item holds at most 5 images.",
    params(("id" = i32, Path, description = "Item ID")),
    request_body(content_type = "multipart/form-data", description = "Image upload with optional display_order"),
    responses(
        (status = 201, description = "Image attached", body = ImageResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Item not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Slot occupied or image cap reached (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, owner, multipart), fields(owner_id = owner.owner_id, id))]
pub async fn upload_item_image(
    owner: AuthOwner,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    upload_image(&state, owner.owner_id, OwnerKind::Item, id, multipart).await
}

#[utoipa::path(
    put,
    path = "/reorder",
    tag = "Item Images",
    operation_id = "reorderItemImages",
    summary = "Reorder an item's images",
    description = "Replaces the ordering of all images attached to an item. The id array \
        must contain exactly the item's current images; slots are reassigned 1, 2, 3, ... \
        by array index in a single transaction.",
    params(("id" = i32, Path, description = "Item ID")),
    request_body = ReorderImagesRequest,
    responses(
        (status = 204, description = "Images reordered"),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Item not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, owner, payload), fields(owner_id = owner.owner_id, id))]
pub async fn reorder_item_images(
    owner: AuthOwner,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<ReorderImagesRequest>,
) -> Result<impl IntoResponse, AppError> {
    reorder_images(&state, owner.owner_id, OwnerKind::Item, id, payload).await
}

#[utoipa::path(
    get,
    path = "/{image_id}",
    tag = "Item Images",
    operation_id = "downloadItemImage",
    summary = "Download an item image",
    params(
        ("id" = i32, Path, description = "Item ID"),
        ("image_id" = i32, Path, description = "Image ID"),
    ),
    responses(
        (status = 200, description = "Image content"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Image not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, owner), fields(owner_id = owner.owner_id, id, image_id))]
pub async fn download_item_image(
    owner: AuthOwner,
    State(state): State<AppState>,
    Path((id, image_id)): Path<(i32, i32)>,
) -> Result<Response, AppError> {
    download_image(&state, owner.owner_id, OwnerKind::Item, id, image_id).await
}

#[utoipa::path(
    delete,
    path = "/{image_id}",
    tag = "Item Images",
    operation_id = "deleteItemImage",
    summary = "Delete an item image",
    description = "Removes the image. Remaining slots are not renumbered; consumers treat \
        the lowest existing slot as the thumbnail.",
    params(
        ("id" = i32, Path, description = "Item ID"),
        ("image_id" = i32, Path, description = "Image ID"),
    ),
    responses(
        (status = 204, description = "Image deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Image not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, owner), fields(owner_id = owner.owner_id, id, image_id))]
pub async fn delete_item_image(
    owner: AuthOwner,
    State(state): State<AppState>,
    Path((id, image_id)): Path<(i32, i32)>,
) -> Result<impl IntoResponse, AppError> {
    delete_image(&state, owner.owner_id, OwnerKind::Item, id, image_id).await
}

// Container image routes.

#[utoipa::path(
    post,
    path = "/",
    tag = "Container Images",
    operation_id = "uploadContainerImage",
    summary = "Upload an image for a container",
    description = "Attaches an image (JPEG, PNG, or WebP) to a container. Same slot and \
        count rules as item images.",
    params(("id" = i32, Path, description = "Container ID")),
    request_body(content_type = "multipart/form-data", description = "Image upload with optional display_order"),
    responses(
        (status = 201, description = "Image attached", body = ImageResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Container not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Slot occupied or image cap reached (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, owner, multipart), fields(owner_id = owner.owner_id, id))]
pub async fn upload_container_image(
    owner: AuthOwner,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    upload_image(&state, owner.owner_id, OwnerKind::Container, id, multipart).await
}

#[utoipa::path(
    put,
    path = "/reorder",
    tag = "Container Images",
    operation_id = "reorderContainerImages",
    summary = "Reorder a container's images",
    params(("id" = i32, Path, description = "Container ID")),
    request_body = ReorderImagesRequest,
    responses(
        (status = 204, description = "Images reordered"),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Container not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, owner, payload), fields(owner_id = owner.owner_id, id))]
pub async fn reorder_container_images(
    owner: AuthOwner,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<ReorderImagesRequest>,
) -> Result<impl IntoResponse, AppError> {
    reorder_images(&state, owner.owner_id, OwnerKind::Container, id, payload).await
}

#[utoipa::path(
    get,
    path = "/{image_id}",
    tag = "Container Images",
    operation_id = "downloadContainerImage",
    summary = "Download a container image",
    params(
        ("id" = i32, Path, description = "Container ID"),
        ("image_id" = i32, Path, description = "Image ID"),
    ),
    responses(
        (status = 200, description = "Image content"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Image not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, owner), fields(owner_id = owner.owner_id, id, image_id))]
pub async fn download_container_image(
    owner: AuthOwner,
    State(state): State<AppState>,
    Path((id, image_id)): Path<(i32, i32)>,
) -> Result<Response, AppError> {
    download_image(&state, owner.owner_id, OwnerKind::Container, id, image_id).await
}

#[utoipa::path(
    delete,
    path = "/{image_id}",
    tag = "Container Images",
    operation_id = "deleteContainerImage",
    summary = "Delete a container image",
    params(
        ("id" = i32, Path, description = "Container ID"),
        ("image_id" = i32, Path, description = "Image ID"),
    ),
    responses(
        (status = 204, description = "Image deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Image not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, owner), fields(owner_id = owner.owner_id, id, image_id))]
pub async fn delete_container_image(
    owner: AuthOwner,
    State(state): State<AppState>,
    Path((id, image_id)): Path<(i32, i32)>,
) -> Result<impl IntoResponse, AppError> {
    delete_image(&state, owner.owner_id, OwnerKind::Container, id, image_id).await
}

// Shared implementations.

async fn upload_image(
    state: &AppState,
    owner_id: i32,
    kind: OwnerKind,
    entity_id: i32,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ImageResponse>), AppError> {
    find_owned_target(&state.db, owner_id, kind, entity_id).await?;

    let mut file: Option<(String, Vec<u8>)> = None;
    let mut requested_order: Option<i32> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Multipart error: {e}")))?
    {
        match field.name() {
            Some("file") => {
                let filename = field
                    .file_name()
                    .map(|s| s.to_string())
                    .ok_or_else(|| {
                        AppError::Validation("File field must have a filename".into())
                    })?;
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read file: {e}")))?;
                file = Some((filename, data.to_vec()));
            }
            Some("display_order") => {
                let text = field.text().await.map_err(|e| {
                    AppError::Validation(format!("Failed to read display_order: {e}"))
                })?;
                requested_order = Some(text.trim().parse().map_err(|_| {
                    AppError::Validation("display_order must be an integer".into())
                })?);
            }
            _ => {} // Ignore unknown fields.
        }
    }

    let (filename, data) =
        file.ok_or_else(|| AppError::Validation("Missing 'file' field".into()))?;

    let (content_type, ext) = media::accepted_format(&filename)?;

    let max_bytes = state.config.storage.max_image_bytes;
    if data.len() as u64 > max_bytes {
        return Err(AppError::Validation(format!(
            "Image exceeds maximum size of {max_bytes} bytes"
        )));
    }

    // Lock the owning row so the metadata insert serializes against the
    // entity's delete-and-cascade transaction; the image table has no
    // foreign key to the target, so the lock is what keeps a row from
    // landing under an entity deleted mid-upload.
    let txn = state.db.begin().await?;
    find_owned_target_for_update(&txn, owner_id, kind, entity_id).await?;

    // Advisory cap and slot checks; the unique slot index decides races.
    let used: Vec<i32> = media::images_for_entity(&txn, kind, entity_id)
        .await?
        .into_iter()
        .map(|m| m.display_order)
        .collect();
    if used.len() >= media::MAX_IMAGES_PER_ENTITY {
        return Err(AppError::Conflict(format!(
            "Cannot attach more than {} images per {}",
            media::MAX_IMAGES_PER_ENTITY,
            kind.noun()
        )));
    }
    let slot = media::assign_slot(&used, requested_order)?;

    // Blob first, metadata last: a failed insert or commit leaves an
    // orphaned blob (cleaned up below), never a metadata row without its
    // blob.
    let storage_path = media::new_storage_path(owner_id, kind, entity_id, ext);
    state.blob_store.put(&storage_path, &data).await?;

    let now = chrono::Utc::now();
    let new_image = image::ActiveModel {
        owner_id: Set(owner_id),
        entity_type: Set(kind),
        entity_id: Set(entity_id),
        storage_path: Set(storage_path.clone()),
        filename: Set(filename),
        content_type: Set(content_type.to_string()),
        size: Set(data.len() as i64),
        display_order: Set(slot),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let model = match new_image.insert(&txn).await {
        Ok(model) => model,
        Err(e) => {
            drop(txn);
            media::purge_blobs(&*state.blob_store, std::slice::from_ref(&storage_path)).await;
            if is_unique_violation(&e) {
                return Err(AppError::Conflict(format!(
                    "Image slot {slot} is already occupied"
                )));
            }
            return Err(e.into());
        }
    };
    if let Err(e) = txn.commit().await {
        media::purge_blobs(&*state.blob_store, std::slice::from_ref(&storage_path)).await;
        return Err(e.into());
    }

    Ok((StatusCode::CREATED, Json(ImageResponse::from(model))))
}

async fn reorder_images(
    state: &AppState,
    owner_id: i32,
    kind: OwnerKind,
    entity_id: i32,
    payload: ReorderImagesRequest,
) -> Result<StatusCode, AppError> {
    validate_reorder_images(&payload)?;

    let txn = state.db.begin().await?;
    find_owned_target_for_update(&txn, owner_id, kind, entity_id).await?;

    let existing: Vec<i32> = image::Entity::find()
        .filter(image::Column::EntityType.eq(kind))
        .filter(image::Column::EntityId.eq(entity_id))
        .select_only()
        .column(image::Column::Id)
        .into_tuple::<i32>()
        .all(&txn)
        .await?;

    let existing_set: std::collections::HashSet<i32> = existing.into_iter().collect();
    let payload_set: std::collections::HashSet<i32> = payload.image_ids.iter().copied().collect();
    if existing_set != payload_set {
        return Err(AppError::Validation(
            "image_ids must contain exactly the images currently attached".into(),
        ));
    }

    // Two-phase update: park the validated rows out of range first so the
    // unique (entity, slot) index never sees a transient duplicate
    // mid-permutation. Only the validated ids are touched; a row committed
    // by another writer is never flipped negative.
    image::Entity::update_many()
        .filter(image::Column::Id.is_in(payload.image_ids.clone()))
        .col_expr(image::Column::DisplayOrder, Expr::cust("-display_order"))
        .exec(&txn)
        .await?;

    let now = chrono::Utc::now();
    for (index, &image_id) in payload.image_ids.iter().enumerate() {
        let slot = i32::try_from(index + 1)
            .map_err(|_| AppError::Validation("Too many images to reorder".into()))?;
        image::Entity::update_many()
            .filter(image::Column::Id.eq(image_id))
            .col_expr(image::Column::DisplayOrder, Expr::value(slot))
            .col_expr(image::Column::UpdatedAt, Expr::value(now))
            .exec(&txn)
            .await?;
    }

    txn.commit().await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn download_image(
    state: &AppState,
    owner_id: i32,
    kind: OwnerKind,
    entity_id: i32,
    image_id: i32,
) -> Result<Response, AppError> {
    let model = find_image(&state.db, owner_id, kind, entity_id, image_id).await?;
    let data = state.blob_store.get(&model.storage_path).await?;

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, model.content_type)
        .header(header::CONTENT_LENGTH, data.len().to_string())
        .header(header::CACHE_CONTROL, "private, max-age=3600")
        .body(axum::body::Body::from(data))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {e}")))?;

    Ok(response)
}

async fn delete_image(
    state: &AppState,
    owner_id: i32,
    kind: OwnerKind,
    entity_id: i32,
    image_id: i32,
) -> Result<StatusCode, AppError> {
    let txn = state.db.begin().await?;
    let model = find_image(&txn, owner_id, kind, entity_id, image_id).await?;

    // No renumbering: remaining slots may leave a gap, and consumers pick
    // the lowest existing slot as the thumbnail.
    image::Entity::delete_by_id(model.id).exec(&txn).await?;
    txn.commit().await?;

    media::purge_blobs(&*state.blob_store, std::slice::from_ref(&model.storage_path)).await;

    Ok(StatusCode::NO_CONTENT)
}

/// Confirm the attachment target exists and is owned by the caller.
async fn find_owned_target<C: ConnectionTrait>(
    db: &C,
    owner_id: i32,
    kind: OwnerKind,
    entity_id: i32,
) -> Result<(), AppError> {
    match kind {
        OwnerKind::Item => find_item(db, owner_id, entity_id).await.map(|_| ()),
        OwnerKind::Container => find_container(db, owner_id, entity_id).await.map(|_| ()),
    }
}

/// Like [`find_owned_target`], but row-locks the owning entity so attachment
/// writes serialize with each other and with the entity's deletion.
async fn find_owned_target_for_update(
    txn: &DatabaseTransaction,
    owner_id: i32,
    kind: OwnerKind,
    entity_id: i32,
) -> Result<(), AppError> {
    match kind {
        OwnerKind::Item => find_item_for_update(txn, owner_id, entity_id)
            .await
            .map(|_| ()),
        OwnerKind::Container => find_container_for_update(txn, owner_id, entity_id)
            .await
            .map(|_| ()),
    }
}

async fn find_image<C: ConnectionTrait>(
    db: &C,
    owner_id: i32,
    kind: OwnerKind,
    entity_id: i32,
    image_id: i32,
) -> Result<image::Model, AppError> {
    // Scoped by owner and owning entity; mismatches are uniform 404s.
    image::Entity::find_by_id(image_id)
        .filter(image::Column::OwnerId.eq(owner_id))
        .filter(image::Column::EntityType.eq(kind))
        .filter(image::Column::EntityId.eq(entity_id))
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Image not found".into()))
}
