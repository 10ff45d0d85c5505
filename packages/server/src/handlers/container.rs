use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use sea_orm::*;
use tracing::instrument;

use crate::entity::image::OwnerKind;
use crate::entity::{container, item};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthOwner;
use crate::extractors::json::AppJson;
use crate::media;
use crate::models::container::*;
use crate::models::image::ImageResponse;
use crate::state::AppState;

use super::category::{blocked_by_items, is_fk_violation};

#[utoipa::path(
    post,
    path = "/",
    tag = "Containers",
    operation_id = "createContainer",
    summary = "Create a new container",
    description = "Creates a container for the caller. Container names are not unique; \
        two containers may share a name.",
    request_body = CreateContainerRequest,
    responses(
        (status = 201, description = "Container created", body = ContainerResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, owner, payload), fields(owner_id = owner.owner_id))]
pub async fn create_container(
    owner: AuthOwner,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateContainerRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_create_container(&payload)?;

    let now = chrono::Utc::now();
    let new_container = container::ActiveModel {
        owner_id: Set(owner.owner_id),
        name: Set(payload.name.trim().to_string()),
        description: Set(payload.description),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let model = new_container.insert(&state.db).await?;

    Ok((StatusCode::CREATED, Json(ContainerResponse::from(model))))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Containers",
    operation_id = "listContainers",
    summary = "List the caller's containers",
    description = "Returns all containers owned by the caller, sorted by `name` (default) \
        or `created_at`.",
    params(ContainerListQuery),
    responses(
        (status = 200, description = "List of containers", body = ContainerListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, owner, query), fields(owner_id = owner.owner_id))]
pub async fn list_containers(
    owner: AuthOwner,
    State(state): State<AppState>,
    Query(query): Query<ContainerListQuery>,
) -> Result<Json<ContainerListResponse>, AppError> {
    let sort_column = match query.sort_by.as_deref().unwrap_or("name") {
        "name" => container::Column::Name,
        "created_at" => container::Column::CreatedAt,
        _ => {
            return Err(AppError::Validation(
                "sort_by must be one of: name, created_at".into(),
            ));
        }
    };
    let sort_order = if query.sort_order.as_deref() == Some("desc") {
        Order::Desc
    } else {
        Order::Asc
    };

    let rows = container::Entity::find()
        .filter(container::Column::OwnerId.eq(owner.owner_id))
        .order_by(sort_column, sort_order)
        .order_by(container::Column::Id, Order::Asc)
        .all(&state.db)
        .await?;

    let total = rows.len() as u64;
    let data = rows.into_iter().map(ContainerResponse::from).collect();

    Ok(Json(ContainerListResponse { data, total }))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Containers",
    operation_id = "getContainer",
    summary = "Get a container by ID",
    description = "Returns the container together with its attached images, ordered by slot.",
    params(("id" = i32, Path, description = "Container ID")),
    responses(
        (status = 200, description = "Container details", body = ContainerDetailResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Container not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, owner), fields(owner_id = owner.owner_id, id))]
pub async fn get_container(
    owner: AuthOwner,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ContainerDetailResponse>, AppError> {
    let model = find_container(&state.db, owner.owner_id, id).await?;
    let images = media::images_for_entity(&state.db, OwnerKind::Container, id)
        .await?
        .into_iter()
        .map(ImageResponse::from)
        .collect();

    Ok(Json(ContainerDetailResponse {
        container: model.into(),
        images,
    }))
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Containers",
    operation_id = "updateContainer",
    summary = "Update a container",
    description = "Partially updates a container using PATCH semantics. The `description` \
        field supports three-state updates: omit to leave unchanged, null to clear, or \
        provide a value. An empty payload returns the current resource unchanged.",
    params(("id" = i32, Path, description = "Container ID")),
    request_body = UpdateContainerRequest,
    responses(
        (status = 200, description = "Container updated", body = ContainerResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Container not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, owner, payload), fields(owner_id = owner.owner_id, id))]
pub async fn update_container(
    owner: AuthOwner,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateContainerRequest>,
) -> Result<Json<ContainerResponse>, AppError> {
    validate_update_container(&payload)?;

    if payload == UpdateContainerRequest::default() {
        let existing = find_container(&state.db, owner.owner_id, id).await?;
        return Ok(Json(existing.into()));
    }

    let txn = state.db.begin().await?;
    let existing = find_container(&txn, owner.owner_id, id).await?;
    let mut active: container::ActiveModel = existing.into();

    if let Some(ref name) = payload.name {
        active.name = Set(name.trim().to_string());
    }
    match payload.description {
        Some(Some(desc)) => active.description = Set(Some(desc)),
        Some(None) => active.description = Set(None),
        None => {}
    }
    active.updated_at = Set(chrono::Utc::now());

    let model = active.update(&txn).await?;
    txn.commit().await?;

    Ok(Json(model.into()))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Containers",
    operation_id = "deleteContainer",
    summary = "Delete a container",
    description = "Deletes a container that no item references, cascading deletion of its \
        attached images. Returns 409 CONFLICT naming the container and its exact item count \
        otherwise.",
    params(("id" = i32, Path, description = "Container ID")),
    responses(
        (status = 204, description = "Container deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Container not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Container still has items (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, owner), fields(owner_id = owner.owner_id, id))]
pub async fn delete_container(
    owner: AuthOwner,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let txn = state.db.begin().await?;
    let existing = find_container_for_update(&txn, owner.owner_id, id).await?;

    // Advisory count for the exact-count message; the restrict-on-delete
    // foreign key decides races against concurrent item creation.
    let item_count = item::Entity::find()
        .filter(item::Column::OwnerId.eq(owner.owner_id))
        .filter(item::Column::ContainerId.eq(id))
        .count(&txn)
        .await?;
    if item_count > 0 {
        return Err(blocked_by_items("container", &existing.name, item_count));
    }

    // Image metadata goes in the same transaction as the container; the
    // blobs are purged only after a successful commit.
    let orphaned = media::detach_all(&txn, OwnerKind::Container, id).await?;

    match container::Entity::delete_by_id(id).exec(&txn).await {
        Ok(_) => {}
        Err(e) if is_fk_violation(&e) => {
            return Err(blocked_by_items("container", &existing.name, 1));
        }
        Err(e) => return Err(e.into()),
    }
    txn.commit().await?;

    media::purge_blobs(&*state.blob_store, &orphaned).await;

    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn find_container<C: ConnectionTrait>(
    db: &C,
    owner_id: i32,
    id: i32,
) -> Result<container::Model, AppError> {
    // Absent and not-owned are deliberately indistinguishable.
    container::Entity::find_by_id(id)
        .filter(container::Column::OwnerId.eq(owner_id))
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Container not found".into()))
}

/// Like [`find_container`], but takes a row lock so image attachment writes
/// and the container's own delete-and-cascade serialize on the container row.
pub(crate) async fn find_container_for_update(
    txn: &DatabaseTransaction,
    owner_id: i32,
    id: i32,
) -> Result<container::Model, AppError> {
    use sea_orm::sea_query::LockType;
    container::Entity::find_by_id(id)
        .filter(container::Column::OwnerId.eq(owner_id))
        .lock(LockType::Update)
        .one(txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Container not found".into()))
}
