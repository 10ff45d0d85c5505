use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use sea_orm::prelude::Expr;
use sea_orm::sea_query::{Func, LikeExpr};
use sea_orm::*;
use tracing::instrument;

use crate::entity::image::OwnerKind;
use crate::entity::{category, item};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthOwner;
use crate::extractors::json::AppJson;
use crate::media;
use crate::models::image::ImageResponse;
use crate::models::item::*;
use crate::models::shared::parse_id_set;
use crate::state::AppState;

use super::category::is_fk_violation;
use super::container::find_container;

#[utoipa::path(
    post,
    path = "/",
    tag = "Items",
    operation_id = "createItem",
    summary = "Create a new item",
    description = "Creates an item referencing an existing category and container, both of \
        which must be owned by the caller. Items are never uncategorized or unplaced.",
    request_body = CreateItemRequest,
    responses(
        (status = 201, description = "Item created", body = ItemResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Category or container not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, owner, payload), fields(owner_id = owner.owner_id))]
pub async fn create_item(
    owner: AuthOwner,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateItemRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_create_item(&payload)?;

    let txn = state.db.begin().await?;
    find_owned_category(&txn, owner.owner_id, payload.category_id).await?;
    find_container(&txn, owner.owner_id, payload.container_id).await?;

    let now = chrono::Utc::now();
    let new_item = item::ActiveModel {
        owner_id: Set(owner.owner_id),
        name: Set(payload.name.trim().to_string()),
        category_id: Set(payload.category_id),
        container_id: Set(payload.container_id),
        is_in: Set(payload.status.is_in()),
        description: Set(payload.description),
        quantity: Set(payload.quantity),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    // The ownership checks above are advisory; if the category or container
    // is deleted concurrently, the foreign key fails the insert here.
    let model = match new_item.insert(&txn).await {
        Ok(model) => model,
        Err(e) if is_fk_violation(&e) => {
            return Err(AppError::NotFound("Category or container not found".into()));
        }
        Err(e) => return Err(e.into()),
    };
    txn.commit().await?;

    Ok((StatusCode::CREATED, Json(ItemResponse::from(model))))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Items",
    operation_id = "listItems",
    summary = "Search and filter items",
    description = "Returns a paginated list of the caller's items. All present criteria are \
        combined with AND: `search` matches the name case-insensitively as a substring, \
        `category_ids`/`container_ids` are set-membership filters, and `status` narrows to \
        items that are in or out. Absent criteria impose no constraint. Sorting is stable \
        (ties broken by id), so pages never skip or repeat items while the data is unchanged.",
    params(ItemListQuery),
    responses(
        (status = 200, description = "Page of items", body = ItemListResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, owner, query), fields(owner_id = owner.owner_id))]
pub async fn list_items(
    owner: AuthOwner,
    State(state): State<AppState>,
    Query(query): Query<ItemListQuery>,
) -> Result<Json<ItemListResponse>, AppError> {
    let page = Ord::max(query.page.unwrap_or(1), 1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);

    let mut select = item::Entity::find().filter(item::Column::OwnerId.eq(owner.owner_id));

    // A blank search fragment means "no text filter", not "match nothing".
    if let Some(ref search) = query.search {
        let term = escape_like(search.trim());
        if !term.is_empty() {
            select = select.filter(
                Expr::expr(Func::lower(Expr::col(item::Column::Name)))
                    .like(LikeExpr::new(format!("%{}%", term.to_lowercase())).escape('\\')),
            );
        }
    }

    if let Some(ref raw) = query.category_ids {
        let ids = parse_id_set(raw, "category_ids")?;
        if !ids.is_empty() {
            select = select.filter(item::Column::CategoryId.is_in(ids));
        }
    }

    if let Some(ref raw) = query.container_ids {
        let ids = parse_id_set(raw, "container_ids")?;
        if !ids.is_empty() {
            select = select.filter(item::Column::ContainerId.is_in(ids));
        }
    }

    match query.status.as_deref() {
        None | Some("all") => {}
        Some("in") => select = select.filter(item::Column::IsIn.eq(true)),
        Some("out") => select = select.filter(item::Column::IsIn.eq(false)),
        Some(_) => {
            return Err(AppError::Validation(
                "status must be one of: in, out, all".into(),
            ));
        }
    }

    let sort_column = match query.sort_by.as_deref().unwrap_or("created_at") {
        "name" => item::Column::Name,
        "created_at" => item::Column::CreatedAt,
        "updated_at" => item::Column::UpdatedAt,
        _ => {
            return Err(AppError::Validation(
                "sort_by must be one of: name, created_at, updated_at".into(),
            ));
        }
    };
    let sort_order = if query.sort_order.as_deref() == Some("asc") {
        Order::Asc
    } else {
        Order::Desc
    };

    let total = select
        .clone()
        .paginate(&state.db, per_page)
        .num_items()
        .await?;
    let total_pages = total.div_ceil(per_page);

    // Saturate and cap at i64::MAX: an absurd page number must yield an
    // empty page, not an arithmetic panic or an out-of-range bind.
    let offset = std::cmp::Ord::min((page - 1).saturating_mul(per_page), i64::MAX as u64);

    let data = select
        .order_by(sort_column, sort_order)
        // Deterministic tie-break keeps pagination stable.
        .order_by(item::Column::Id, Order::Asc)
        .offset(Some(offset))
        .limit(Some(per_page))
        .all(&state.db)
        .await?
        .into_iter()
        .map(ItemResponse::from)
        .collect();

    Ok(Json(ItemListResponse {
        data,
        pagination: Pagination {
            page,
            per_page,
            total,
            total_pages,
        },
    }))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Items",
    operation_id = "getItem",
    summary = "Get an item by ID",
    description = "Returns the item together with its attached images, ordered by slot.",
    params(("id" = i32, Path, description = "Item ID")),
    responses(
        (status = 200, description = "Item details", body = ItemDetailResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Item not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, owner), fields(owner_id = owner.owner_id, id))]
pub async fn get_item(
    owner: AuthOwner,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ItemDetailResponse>, AppError> {
    let model = find_item(&state.db, owner.owner_id, id).await?;
    let images = media::images_for_entity(&state.db, OwnerKind::Item, id)
        .await?
        .into_iter()
        .map(ImageResponse::from)
        .collect();

    Ok(Json(ItemDetailResponse {
        item: model.into(),
        images,
    }))
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Items",
    operation_id = "updateItem",
    summary = "Update an item",
    description = "Partially updates an item using PATCH semantics. A changed category or \
        container reference must point at an entity owned by the caller. `description` and \
        `quantity` support three-state updates: omit to leave unchanged, null to clear, or \
        provide a value. An empty payload returns the current resource unchanged.",
    params(("id" = i32, Path, description = "Item ID")),
    request_body = UpdateItemRequest,
    responses(
        (status = 200, description = "Item updated", body = ItemResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Item, category, or container not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, owner, payload), fields(owner_id = owner.owner_id, id))]
pub async fn update_item(
    owner: AuthOwner,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateItemRequest>,
) -> Result<Json<ItemResponse>, AppError> {
    validate_update_item(&payload)?;

    if payload == UpdateItemRequest::default() {
        let existing = find_item(&state.db, owner.owner_id, id).await?;
        return Ok(Json(existing.into()));
    }

    let txn = state.db.begin().await?;
    let existing = find_item(&txn, owner.owner_id, id).await?;

    if let Some(category_id) = payload.category_id {
        find_owned_category(&txn, owner.owner_id, category_id).await?;
    }
    if let Some(container_id) = payload.container_id {
        find_container(&txn, owner.owner_id, container_id).await?;
    }

    let mut active: item::ActiveModel = existing.into();
    if let Some(ref name) = payload.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(category_id) = payload.category_id {
        active.category_id = Set(category_id);
    }
    if let Some(container_id) = payload.container_id {
        active.container_id = Set(container_id);
    }
    if let Some(status) = payload.status {
        active.is_in = Set(status.is_in());
    }
    match payload.description {
        Some(Some(desc)) => active.description = Set(Some(desc)),
        Some(None) => active.description = Set(None),
        None => {}
    }
    match payload.quantity {
        Some(Some(q)) => active.quantity = Set(Some(q)),
        Some(None) => active.quantity = Set(None),
        None => {}
    }
    active.updated_at = Set(chrono::Utc::now());

    let model = match active.update(&txn).await {
        Ok(model) => model,
        Err(e) if is_fk_violation(&e) => {
            return Err(AppError::NotFound("Category or container not found".into()));
        }
        Err(e) => return Err(e.into()),
    };
    txn.commit().await?;

    Ok(Json(model.into()))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Items",
    operation_id = "deleteItem",
    summary = "Delete an item",
    description = "Permanently deletes an item and cascade-deletes its attached images. \
        Item deletion is never blocked.",
    params(("id" = i32, Path, description = "Item ID")),
    responses(
        (status = 204, description = "Item deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Item not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, owner), fields(owner_id = owner.owner_id, id))]
pub async fn delete_item(
    owner: AuthOwner,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let txn = state.db.begin().await?;
    find_item_for_update(&txn, owner.owner_id, id).await?;

    // Image metadata goes in the same transaction as the item; the blobs
    // are purged only after a successful commit.
    let orphaned = media::detach_all(&txn, OwnerKind::Item, id).await?;
    item::Entity::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;

    media::purge_blobs(&*state.blob_store, &orphaned).await;

    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn find_item<C: ConnectionTrait>(
    db: &C,
    owner_id: i32,
    id: i32,
) -> Result<item::Model, AppError> {
    // Absent and not-owned are deliberately indistinguishable.
    item::Entity::find_by_id(id)
        .filter(item::Column::OwnerId.eq(owner_id))
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Item not found".into()))
}

/// Like [`find_item`], but takes a row lock so image attachment writes and
/// the item's own delete-and-cascade serialize on the item row.
pub(crate) async fn find_item_for_update(
    txn: &DatabaseTransaction,
    owner_id: i32,
    id: i32,
) -> Result<item::Model, AppError> {
    use sea_orm::sea_query::LockType;
    item::Entity::find_by_id(id)
        .filter(item::Column::OwnerId.eq(owner_id))
        .lock(LockType::Update)
        .one(txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Item not found".into()))
}

async fn find_owned_category<C: ConnectionTrait>(
    db: &C,
    owner_id: i32,
    id: i32,
) -> Result<category::Model, AppError> {
    category::Entity::find_by_id(id)
        .filter(category::Column::OwnerId.eq(owner_id))
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Category not found".into()))
}
