use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use sea_orm::*;
use tracing::instrument;

use crate::entity::{category, item};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthOwner;
use crate::extractors::json::AppJson;
use crate::models::category::*;
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/",
    tag = "Categories",
    operation_id = "createCategory",
    summary = "Create a new category",
    description = "Creates a category for the caller. Category names are unique per owner \
        under case-insensitive comparison; a duplicate name returns 409 CONFLICT.",
    request_body = CreateCategoryRequest,
    responses(
        (status = 201, description = "Category created", body = CategoryResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 409, description = "Duplicate name (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, owner, payload), fields(owner_id = owner.owner_id))]
pub async fn create_category(
    owner: AuthOwner,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateCategoryRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_create_category(&payload)?;

    let name = payload.name.trim().to_string();
    let key = name_key(&name);

    // Advisory pre-check for a friendly message; the unique index on
    // (owner_id, name_key) decides concurrent creates.
    if find_by_name_key(&state.db, owner.owner_id, &key)
        .await?
        .is_some()
    {
        return Err(duplicate_name(&name));
    }

    let now = chrono::Utc::now();
    let new_category = category::ActiveModel {
        owner_id: Set(owner.owner_id),
        name: Set(name.clone()),
        name_key: Set(key),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let model = match new_category.insert(&state.db).await {
        Ok(model) => model,
        Err(e) if is_unique_violation(&e) => return Err(duplicate_name(&name)),
        Err(e) => return Err(e.into()),
    };

    Ok((StatusCode::CREATED, Json(CategoryResponse::from(model))))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Categories",
    operation_id = "listCategories",
    summary = "List the caller's categories",
    description = "Returns all categories owned by the caller, sorted by `name` (default) \
        or `created_at`.",
    params(CategoryListQuery),
    responses(
        (status = 200, description = "List of categories", body = CategoryListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, owner, query), fields(owner_id = owner.owner_id))]
pub async fn list_categories(
    owner: AuthOwner,
    State(state): State<AppState>,
    Query(query): Query<CategoryListQuery>,
) -> Result<Json<CategoryListResponse>, AppError> {
    let sort_column = match query.sort_by.as_deref().unwrap_or("name") {
        "name" => category::Column::NameKey,
        "created_at" => category::Column::CreatedAt,
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

    let rows = category::Entity::find()
        .filter(category::Column::OwnerId.eq(owner.owner_id))
        .order_by(sort_column, sort_order)
        .order_by(category::Column::Id, Order::Asc)
        .all(&state.db)
        .await?;

    let total = rows.len() as u64;
    let data = rows.into_iter().map(CategoryResponse::from).collect();

    Ok(Json(CategoryListResponse { data, total }))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Categories",
    operation_id = "getCategory",
    summary = "Get a category by ID",
    params(("id" = i32, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Category details", body = CategoryResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Category not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, owner), fields(owner_id = owner.owner_id, id))]
pub async fn get_category(
    owner: AuthOwner,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<CategoryResponse>, AppError> {
    let model = find_category(&state.db, owner.owner_id, id).await?;
    Ok(Json(model.into()))
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Categories",
    operation_id = "updateCategory",
    summary = "Rename a category",
    description = "Renames a category. The new name must remain unique per owner under \
        case-insensitive comparison. An empty payload returns the current resource unchanged.",
    params(("id" = i32, Path, description = "Category ID")),
    request_body = UpdateCategoryRequest,
    responses(
        (status = 200, description = "Category updated", body = CategoryResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Category not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Duplicate name (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, owner, payload), fields(owner_id = owner.owner_id, id))]
pub async fn update_category(
    owner: AuthOwner,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateCategoryRequest>,
) -> Result<Json<CategoryResponse>, AppError> {
    validate_update_category(&payload)?;

    let Some(name) = payload.name else {
        let existing = find_category(&state.db, owner.owner_id, id).await?;
        return Ok(Json(existing.into()));
    };
    let name = name.trim().to_string();
    let key = name_key(&name);

    let txn = state.db.begin().await?;
    let existing = find_category(&txn, owner.owner_id, id).await?;

    // Renaming to the same key (e.g. a case change) must not trip the
    // duplicate pre-check against the row itself.
    if existing.name_key != key
        && find_by_name_key(&txn, owner.owner_id, &key).await?.is_some()
    {
        return Err(duplicate_name(&name));
    }

    let mut active: category::ActiveModel = existing.into();
    active.name = Set(name.clone());
    active.name_key = Set(key);
    active.updated_at = Set(chrono::Utc::now());

    let model = match active.update(&txn).await {
        Ok(model) => model,
        Err(e) if is_unique_violation(&e) => return Err(duplicate_name(&name)),
        Err(e) => return Err(e.into()),
    };
    txn.commit().await?;

    Ok(Json(model.into()))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Categories",
    operation_id = "deleteCategory",
    summary = "Delete a category",
    description = "Deletes a category that no item references. Returns 409 CONFLICT naming \
        the category and its exact item count otherwise.",
    params(("id" = i32, Path, description = "Category ID")),
    responses(
        (status = 204, description = "Category deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Category not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Category still has items (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, owner), fields(owner_id = owner.owner_id, id))]
pub async fn delete_category(
    owner: AuthOwner,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let txn = state.db.begin().await?;
    let existing = find_category(&txn, owner.owner_id, id).await?;

    // Advisory count for the exact-count message; the restrict-on-delete
    // foreign key decides races against concurrent item creation.
    let item_count = item::Entity::find()
        .filter(item::Column::OwnerId.eq(owner.owner_id))
        .filter(item::Column::CategoryId.eq(id))
        .count(&txn)
        .await?;
    if item_count > 0 {
        return Err(blocked_by_items("category", &existing.name, item_count));
    }

    match category::Entity::delete_by_id(id).exec(&txn).await {
        Ok(_) => {}
        Err(e) if is_fk_violation(&e) => {
            return Err(blocked_by_items("category", &existing.name, 1));
        }
        Err(e) => return Err(e.into()),
    }
    txn.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

async fn find_category<C: ConnectionTrait>(
    db: &C,
    owner_id: i32,
    id: i32,
) -> Result<category::Model, AppError> {
    // Absent and not-owned are deliberately indistinguishable.
    category::Entity::find_by_id(id)
        .filter(category::Column::OwnerId.eq(owner_id))
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Category not found".into()))
}

async fn find_by_name_key<C: ConnectionTrait>(
    db: &C,
    owner_id: i32,
    key: &str,
) -> Result<Option<category::Model>, AppError> {
    Ok(category::Entity::find()
        .filter(category::Column::OwnerId.eq(owner_id))
        .filter(category::Column::NameKey.eq(key))
        .one(db)
        .await?)
}

fn duplicate_name(name: &str) -> AppError {
    AppError::Conflict(format!("A category named \"{name}\" already exists"))
}

pub(crate) fn blocked_by_items(kind: &str, name: &str, count: u64) -> AppError {
    let noun = if count == 1 { "item" } else { "items" };
    AppError::Conflict(format!(
        "Cannot delete {kind} \"{name}\" because it contains {count} {noun}"
    ))
}

pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

pub(crate) fn is_fk_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::ForeignKeyConstraintViolation(_)))
}
