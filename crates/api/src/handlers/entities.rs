//! Handlers for the `/entities` resource.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use miqat_core::entity::EntityKind;
use miqat_core::error::CoreError;
use miqat_db::models::audit::AuditLog;
use miqat_db::models::entity::{
    DeactivatedEntity, Entity, ParentCandidate, RegisterEntity, UpdateEntity,
};
use miqat_db::repositories::{AuditLogRepo, EntityRepo};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Query parameters for `GET /entities/parents`.
#[derive(Debug, Deserialize)]
pub struct ParentsQuery {
    pub entity_type: String,
}

/// Body for `POST /entities/{id}/approve`. All fields optional.
#[derive(Debug, Default, Deserialize)]
pub struct ApprovalRequest {
    pub performed_by: Option<String>,
    pub note: Option<String>,
}

/// Body for `POST /entities/{id}/reject`. All fields optional.
#[derive(Debug, Default, Deserialize)]
pub struct RejectionRequest {
    pub performed_by: Option<String>,
    pub reason: Option<String>,
}

/// Query parameters for `DELETE /entities/{id}`.
#[derive(Debug, Default, Deserialize)]
pub struct ActorQuery {
    pub performed_by: Option<String>,
}

/// POST /api/v1/entities
pub async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterEntity>,
) -> AppResult<(StatusCode, Json<DataResponse<Entity>>)> {
    let entity = EntityRepo::register(&state.pool, &input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: entity })))
}

/// GET /api/v1/entities
///
/// Statuses are normalized against the `is_active` flag for display.
pub async fn list(State(state): State<AppState>) -> AppResult<Json<DataResponse<Vec<Entity>>>> {
    let entities = EntityRepo::list(&state.pool)
        .await?
        .into_iter()
        .map(Entity::normalized)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(DataResponse { data: entities }))
}

/// GET /api/v1/entities/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<DataResponse<Entity>>> {
    let entity = EntityRepo::find_by_id(&state.pool, &id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Entity",
            id,
        }))?
        .normalized()?;
    Ok(Json(DataResponse { data: entity }))
}

/// PUT /api/v1/entities/{id}
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<UpdateEntity>,
) -> AppResult<Json<DataResponse<Entity>>> {
    let entity = EntityRepo::update(&state.pool, &id, &input).await?;
    Ok(Json(DataResponse { data: entity }))
}

/// GET /api/v1/entities/parents?entity_type=agent
pub async fn list_parents(
    State(state): State<AppState>,
    Query(query): Query<ParentsQuery>,
) -> AppResult<Json<DataResponse<Vec<ParentCandidate>>>> {
    let kind = EntityKind::parse(&query.entity_type).map_err(AppError::Core)?;
    let parents = EntityRepo::list_available_parents(&state.pool, kind).await?;
    Ok(Json(DataResponse { data: parents }))
}

/// POST /api/v1/entities/{id}/approve
pub async fn approve(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<ApprovalRequest>,
) -> AppResult<Json<DataResponse<Entity>>> {
    let entity = EntityRepo::approve(
        &state.pool,
        &id,
        input.performed_by.as_deref(),
        input.note.as_deref(),
    )
    .await?;
    Ok(Json(DataResponse { data: entity }))
}

/// POST /api/v1/entities/{id}/reject
pub async fn reject(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<RejectionRequest>,
) -> AppResult<Json<DataResponse<Entity>>> {
    let entity = EntityRepo::reject(
        &state.pool,
        &id,
        input.performed_by.as_deref(),
        input.reason.as_deref(),
    )
    .await?;
    Ok(Json(DataResponse { data: entity }))
}

/// DELETE /api/v1/entities/{id}
///
/// Soft-deletes the entity and its whole subtree; returns the root and the
/// number of affected nodes.
pub async fn deactivate(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ActorQuery>,
) -> AppResult<Json<DataResponse<DeactivatedEntity>>> {
    let result =
        EntityRepo::deactivate_cascade(&state.pool, &id, query.performed_by.as_deref()).await?;
    Ok(Json(DataResponse { data: result }))
}

/// GET /api/v1/entities/{id}/children
pub async fn list_children(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<DataResponse<Vec<Entity>>>> {
    EntityRepo::find_by_id(&state.pool, &id)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::NotFound {
                entity: "Entity",
                id: id.clone(),
            })
        })?;

    let children = EntityRepo::list_children(&state.pool, &id)
        .await?
        .into_iter()
        .map(Entity::normalized)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(DataResponse { data: children }))
}

/// GET /api/v1/entities/{id}/audit-trail
pub async fn audit_trail(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<DataResponse<Vec<AuditLog>>>> {
    // 404 for unknown ids rather than an empty trail.
    EntityRepo::find_by_id(&state.pool, &id)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::NotFound {
                entity: "Entity",
                id: id.clone(),
            })
        })?;

    let trail = AuditLogRepo::list_for_object(&state.pool, &id).await?;
    Ok(Json(DataResponse { data: trail }))
}
