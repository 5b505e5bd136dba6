//! Handlers for the `/npcs` resource and its intent associations.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use talkbox_core::error::CoreError;
use talkbox_core::paging::{clamp_limit, clamp_offset};
use talkbox_core::types::DbId;
use talkbox_db::models::intent::IntentWithPhrases;
use talkbox_db::models::npc::{Npc, NpcDetail, NpcRemoval, UpdateNpc};
use talkbox_db::repositories::{IntentCatalogRepo, NpcIntentRepo, NpcRepo};

use crate::error::{AppError, AppResult};
use crate::query::PaginationParams;
use crate::state::AppState;

/// Body of `PUT /api/v1/npcs/{id}/intents`: the complete desired intent set.
#[derive(Debug, Deserialize)]
pub struct SetIntentsRequest {
    pub intent_ids: Vec<DbId>,
}

fn npc_not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound { entity: "NPC", id })
}

/// GET /api/v1/npcs
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<Vec<Npc>>> {
    let npcs = NpcRepo::list(
        &state.pool,
        clamp_limit(params.limit),
        clamp_offset(params.offset),
    )
    .await?;
    Ok(Json(npcs))
}

/// GET /api/v1/npcs/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<NpcDetail>> {
    let npc = NpcRepo::find_detail(&state.pool, id)
        .await?
        .ok_or_else(|| npc_not_found(id))?;
    Ok(Json(npc))
}

/// PUT /api/v1/npcs/{id}
///
/// A present `intents` list replaces the NPC's whole intent set; the
/// project an NPC belongs to cannot be changed.
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateNpc>,
) -> AppResult<Json<NpcDetail>> {
    if input.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(CoreError::Validation("NPC name must not be empty".into()).into());
    }
    NpcRepo::update(&state.pool, id, &input)
        .await?
        .ok_or_else(|| npc_not_found(id))?;

    let npc = NpcRepo::find_detail(&state.pool, id)
        .await?
        .ok_or_else(|| npc_not_found(id))?;
    Ok(Json(npc))
}

/// DELETE /api/v1/npcs/{id}
pub async fn delete(State(state): State<AppState>, Path(id): Path<DbId>) -> AppResult<StatusCode> {
    match NpcRepo::remove(&state.pool, id).await? {
        NpcRemoval::Removed => {
            state.classifier.forget(id).await;
            Ok(StatusCode::NO_CONTENT)
        }
        NpcRemoval::NotFound => Err(npc_not_found(id)),
        NpcRemoval::Orphaned => Err(AppError::Core(CoreError::Conflict(format!(
            "NPC {id} is not on any project roster"
        )))),
    }
}

/// GET /api/v1/npcs/{id}/intents
pub async fn list_intents(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<Vec<IntentWithPhrases>>> {
    let intents = NpcIntentRepo::list_for_npc(&state.pool, id)
        .await?
        .ok_or_else(|| npc_not_found(id))?;
    Ok(Json(intents))
}

/// PUT /api/v1/npcs/{id}/intents
pub async fn set_intents(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<SetIntentsRequest>,
) -> AppResult<Json<Vec<IntentWithPhrases>>> {
    let intents = NpcIntentRepo::set_intents(&state.pool, id, &input.intent_ids)
        .await?
        .ok_or_else(|| npc_not_found(id))?;
    tracing::info!(npc_id = id, intents = intents.len(), "NPC intents replaced");
    Ok(Json(intents))
}

/// GET /api/v1/npcs/{id}/catalog
pub async fn catalog(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<Vec<IntentWithPhrases>>> {
    let intents = IntentCatalogRepo::export(&state.pool, id)
        .await?
        .ok_or_else(|| npc_not_found(id))?;
    Ok(Json(intents))
}
