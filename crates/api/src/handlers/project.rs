//! Handlers for the `/projects` resource.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use talkbox_core::error::CoreError;
use talkbox_core::paging::{clamp_limit, clamp_offset};
use talkbox_core::types::DbId;
use talkbox_db::models::npc::{CreateNpc, Npc};
use talkbox_db::models::project::{CreateProject, Project};
use talkbox_db::repositories::{NpcRepo, ProjectRepo};

use crate::error::{AppError, AppResult};
use crate::query::PaginationParams;
use crate::state::AppState;

/// POST /api/v1/projects
pub async fn create(
    State(state): State<AppState>,
    Json(input): Json<CreateProject>,
) -> AppResult<(StatusCode, Json<Project>)> {
    if input.name.trim().is_empty() {
        return Err(CoreError::Validation("Project name must not be empty".into()).into());
    }
    let project = ProjectRepo::create(&state.pool, &input).await?;
    tracing::info!(project_id = project.id, "Project created");
    Ok((StatusCode::CREATED, Json(project)))
}

/// GET /api/v1/projects
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<Vec<Project>>> {
    let projects = ProjectRepo::list(
        &state.pool,
        clamp_limit(params.limit),
        clamp_offset(params.offset),
    )
    .await?;
    Ok(Json(projects))
}

/// GET /api/v1/projects/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<Project>> {
    let project = ProjectRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Project",
            id,
        }))?;
    Ok(Json(project))
}

/// DELETE /api/v1/projects/{id}
///
/// Removes the project together with every NPC on its roster, and drops
/// those NPCs' classifier models.
pub async fn delete(State(state): State<AppState>, Path(id): Path<DbId>) -> AppResult<StatusCode> {
    let removed = ProjectRepo::delete(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Project",
            id,
        }))?;

    for npc_id in removed {
        state.classifier.forget(npc_id).await;
    }
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/projects/{project_id}/npcs
pub async fn list_npcs(
    State(state): State<AppState>,
    Path(project_id): Path<DbId>,
) -> AppResult<Json<Vec<Npc>>> {
    ensure_project_exists(&state, project_id).await?;
    let npcs = NpcRepo::list_by_project(&state.pool, project_id).await?;
    Ok(Json(npcs))
}

/// POST /api/v1/projects/{project_id}/npcs
pub async fn create_npc(
    State(state): State<AppState>,
    Path(project_id): Path<DbId>,
    Json(input): Json<CreateNpc>,
) -> AppResult<(StatusCode, Json<Npc>)> {
    if input.name.trim().is_empty() {
        return Err(CoreError::Validation("NPC name must not be empty".into()).into());
    }
    let npc = NpcRepo::create(&state.pool, project_id, &input)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Project",
            id: project_id,
        }))?;
    Ok((StatusCode::CREATED, Json(npc)))
}

async fn ensure_project_exists(state: &AppState, id: DbId) -> AppResult<()> {
    ProjectRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Project",
            id,
        }))?;
    Ok(())
}
