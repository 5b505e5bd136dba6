//! Handlers for the `/intents` resource.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use talkbox_core::error::CoreError;
use talkbox_core::paging::{clamp_limit, clamp_offset};
use talkbox_core::types::DbId;
use talkbox_db::models::intent::{CreateIntent, CreatePhrase, IntentWithPhrases, Phrase};
use talkbox_db::repositories::IntentRepo;

use crate::error::{AppError, AppResult};
use crate::query::PaginationParams;
use crate::state::AppState;

fn intent_not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "Intent",
        id,
    })
}

fn validate_text(text: &str, what: &str) -> AppResult<()> {
    if text.trim().is_empty() {
        return Err(CoreError::Validation(format!("{what} must not be empty")).into());
    }
    Ok(())
}

/// POST /api/v1/intents
pub async fn create(
    State(state): State<AppState>,
    Json(input): Json<CreateIntent>,
) -> AppResult<(StatusCode, Json<IntentWithPhrases>)> {
    validate_text(&input.tag, "Intent tag")?;
    let intent = IntentRepo::create(&state.pool, &input).await?;
    tracing::info!(intent_id = intent.id, tag = %intent.tag, "Intent created");
    Ok((StatusCode::CREATED, Json(intent)))
}

/// GET /api/v1/intents
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<Vec<IntentWithPhrases>>> {
    let intents = IntentRepo::list(
        &state.pool,
        clamp_limit(params.limit),
        clamp_offset(params.offset),
    )
    .await?;
    Ok(Json(intents))
}

/// GET /api/v1/intents/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<IntentWithPhrases>> {
    let intent = IntentRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| intent_not_found(id))?;
    Ok(Json(intent))
}

/// DELETE /api/v1/intents/{id}
///
/// The intent drops out of every NPC's intent set. Models already trained
/// on it keep answering from it until the NPC is retrained.
pub async fn delete(State(state): State<AppState>, Path(id): Path<DbId>) -> AppResult<StatusCode> {
    if IntentRepo::delete(&state.pool, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(intent_not_found(id))
    }
}

/// POST /api/v1/intents/{id}/patterns
pub async fn add_pattern(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<CreatePhrase>,
) -> AppResult<(StatusCode, Json<Phrase>)> {
    validate_text(&input.text, "Pattern text")?;
    let pattern = IntentRepo::add_pattern(&state.pool, id, &input.text)
        .await?
        .ok_or_else(|| intent_not_found(id))?;
    Ok((StatusCode::CREATED, Json(pattern)))
}

/// POST /api/v1/intents/{id}/responses
pub async fn add_response(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<CreatePhrase>,
) -> AppResult<(StatusCode, Json<Phrase>)> {
    validate_text(&input.text, "Response text")?;
    let response = IntentRepo::add_response(&state.pool, id, &input.text)
        .await?
        .ok_or_else(|| intent_not_found(id))?;
    Ok((StatusCode::CREATED, Json(response)))
}
