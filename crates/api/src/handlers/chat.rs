use axum::extract::State;
use axum::Json;

use crate::engine::{ChatDispatcher, ChatReply, ChatRequest};
use crate::error::AppResult;
use crate::state::AppState;

/// POST /api/v1/chat
pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> AppResult<Json<ChatReply>> {
    let reply = ChatDispatcher::from_state(&state).dispatch(&request).await?;
    Ok(Json(reply))
}
