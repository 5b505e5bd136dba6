//! Route definitions for the conversational endpoints.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{chat, voice};
use crate::state::AppState;

/// Routes mounted directly under `/api/v1`.
///
/// ```text
/// POST   /chat          -> chat
/// POST   /voice         -> synthesize
/// GET    /audio/{id}    -> claim
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/chat", post(chat::chat))
        .route("/voice", post(voice::synthesize))
        .route("/audio/{id}", get(voice::claim))
}
