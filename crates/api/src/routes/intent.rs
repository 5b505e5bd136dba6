//! Route definitions for the `/intents` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::intent;
use crate::state::AppState;

/// Routes mounted at `/intents`.
///
/// ```text
/// GET    /                  -> list
/// POST   /                  -> create
/// GET    /{id}              -> get_by_id
/// DELETE /{id}              -> delete
/// POST   /{id}/patterns     -> add_pattern
/// POST   /{id}/responses    -> add_response
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(intent::list).post(intent::create))
        .route("/{id}", get(intent::get_by_id).delete(intent::delete))
        .route("/{id}/patterns", post(intent::add_pattern))
        .route("/{id}/responses", post(intent::add_response))
}
