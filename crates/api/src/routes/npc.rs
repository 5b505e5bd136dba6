//! Route definitions for the `/npcs` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::npc;
use crate::state::AppState;

/// Routes mounted at `/npcs`.
///
/// ```text
/// GET    /                  -> list
/// GET    /{id}              -> get_by_id
/// PUT    /{id}              -> update
/// DELETE /{id}              -> delete
/// GET    /{id}/intents      -> list_intents
/// PUT    /{id}/intents      -> set_intents
/// GET    /{id}/catalog      -> catalog
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(npc::list))
        .route(
            "/{id}",
            get(npc::get_by_id).put(npc::update).delete(npc::delete),
        )
        .route("/{id}/intents", get(npc::list_intents).put(npc::set_intents))
        .route("/{id}/catalog", get(npc::catalog))
}
