pub mod chat;
pub mod health;
pub mod intent;
pub mod npc;
pub mod project;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /chat                                  chat with an NPC (POST)
/// /voice                                 synthesize and stream audio (POST)
/// /audio/{id}                            claim a chat reply clip (GET)
///
/// /projects                              list, create
/// /projects/{id}                         get, delete
/// /projects/{project_id}/npcs            roster list, create NPC
///
/// /npcs                                  list
/// /npcs/{id}                             get, update, delete
/// /npcs/{id}/intents                     list, replace (PUT)
/// /npcs/{id}/catalog                     training catalog export
///
/// /intents                               list, create
/// /intents/{id}                          get, delete
/// /intents/{id}/patterns                 append pattern (POST)
/// /intents/{id}/responses                append response (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(chat::router())
        .nest("/projects", project::router())
        .nest("/npcs", npc::router())
        .nest("/intents", intent::router())
}
