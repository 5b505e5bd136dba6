//! NPC entity model and DTOs.

use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use talkbox_core::types::{DbId, Timestamp};

use crate::models::intent::IntentWithPhrases;

/// An NPC row from the `npcs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Npc {
    pub id: DbId,
    pub name: String,
    pub avatar: Option<String>,
    pub bio: String,
    /// TTS voice identifier, e.g. `en-US-GuyNeural`.
    pub voice: String,
    /// TTS speaking style, e.g. `cheerful`.
    pub style: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Reference to an intent inside an NPC payload.
///
/// Accepts either a bare id (`3`) or an intent object (`{"id": 3, ...}`);
/// any other fields of the object are ignored.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
pub enum IntentRef {
    Id(DbId),
    Object { id: DbId },
}

impl IntentRef {
    pub fn id(self) -> DbId {
        match self {
            IntentRef::Id(id) | IntentRef::Object { id } => id,
        }
    }
}

/// Collect the ids of a list of intent references.
pub fn intent_ids(refs: &[IntentRef]) -> Vec<DbId> {
    refs.iter().map(|r| r.id()).collect()
}

/// DTO for creating an NPC under a project.
///
/// The owning project comes from the URL path, never from the body.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateNpc {
    pub name: String,
    pub avatar: Option<String>,
    /// Defaults to an empty string if omitted.
    pub bio: Option<String>,
    pub voice: String,
    pub style: String,
    /// Initial intent set. Unknown ids are skipped.
    #[serde(default)]
    pub intents: Vec<IntentRef>,
}

/// DTO for updating an NPC. All fields are optional.
///
/// There is deliberately no project field: an NPC's project is fixed at
/// creation. When `intents` is present it is the complete desired set.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateNpc {
    pub name: Option<String>,
    /// Absent keeps the avatar, `null` clears it.
    #[serde(default, deserialize_with = "present")]
    pub avatar: Option<Option<String>>,
    pub bio: Option<String>,
    pub voice: Option<String>,
    pub style: Option<String>,
    pub intents: Option<Vec<IntentRef>>,
}

/// Wrap a field that is present in the payload, so an explicit `null`
/// reads as `Some(None)` rather than as a missing field.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// An NPC together with its roster entry and intent set.
#[derive(Debug, Clone, Serialize)]
pub struct NpcDetail {
    #[serde(flatten)]
    pub npc: Npc,
    /// `None` only for an orphaned NPC.
    pub project_id: Option<DbId>,
    pub intents: Vec<IntentWithPhrases>,
}

/// Outcome of removing an NPC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NpcRemoval {
    Removed,
    NotFound,
    /// The NPC has no owning project; nothing was deleted.
    Orphaned,
}

