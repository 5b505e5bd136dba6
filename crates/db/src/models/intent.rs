//! Intent entity model, phrases (patterns and responses) and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use talkbox_core::classifier::TrainingIntent;
use talkbox_core::types::{DbId, Timestamp};

/// An intent with its patterns and responses in insertion order.
///
/// This is both the API representation of an intent and the catalog
/// projection handed to the classifier.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct IntentWithPhrases {
    pub id: DbId,
    pub tag: String,
    pub patterns: Vec<String>,
    pub responses: Vec<String>,
}

impl From<IntentWithPhrases> for TrainingIntent {
    fn from(intent: IntentWithPhrases) -> Self {
        TrainingIntent {
            tag: intent.tag,
            patterns: intent.patterns,
            responses: intent.responses,
        }
    }
}

/// A row from either the `patterns` or the `responses` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Phrase {
    pub id: DbId,
    pub intent_id: DbId,
    pub text: String,
    pub created_at: Timestamp,
}

/// A pattern or response in a create payload: `"hi"` or `{"text": "hi"}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PhraseInput {
    Text(String),
    Object { text: String },
}

impl PhraseInput {
    pub fn as_str(&self) -> &str {
        match self {
            PhraseInput::Text(text) | PhraseInput::Object { text } => text,
        }
    }
}

/// DTO for creating an intent with its initial phrases.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateIntent {
    pub tag: String,
    #[serde(default)]
    pub patterns: Vec<PhraseInput>,
    #[serde(default)]
    pub responses: Vec<PhraseInput>,
}

/// DTO for appending a single pattern or response.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePhrase {
    pub text: String,
}
