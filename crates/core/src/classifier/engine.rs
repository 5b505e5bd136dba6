//! Engine-facing types: the training payload, the classifier trait and its
//! error type.

use serde::{Deserialize, Serialize};

use crate::types::DbId;

/// One intent as handed to the classifier for training.
///
/// Pattern and response order is the insertion order recorded in the
/// catalog; engines may rely on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingIntent {
    pub tag: String,
    pub patterns: Vec<String>,
    pub responses: Vec<String>,
}

/// Errors surfaced by the classifier layer.
#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    /// No model has ever been trained for this NPC and training was not requested.
    #[error("No trained model available for NPC {npc_id}")]
    ModelUnavailable { npc_id: DbId },

    /// The engine rejected or failed the training run.
    #[error("Training failed for NPC {npc_id}: {reason}")]
    Training { npc_id: DbId, reason: String },

    /// The engine failed to produce a reply.
    #[error("Inference failed for NPC {npc_id}: {reason}")]
    Inference { npc_id: DbId, reason: String },
}

/// A trainable utterance-to-reply model, keyed per NPC.
///
/// Implementations own all training cost. `train` replaces the NPC's model
/// wholesale; `infer` must fail with [`ClassifierError::ModelUnavailable`]
/// when it holds no model for the NPC.
#[async_trait::async_trait]
pub trait IntentClassifier: Send + Sync {
    /// Train (or retrain) the model for `npc_id` on `intents`.
    async fn train(&self, npc_id: DbId, intents: &[TrainingIntent]) -> Result<(), ClassifierError>;

    /// Produce a reply for `utterance` using the NPC's current model.
    async fn infer(&self, npc_id: DbId, utterance: &str) -> Result<String, ClassifierError>;

    /// Drop any model held for `npc_id`.
    async fn forget(&self, npc_id: DbId);
}
