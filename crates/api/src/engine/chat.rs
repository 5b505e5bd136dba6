//! The chat pipeline: validate the NPC, (re)train if asked, infer a reply,
//! synthesize it, respond.
//!
//! Steps run strictly in order and the first failure ends the request. A
//! missing NPC is reported before the classifier or the synthesizer is
//! touched.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use talkbox_core::classifier::ClassifierGateway;
use talkbox_core::error::CoreError;
use talkbox_core::types::DbId;
use talkbox_db::repositories::{IntentCatalogRepo, NpcRepo};
use talkbox_tts::{AudioVault, SpeechSynthesizer};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Body of `POST /api/v1/chat`.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub npc_id: DbId,
    pub sentence: String,
    /// Retrain the NPC's classifier on its current intents before answering.
    #[serde(default)]
    pub training_required: bool,
}

/// Body of a successful chat response.
#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    #[serde(rename = "AI says")]
    pub reply: String,
    /// Id to fetch the spoken reply from `/api/v1/audio/{id}`; `null` when
    /// reply synthesis is disabled.
    pub audio_id: Option<Uuid>,
}

pub struct ChatDispatcher {
    pool: PgPool,
    classifier: Arc<ClassifierGateway>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    audio_vault: Arc<AudioVault>,
    synthesize_replies: bool,
}

impl ChatDispatcher {
    pub fn from_state(state: &AppState) -> Self {
        Self {
            pool: state.pool.clone(),
            classifier: Arc::clone(&state.classifier),
            synthesizer: Arc::clone(&state.synthesizer),
            audio_vault: Arc::clone(&state.audio_vault),
            synthesize_replies: state.config.synthesize_replies,
        }
    }

    /// Run one chat turn.
    pub async fn dispatch(&self, request: &ChatRequest) -> AppResult<ChatReply> {
        let npc_id = request.npc_id;

        // 1. Validate.
        if request.sentence.trim().is_empty() {
            return Err(CoreError::Validation("sentence must not be empty".into()).into());
        }
        let npc = NpcRepo::find_by_id(&self.pool, npc_id)
            .await?
            .ok_or(AppError::Core(CoreError::NotFound {
                entity: "NPC",
                id: npc_id,
            }))?;
        tracing::debug!(npc_id, step = "validate", "NPC resolved");

        // 2. Train. The catalog snapshot transaction has committed before the
        //    engine sees the intents.
        let pool = &self.pool;
        self.classifier
            .ensure_trained::<_, _, AppError>(npc_id, request.training_required, || async move {
                IntentCatalogRepo::training_snapshot(pool, npc_id)
                    .await?
                    .ok_or(AppError::Core(CoreError::NotFound { entity: "NPC", id: npc_id }))
            })
            .await?;
        tracing::debug!(
            npc_id,
            step = "train",
            training_required = request.training_required,
            "Model ready",
        );

        // 3. Infer.
        let reply = self.classifier.infer(npc_id, &request.sentence).await?;
        tracing::debug!(
            npc_id,
            step = "infer",
            reply_chars = reply.chars().count(),
            "Reply produced",
        );

        // 4. Synthesize.
        let audio_id = if self.synthesize_replies {
            let clip = self
                .synthesizer
                .synthesize(&npc.voice, &reply, &npc.style)
                .await
                .inspect_err(|e| {
                    tracing::warn!(npc_id, step = "synthesize", error = %e, "Synthesis failed");
                })?;
            let bytes = clip.len();
            let id = self.audio_vault.deposit(clip);
            tracing::debug!(npc_id, step = "synthesize", %id, bytes, "Reply audio stored");
            Some(id)
        } else {
            None
        };

        // 5. Respond.
        tracing::info!(
            npc_id,
            step = "respond",
            has_audio = audio_id.is_some(),
            "Chat turn complete",
        );
        Ok(ChatReply { reply, audio_id })
    }
}
