use std::sync::Arc;

use talkbox_core::classifier::ClassifierGateway;
use talkbox_tts::{AudioVault, SpeechSynthesizer};

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: talkbox_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Per-NPC training coordination over the classifier engine.
    pub classifier: Arc<ClassifierGateway>,
    /// Text-to-speech backend.
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    /// Chat reply audio awaiting retrieval.
    pub audio_vault: Arc<AudioVault>,
}
