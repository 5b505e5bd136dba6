//! Audio endpoints: direct synthesis and retrieval of chat reply clips.
//!
//! Both stream a request-scoped file in fixed-size chunks; the file is
//! deleted once the body has been sent or the client goes away.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::Response;
use axum::Json;
use serde::Deserialize;
use talkbox_core::error::CoreError;
use talkbox_tts::AudioClip;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

const AUDIO_CONTENT_TYPE: &str = "audio/mpeg";

/// Body of `POST /api/v1/voice`.
#[derive(Debug, Deserialize)]
pub struct VoiceRequest {
    pub voice_name: String,
    pub text: String,
    #[serde(default)]
    pub style: String,
}

/// POST /api/v1/voice
pub async fn synthesize(
    State(state): State<AppState>,
    Json(input): Json<VoiceRequest>,
) -> AppResult<Response> {
    if input.voice_name.trim().is_empty() {
        return Err(CoreError::Validation("voice_name must not be empty".into()).into());
    }
    if input.text.trim().is_empty() {
        return Err(CoreError::Validation("text must not be empty".into()).into());
    }

    let clip = state
        .synthesizer
        .synthesize(&input.voice_name, &input.text, &input.style)
        .await?;
    stream_clip(clip)
}

/// GET /api/v1/audio/{id}
pub async fn claim(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<Response> {
    let clip = state
        .audio_vault
        .claim(id)
        .ok_or(AppError::AudioNotFound(id))?;
    stream_clip(clip)
}

/// Audio goes out with chunked transfer encoding, 8 KiB at a time.
fn stream_clip(clip: AudioClip) -> AppResult<Response> {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, AUDIO_CONTENT_TYPE)
        .body(Body::from_stream(clip.into_stream()))
        .map_err(|e| AppError::InternalError(e.to_string()))
}
