#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use talkbox_core::classifier::{
    ClassifierError, ClassifierGateway, IntentClassifier, KeywordClassifier, TrainingIntent,
};
use talkbox_core::types::DbId;
use talkbox_tts::{AudioClip, AudioVault, SpeechSynthesizer, SynthesisError, TtsConfig};
use tempfile::TempDir;
use tower::ServiceExt;

use talkbox_api::config::ServerConfig;
use talkbox_api::router::build_app_router;
use talkbox_api::state::AppState;

/// Audio bytes returned by [`FakeSynthesizer`] unless told otherwise.
pub const FAKE_AUDIO: &[u8] = b"ID3\x04fake-mp3-frames";

/// Build a test `ServerConfig` with safe defaults.
///
/// The TTS endpoint points at a closed port; tests that need a real
/// upstream spin up their own.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        synthesize_replies: true,
        tts: TtsConfig::new("http://127.0.0.1:9/tts"),
    }
}

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

/// Keyword classifier that counts how often it is trained and queried.
#[derive(Default)]
pub struct CountingClassifier {
    inner: KeywordClassifier,
    pub trains: AtomicUsize,
    pub infers: AtomicUsize,
}

impl CountingClassifier {
    pub fn trains(&self) -> usize {
        self.trains.load(Ordering::SeqCst)
    }

    pub fn infers(&self) -> usize {
        self.infers.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IntentClassifier for CountingClassifier {
    async fn train(&self, npc_id: DbId, intents: &[TrainingIntent]) -> Result<(), ClassifierError> {
        self.trains.fetch_add(1, Ordering::SeqCst);
        self.inner.train(npc_id, intents).await
    }

    async fn infer(&self, npc_id: DbId, utterance: &str) -> Result<String, ClassifierError> {
        self.infers.fetch_add(1, Ordering::SeqCst);
        self.inner.infer(npc_id, utterance).await
    }

    async fn forget(&self, npc_id: DbId) {
        self.inner.forget(npc_id).await;
    }
}

/// What the fake synthesizer does on each call.
#[derive(Clone, Copy)]
pub enum FakeOutcome {
    Audio,
    UpstreamError(u16),
    Timeout,
}

/// Recorded arguments of one synthesis call.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisCall {
    pub voice_name: String,
    pub text: String,
    pub style: String,
}

/// In-process synthesizer writing [`FAKE_AUDIO`] into a private temp dir.
pub struct FakeSynthesizer {
    dir: TempDir,
    outcome: Mutex<FakeOutcome>,
    pub calls: Mutex<Vec<SynthesisCall>>,
}

impl FakeSynthesizer {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
            outcome: Mutex::new(FakeOutcome::Audio),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn set_outcome(&self, outcome: FakeOutcome) {
        *self.outcome.lock().unwrap() = outcome;
    }

    pub fn calls(&self) -> Vec<SynthesisCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of audio files currently on disk.
    pub fn files_on_disk(&self) -> usize {
        std::fs::read_dir(self.dir.path()).unwrap().count()
    }
}

#[async_trait]
impl SpeechSynthesizer for FakeSynthesizer {
    async fn synthesize(
        &self,
        voice_name: &str,
        text: &str,
        style: &str,
    ) -> Result<AudioClip, SynthesisError> {
        self.calls.lock().unwrap().push(SynthesisCall {
            voice_name: voice_name.to_string(),
            text: text.to_string(),
            style: style.to_string(),
        });
        let outcome = *self.outcome.lock().unwrap();
        match outcome {
            FakeOutcome::Audio => Ok(AudioClip::from_bytes(self.dir.path(), FAKE_AUDIO).await?),
            FakeOutcome::UpstreamError(status) => Err(SynthesisError::Upstream {
                status,
                body: "upstream exploded".to_string(),
            }),
            FakeOutcome::Timeout => Err(SynthesisError::Timeout),
        }
    }
}

// ---------------------------------------------------------------------------
// App construction
// ---------------------------------------------------------------------------

/// Application state with inspectable fakes behind the classifier and
/// synthesizer seams.
pub struct TestHarness {
    pub pool: PgPool,
    pub config: ServerConfig,
    pub engine: Arc<CountingClassifier>,
    pub classifier: Arc<ClassifierGateway>,
    pub synthesizer: Arc<FakeSynthesizer>,
    pub audio_vault: Arc<AudioVault>,
}

impl TestHarness {
    pub fn new(pool: PgPool) -> Self {
        Self::with_config(pool, test_config())
    }

    pub fn with_config(pool: PgPool, config: ServerConfig) -> Self {
        let engine = Arc::new(CountingClassifier::default());
        let classifier = Arc::new(ClassifierGateway::new(engine.clone()));
        Self {
            pool,
            config,
            engine,
            classifier,
            synthesizer: Arc::new(FakeSynthesizer::new()),
            audio_vault: Arc::new(AudioVault::new(Duration::from_secs(300))),
        }
    }

    /// A fresh router over the shared state.
    pub fn app(&self) -> Router {
        let state = AppState {
            pool: self.pool.clone(),
            config: Arc::new(self.config.clone()),
            classifier: Arc::clone(&self.classifier),
            synthesizer: self.synthesizer.clone(),
            audio_vault: Arc::clone(&self.audio_vault),
        };
        build_app_router(state, &self.config)
    }
}

/// Build the full application router with all middleware layers, using the
/// given database pool and default fakes.
pub fn build_test_app(pool: PgPool) -> Router {
    TestHarness::new(pool).app()
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn get(app: Router, uri: &str) -> Response {
    send(app, Method::GET, uri, None).await
}

pub async fn delete(app: Router, uri: &str) -> Response {
    send(app, Method::DELETE, uri, None).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response {
    send(app, Method::POST, uri, Some(body)).await
}

pub async fn put_json(app: Router, uri: &str, body: serde_json::Value) -> Response {
    send(app, Method::PUT, uri, Some(body)).await
}

async fn send(app: Router, method: Method, uri: &str, body: Option<serde_json::Value>) -> Response {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = body_bytes(response).await;
    serde_json::from_slice(&bytes).unwrap()
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Create a project and return its id.
pub async fn create_project(app: Router, name: &str) -> DbId {
    let response = post_json(app, "/api/v1/projects", serde_json::json!({ "name": name })).await;
    assert_eq!(response.status(), 201);
    body_json(response).await["id"].as_i64().unwrap()
}

/// Create an NPC on a project's roster and return its id.
pub async fn create_npc(app: Router, project_id: DbId, name: &str) -> DbId {
    let response = post_json(
        app,
        &format!("/api/v1/projects/{project_id}/npcs"),
        serde_json::json!({
            "name": name,
            "voice": "en-US-GuyNeural",
            "style": "cheerful",
        }),
    )
    .await;
    assert_eq!(response.status(), 201);
    body_json(response).await["id"].as_i64().unwrap()
}

/// Create an intent and return its id.
pub async fn create_intent(app: Router, tag: &str, patterns: &[&str], responses: &[&str]) -> DbId {
    let response = post_json(
        app,
        "/api/v1/intents",
        serde_json::json!({
            "tag": tag,
            "patterns": patterns,
            "responses": responses,
        }),
    )
    .await;
    assert_eq!(response.status(), 201);
    body_json(response).await["id"].as_i64().unwrap()
}

/// Replace an NPC's intent set.
pub async fn set_intents(app: Router, npc_id: DbId, intent_ids: &[DbId]) {
    let response = put_json(
        app,
        &format!("/api/v1/npcs/{npc_id}/intents"),
        serde_json::json!({ "intent_ids": intent_ids }),
    )
    .await;
    assert_eq!(response.status(), 200);
}
