//! HTTP-level tests for the chat pipeline: validate, train, infer,
//! synthesize, respond.

mod common;

use assert_matches::assert_matches;
use axum::http::StatusCode;
use common::{
    body_bytes, body_json, create_intent, create_npc, create_project, delete, get, post_json,
    set_intents, FakeOutcome, TestHarness, FAKE_AUDIO,
};
use serde_json::json;
use sqlx::PgPool;
use talkbox_core::classifier::TrainingState;
use talkbox_core::types::DbId;

/// Project with "Guard#1" whose only intent is `greeting`.
async fn guard_with_greeting(harness: &TestHarness) -> DbId {
    let project_id = create_project(harness.app(), "Castle").await;
    let npc_id = create_npc(harness.app(), project_id, "Guard#1").await;
    let greeting = create_intent(
        harness.app(),
        "greeting",
        &["hi", "hello"],
        &["Hello traveler!"],
    )
    .await;
    set_intents(harness.app(), npc_id, &[greeting]).await;
    npc_id
}

fn chat_body(npc_id: DbId, sentence: &str, training_required: bool) -> serde_json::Value {
    json!({
        "npc_id": npc_id,
        "sentence": sentence,
        "training_required": training_required,
    })
}

// ---------------------------------------------------------------------------
// Happy path
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn guard_answers_greeting_after_training(pool: PgPool) {
    let harness = TestHarness::new(pool);
    let npc_id = guard_with_greeting(&harness).await;

    let response = post_json(harness.app(), "/api/v1/chat", chat_body(npc_id, "hi", true)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["AI says"], "Hello traveler!");
    assert!(json["audio_id"].is_string());

    assert_eq!(harness.engine.trains(), 1);
    assert_eq!(harness.engine.infers(), 1);

    let calls = harness.synthesizer.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].voice_name, "en-US-GuyNeural");
    assert_eq!(calls[0].style, "cheerful");
    assert_eq!(calls[0].text, "Hello traveler!");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn replies_come_only_from_associated_intents(pool: PgPool) {
    let harness = TestHarness::new(pool);
    let npc_id = guard_with_greeting(&harness).await;
    create_intent(
        harness.app(),
        "farewell",
        &["goodbye", "see you later"],
        &["Safe travels."],
    )
    .await;

    let response = post_json(
        harness.app(),
        "/api/v1/chat",
        chat_body(npc_id, "goodbye", true),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_ne!(json["AI says"], "Safe travels.");
    assert_eq!(json["AI says"], "I don't understand.");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn trained_model_is_reused_without_retraining(pool: PgPool) {
    let harness = TestHarness::new(pool);
    let npc_id = guard_with_greeting(&harness).await;

    post_json(harness.app(), "/api/v1/chat", chat_body(npc_id, "hi", true)).await;
    let response = post_json(
        harness.app(),
        "/api/v1/chat",
        chat_body(npc_id, "hello", false),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["AI says"], "Hello traveler!");
    assert_eq!(harness.engine.trains(), 1);
    assert_eq!(harness.engine.infers(), 2);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn retraining_picks_up_replaced_intents(pool: PgPool) {
    let harness = TestHarness::new(pool);
    let npc_id = guard_with_greeting(&harness).await;
    post_json(harness.app(), "/api/v1/chat", chat_body(npc_id, "hi", true)).await;

    let challenge = create_intent(
        harness.app(),
        "challenge",
        &["who goes there"],
        &["Halt! State your business."],
    )
    .await;
    set_intents(harness.app(), npc_id, &[challenge]).await;

    let stale = post_json(
        harness.app(),
        "/api/v1/chat",
        chat_body(npc_id, "who goes there", false),
    )
    .await;
    assert_eq!(body_json(stale).await["AI says"], "I don't understand.");

    let fresh = post_json(
        harness.app(),
        "/api/v1/chat",
        chat_body(npc_id, "who goes there", true),
    )
    .await;
    assert_eq!(
        body_json(fresh).await["AI says"],
        "Halt! State your business."
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn reply_audio_can_be_claimed_once(pool: PgPool) {
    let harness = TestHarness::new(pool);
    let npc_id = guard_with_greeting(&harness).await;

    let response = post_json(harness.app(), "/api/v1/chat", chat_body(npc_id, "hi", true)).await;
    let audio_id = body_json(response).await["audio_id"]
        .as_str()
        .unwrap()
        .to_string();

    let audio = get(harness.app(), &format!("/api/v1/audio/{audio_id}")).await;
    assert_eq!(audio.status(), StatusCode::OK);
    assert_eq!(audio.headers()["content-type"], "audio/mpeg");
    assert_eq!(body_bytes(audio).await, FAKE_AUDIO);
    assert_eq!(harness.synthesizer.files_on_disk(), 0);

    let again = get(harness.app(), &format!("/api/v1/audio/{audio_id}")).await;
    assert_eq!(again.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(again).await["code"], "NOT_FOUND");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn synthesis_can_be_disabled(pool: PgPool) {
    let mut config = common::test_config();
    config.synthesize_replies = false;
    let harness = TestHarness::with_config(pool, config);
    let npc_id = guard_with_greeting(&harness).await;

    let response = post_json(harness.app(), "/api/v1/chat", chat_body(npc_id, "hi", true)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["AI says"], "Hello traveler!");
    assert!(json["audio_id"].is_null());
    assert!(harness.synthesizer.calls().is_empty());
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn unknown_npc_fails_before_any_downstream_call(pool: PgPool) {
    let harness = TestHarness::new(pool);

    let response = post_json(
        harness.app(),
        "/api/v1/chat",
        chat_body(999_999, "hi", true),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "NOT_FOUND");
    assert_eq!(harness.engine.trains(), 0);
    assert_eq!(harness.engine.infers(), 0);
    assert!(harness.synthesizer.calls().is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn untrained_npc_without_training_is_model_unavailable(pool: PgPool) {
    let harness = TestHarness::new(pool);
    let npc_id = guard_with_greeting(&harness).await;

    let response = post_json(harness.app(), "/api/v1/chat", chat_body(npc_id, "hi", false)).await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "MODEL_UNAVAILABLE");
    assert_eq!(harness.engine.trains(), 0);
    assert!(harness.synthesizer.calls().is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn upstream_5xx_fails_the_whole_request(pool: PgPool) {
    let harness = TestHarness::new(pool);
    let npc_id = guard_with_greeting(&harness).await;
    harness
        .synthesizer
        .set_outcome(FakeOutcome::UpstreamError(500));

    let response = post_json(harness.app(), "/api/v1/chat", chat_body(npc_id, "hi", true)).await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let json = body_json(response).await;
    assert_eq!(json["code"], "SYNTHESIS_ERROR");
    assert!(json.get("AI says").is_none());
    assert!(harness.audio_vault.is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn synthesis_timeout_maps_to_504(pool: PgPool) {
    let harness = TestHarness::new(pool);
    let npc_id = guard_with_greeting(&harness).await;
    harness.synthesizer.set_outcome(FakeOutcome::Timeout);

    let response = post_json(harness.app(), "/api/v1/chat", chat_body(npc_id, "hi", true)).await;

    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(body_json(response).await["code"], "SYNTHESIS_TIMEOUT");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn empty_sentence_is_rejected(pool: PgPool) {
    let harness = TestHarness::new(pool);
    let npc_id = guard_with_greeting(&harness).await;

    let response = post_json(harness.app(), "/api/v1/chat", chat_body(npc_id, "   ", true)).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
    assert_eq!(harness.engine.trains(), 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unclaimed_audio_id_is_not_found(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = get(app, "/api/v1/audio/6f1c2a9e-3d7b-4b55-9f0e-2a3c4d5e6f70").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Model lifecycle
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn removing_npc_drops_its_model(pool: PgPool) {
    let harness = TestHarness::new(pool);
    let npc_id = guard_with_greeting(&harness).await;
    post_json(harness.app(), "/api/v1/chat", chat_body(npc_id, "hi", true)).await;
    assert_matches!(
        harness.classifier.state(npc_id),
        TrainingState::Trained { intent_count: 1, .. }
    );

    let response = delete(harness.app(), &format!("/api/v1/npcs/{npc_id}")).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(harness.classifier.state(npc_id), TrainingState::Idle);

    let response = post_json(harness.app(), "/api/v1/chat", chat_body(npc_id, "hi", false)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn concurrent_trainings_for_one_npc_both_succeed(pool: PgPool) {
    let harness = TestHarness::new(pool);
    let npc_id = guard_with_greeting(&harness).await;

    let (a, b) = tokio::join!(
        post_json(harness.app(), "/api/v1/chat", chat_body(npc_id, "hi", true)),
        post_json(harness.app(), "/api/v1/chat", chat_body(npc_id, "hello", true)),
    );

    assert_eq!(a.status(), StatusCode::OK);
    assert_eq!(b.status(), StatusCode::OK);
    assert_eq!(harness.engine.trains(), 2);
}
