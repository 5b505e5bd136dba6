use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use talkbox_core::classifier::ClassifierError;
use talkbox_core::error::CoreError;
use talkbox_tts::SynthesisError;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors, the classifier and synthesis
/// failures of the chat pipeline, and HTTP-specific variants. Implements
/// [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `talkbox_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Training or inference failed, or no model exists yet.
    #[error(transparent)]
    Classifier(#[from] ClassifierError),

    /// Speech synthesis failed.
    #[error(transparent)]
    Synthesis(#[from] SynthesisError),

    /// No claimable audio clip under this id.
    #[error("Audio clip {0} not found")]
    AudioNotFound(uuid::Uuid),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    internal()
                }
            },

            // --- Database errors ---
            AppError::Database(err) => classify_sqlx_error(err),

            // --- Chat pipeline errors ---
            AppError::Classifier(err) => match err {
                ClassifierError::ModelUnavailable { .. } => {
                    (StatusCode::CONFLICT, "MODEL_UNAVAILABLE", err.to_string())
                }
                ClassifierError::Training { .. } | ClassifierError::Inference { .. } => {
                    tracing::error!(error = %err, "Classifier error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "CLASSIFIER_ERROR",
                        err.to_string(),
                    )
                }
            },
            AppError::Synthesis(err) => classify_synthesis_error(err),

            // --- HTTP-specific errors ---
            AppError::AudioNotFound(id) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("Audio clip {id} not found or already claimed"),
            ),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                internal()
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}

/// Classify a sqlx error into an HTTP status, error code, and message.
///
/// - `RowNotFound` maps to 404.
/// - Unique constraint violations (constraint name starting with `uq_`) map to 409.
/// - Everything else maps to 500 with a sanitized message.
fn classify_sqlx_error(err: &sqlx::Error) -> (StatusCode, &'static str, String) {
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
        ),
        sqlx::Error::Database(db_err) => {
            // PostgreSQL unique constraint violation: error code 23505
            if db_err.code().as_deref() == Some("23505") {
                let constraint = db_err.constraint().unwrap_or("unknown");
                if constraint.starts_with("uq_") {
                    return (
                        StatusCode::CONFLICT,
                        "CONFLICT",
                        format!("Duplicate value violates unique constraint: {constraint}"),
                    );
                }
            }
            tracing::error!(error = %db_err, "Database error");
            internal()
        }
        other => {
            tracing::error!(error = %other, "Database error");
            internal()
        }
    }
}

/// Classify a synthesis failure.
///
/// Upstream bodies are logged, not returned to the caller.
fn classify_synthesis_error(err: &SynthesisError) -> (StatusCode, &'static str, String) {
    match err {
        SynthesisError::Timeout => (
            StatusCode::GATEWAY_TIMEOUT,
            "SYNTHESIS_TIMEOUT",
            "Speech synthesis timed out".to_string(),
        ),
        SynthesisError::Upstream { status, body } => {
            tracing::error!(upstream_status = *status, body = %body, "Speech synthesis rejected");
            (
                StatusCode::BAD_GATEWAY,
                "SYNTHESIS_ERROR",
                format!("Speech synthesis failed with upstream status {status}"),
            )
        }
        SynthesisError::Request(_) | SynthesisError::Io(_) => {
            tracing::error!(error = %err, "Speech synthesis failed");
            (
                StatusCode::BAD_GATEWAY,
                "SYNTHESIS_ERROR",
                "Speech synthesis failed".to_string(),
            )
        }
        SynthesisError::Config(_) => {
            tracing::error!(error = %err, "Speech synthesis misconfigured");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "Internal server error".to_string(),
            )
        }
    }
}
