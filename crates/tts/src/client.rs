//! HTTP client for the upstream text-to-speech service.
//!
//! One POST per synthesis, bounded by a request timeout and never retried.

use std::path::PathBuf;
use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};

use crate::ssml::{SpeechRequest, DEFAULT_STYLE_DEGREE};

/// Default audio encoding requested from the service.
pub const DEFAULT_OUTPUT_FORMAT: &str = "audio-16khz-128kbitrate-mono-mp3";

const DEFAULT_TIMEOUT_SECS: u64 = 15;
const DEFAULT_AUDIO_TTL_SECS: u64 = 300;

const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";
const OUTPUT_FORMAT_HEADER: &str = "X-Microsoft-OutputFormat";
const SSML_CONTENT_TYPE: &str = "application/ssml+xml";

/// Upstream TTS settings.
#[derive(Debug, Clone)]
pub struct TtsConfig {
    /// Full URL of the synthesis endpoint.
    pub endpoint: String,
    /// Sent as `Ocp-Apim-Subscription-Key` when non-empty.
    pub api_key: String,
    /// Sent as `Authorization: Bearer ...` when non-empty.
    pub bearer_token: String,
    pub output_format: String,
    pub timeout: Duration,
    pub style_degree: f32,
    /// Directory for request-scoped audio files.
    pub audio_dir: PathBuf,
    /// How long an unclaimed chat clip is kept.
    pub audio_ttl: Duration,
}

impl TtsConfig {
    /// Configuration pointing at `endpoint` with defaults for everything else.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: String::new(),
            bearer_token: String::new(),
            output_format: DEFAULT_OUTPUT_FORMAT.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            style_degree: DEFAULT_STYLE_DEGREE,
            audio_dir: std::env::temp_dir(),
            audio_ttl: Duration::from_secs(DEFAULT_AUDIO_TTL_SECS),
        }
    }

    /// Load TTS configuration from environment variables.
    ///
    /// | Env Var             | Required | Default                            |
    /// |---------------------|----------|------------------------------------|
    /// | `TTS_ENDPOINT`      | **yes**  | --                                 |
    /// | `TTS_API_KEY`       | no       | empty (header omitted)             |
    /// | `TTS_BEARER_TOKEN`  | no       | empty (header omitted)             |
    /// | `TTS_OUTPUT_FORMAT` | no       | `audio-16khz-128kbitrate-mono-mp3` |
    /// | `TTS_TIMEOUT_SECS`  | no       | `15`                               |
    /// | `TTS_STYLE_DEGREE`  | no       | `1.0`                              |
    /// | `AUDIO_DIR`         | no       | system temp dir                    |
    /// | `AUDIO_TTL_SECS`    | no       | `300`                              |
    ///
    /// # Panics
    ///
    /// Panics if `TTS_ENDPOINT` is missing or a numeric variable does not parse.
    pub fn from_env() -> Self {
        let endpoint =
            std::env::var("TTS_ENDPOINT").expect("TTS_ENDPOINT must be set in the environment");
        assert!(!endpoint.is_empty(), "TTS_ENDPOINT must not be empty");

        let timeout_secs: u64 = std::env::var("TTS_TIMEOUT_SECS")
            .unwrap_or_else(|_| DEFAULT_TIMEOUT_SECS.to_string())
            .parse()
            .expect("TTS_TIMEOUT_SECS must be a valid u64");

        let style_degree: f32 = std::env::var("TTS_STYLE_DEGREE")
            .unwrap_or_else(|_| DEFAULT_STYLE_DEGREE.to_string())
            .parse()
            .expect("TTS_STYLE_DEGREE must be a valid number");

        let audio_ttl_secs: u64 = std::env::var("AUDIO_TTL_SECS")
            .unwrap_or_else(|_| DEFAULT_AUDIO_TTL_SECS.to_string())
            .parse()
            .expect("AUDIO_TTL_SECS must be a valid u64");

        let audio_dir = std::env::var("AUDIO_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| std::env::temp_dir());

        Self {
            endpoint,
            api_key: std::env::var("TTS_API_KEY").unwrap_or_default(),
            bearer_token: std::env::var("TTS_BEARER_TOKEN").unwrap_or_default(),
            output_format: std::env::var("TTS_OUTPUT_FORMAT")
                .unwrap_or_else(|_| DEFAULT_OUTPUT_FORMAT.to_string()),
            timeout: Duration::from_secs(timeout_secs),
            style_degree,
            audio_dir,
            audio_ttl: Duration::from_secs(audio_ttl_secs),
        }
    }
}

/// Errors from the synthesis path.
#[derive(Debug, thiserror::Error)]
pub enum SynthesisError {
    /// The HTTP request failed before a response arrived (connect, TLS, ...).
    #[error("TTS request failed: {0}")]
    Request(#[source] reqwest::Error),

    /// The service did not answer within the configured timeout.
    #[error("TTS request timed out")]
    Timeout,

    /// The service returned a non-2xx status code.
    #[error("TTS service error ({status}): {body}")]
    Upstream { status: u16, body: String },

    /// Writing or reading the request-scoped audio file failed.
    #[error("Audio file error: {0}")]
    Io(#[from] std::io::Error),

    /// A configured credential or format is not a valid header value.
    #[error("Invalid TTS configuration: {0}")]
    Config(String),
}

impl From<reqwest::Error> for SynthesisError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Request(err)
        }
    }
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue, SynthesisError> {
    HeaderValue::from_str(value)
        .map_err(|_| SynthesisError::Config(format!("{name} is not a valid header value")))
}

/// Thin wrapper over [`reqwest::Client`] for the synthesis endpoint.
pub struct TtsClient {
    client: reqwest::Client,
    config: TtsConfig,
    headers: HeaderMap,
}

impl TtsClient {
    pub fn new(config: TtsConfig) -> Result<Self, SynthesisError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("talkbox/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(SynthesisError::Request)?;
        let headers = Self::build_headers(&config)?;
        Ok(Self {
            client,
            config,
            headers,
        })
    }

    pub fn config(&self) -> &TtsConfig {
        &self.config
    }

    /// Synthesize `request`, returning the raw encoded audio.
    pub async fn synthesize(&self, request: &SpeechRequest) -> Result<Bytes, SynthesisError> {
        let ssml = request.to_ssml();
        tracing::debug!(
            voice = %request.voice_name,
            style = %request.style,
            chars = request.text.chars().count(),
            "Requesting speech synthesis",
        );

        let response = self
            .client
            .post(&self.config.endpoint)
            .headers(self.headers.clone())
            .body(ssml)
            .send()
            .await?;

        let response = Self::ensure_success(response).await?;
        let audio = response.bytes().await?;
        tracing::debug!(bytes = audio.len(), "Speech synthesis complete");
        Ok(audio)
    }

    /// Request headers, validated once so a malformed credential fails at
    /// startup instead of going out as an unauthenticated request.
    fn build_headers(config: &TtsConfig) -> Result<HeaderMap, SynthesisError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(SSML_CONTENT_TYPE));
        headers.insert(
            OUTPUT_FORMAT_HEADER,
            header_value("TTS_OUTPUT_FORMAT", &config.output_format)?,
        );
        if !config.bearer_token.is_empty() {
            headers.insert(
                AUTHORIZATION,
                header_value("TTS_BEARER_TOKEN", &format!("Bearer {}", config.bearer_token))?,
            );
        }
        if !config.api_key.is_empty() {
            headers.insert(
                SUBSCRIPTION_KEY_HEADER,
                header_value("TTS_API_KEY", &config.api_key)?,
            );
        }
        Ok(headers)
    }

    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, SynthesisError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            tracing::warn!(status = status.as_u16(), "TTS service returned an error");
            return Err(SynthesisError::Upstream {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}
