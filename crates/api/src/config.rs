use talkbox_tts::TtsConfig;

/// Server configuration loaded from environment variables.
///
/// All fields except the TTS endpoint have defaults suitable for local
/// development. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Whether chat replies are synthesized to audio (default: `true`).
    pub synthesize_replies: bool,
    /// Upstream TTS settings and audio file handling.
    pub tts: TtsConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default                    |
    /// |---------------------------|----------------------------|
    /// | `HOST`                    | `0.0.0.0`                  |
    /// | `PORT`                    | `3000`                     |
    /// | `CORS_ORIGINS`            | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`    | `30`                       |
    /// | `CHAT_SYNTHESIZE_REPLIES` | `true`                     |
    ///
    /// TTS variables are documented on [`TtsConfig::from_env`].
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let synthesize_replies: bool = std::env::var("CHAT_SYNTHESIZE_REPLIES")
            .unwrap_or_else(|_| "true".into())
            .parse()
            .expect("CHAT_SYNTHESIZE_REPLIES must be `true` or `false`");

        let tts = TtsConfig::from_env();

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            synthesize_replies,
            tts,
        }
    }
}
