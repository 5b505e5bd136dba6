//! Text-to-speech synthesis for NPC replies.
//!
//! - [`ssml`] builds the escaped speech-markup request body.
//! - [`client`] talks to the upstream TTS service (one attempt, bounded timeout).
//! - [`audio`] owns request-scoped audio files and streams them in fixed chunks.
//! - [`vault`] holds clips produced during chat until the caller fetches them.
//! - [`synthesizer`] ties the pieces together behind [`SpeechSynthesizer`].

pub mod audio;
pub mod client;
pub mod ssml;
pub mod synthesizer;
pub mod vault;

pub use audio::{AudioClip, AudioStream, AUDIO_CHUNK_SIZE};
pub use client::{SynthesisError, TtsClient, TtsConfig};
pub use ssml::SpeechRequest;
pub use synthesizer::{SpeechSynthesizer, VoiceSynthesizer};
pub use vault::AudioVault;
