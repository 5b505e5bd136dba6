use std::path::PathBuf;

use async_trait::async_trait;

use crate::audio::AudioClip;
use crate::client::{SynthesisError, TtsClient, TtsConfig};
use crate::ssml::SpeechRequest;

/// Turns reply text into a request-scoped audio clip.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(
        &self,
        voice_name: &str,
        text: &str,
        style: &str,
    ) -> Result<AudioClip, SynthesisError>;
}

/// [`SpeechSynthesizer`] backed by the upstream TTS service.
pub struct VoiceSynthesizer {
    client: TtsClient,
    audio_dir: PathBuf,
    style_degree: f32,
}

impl VoiceSynthesizer {
    pub fn new(config: TtsConfig) -> Result<Self, SynthesisError> {
        let audio_dir = config.audio_dir.clone();
        let style_degree = config.style_degree;
        Ok(Self {
            client: TtsClient::new(config)?,
            audio_dir,
            style_degree,
        })
    }
}

#[async_trait]
impl SpeechSynthesizer for VoiceSynthesizer {
    async fn synthesize(
        &self,
        voice_name: &str,
        text: &str,
        style: &str,
    ) -> Result<AudioClip, SynthesisError> {
        let request =
            SpeechRequest::new(voice_name, style, text).with_style_degree(self.style_degree);
        let audio = self.client.synthesize(&request).await?;
        let clip = AudioClip::from_bytes(&self.audio_dir, &audio).await?;
        Ok(clip)
    }
}
