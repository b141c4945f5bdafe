//! Speech synthesis collaborator

use crate::client::HttpClientConfig;
use crate::config::AudioConfig;
use crate::{Error, Result};
use async_trait::async_trait;
use base64::Engine as _;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::debug;

/// Audio encodings the synthesizer may return
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AudioEncoding {
    Mp3,
    /// 16-bit PCM in a WAV container
    Linear16,
}

impl AudioEncoding {
    /// Container hint for the decoder
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Linear16 => "wav",
        }
    }

    #[must_use]
    pub const fn api_name(self) -> &'static str {
        match self {
            Self::Mp3 => "MP3",
            Self::Linear16 => "LINEAR16",
        }
    }
}

/// Turns text into encoded audio bytes
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Encoding of the bytes returned by [`Self::synthesize`]
    fn encoding(&self) -> AudioEncoding;

    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    audio_content: String,
}

/// Google Cloud Text-to-Speech over REST, voice and encoding fixed per run
pub struct GoogleTtsSynthesizer {
    http_client: Client,
    url: String,
    api_key: String,
    language: String,
    voice: String,
    encoding: AudioEncoding,
    sample_rate: u32,
}

impl std::fmt::Debug for GoogleTtsSynthesizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleTtsSynthesizer")
            .field("url", &self.url)
            .field("voice", &self.voice)
            .field("encoding", &self.encoding)
            .finish_non_exhaustive()
    }
}

impl GoogleTtsSynthesizer {
    pub fn new(config: &AudioConfig, api_key: String) -> Result<Self> {
        let http_client = HttpClientConfig::with_timeout(Duration::from_secs(60)).build()?;

        Ok(Self {
            http_client,
            url: config.tts_url.clone(),
            api_key,
            language: config.language.clone(),
            voice: config.voice.clone(),
            encoding: config.encoding,
            sample_rate: config.sample_rate,
        })
    }

    fn request_body(&self, text: &str) -> serde_json::Value {
        json!({
            "input": { "text": text },
            "voice": { "languageCode": self.language, "name": self.voice },
            "audioConfig": {
                "audioEncoding": self.encoding.api_name(),
                "sampleRateHertz": self.sample_rate,
            }
        })
    }
}

#[async_trait]
impl SpeechSynthesizer for GoogleTtsSynthesizer {
    fn encoding(&self) -> AudioEncoding {
        self.encoding
    }

    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        debug!("Synthesizing {} characters with {}", text.len(), self.voice);

        let response = self
            .http_client
            .post(&self.url)
            .query(&[("key", self.api_key.as_str())])
            .json(&self.request_body(text))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                service: "text_to_speech".to_string(),
                status: status.as_u16(),
                message: message.chars().take(500).collect(),
            });
        }

        let body: SynthesizeResponse = response.json().await?;
        base64::engine::general_purpose::STANDARD
            .decode(body.audio_content)
            .map_err(|e| Error::Synthesis(format!("invalid audioContent: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoding_wire_names() {
        assert_eq!(serde_json::to_value(AudioEncoding::Mp3).unwrap(), "MP3");
        assert_eq!(
            serde_json::to_value(AudioEncoding::Linear16).unwrap(),
            "LINEAR16"
        );
        assert_eq!(AudioEncoding::Linear16.extension(), "wav");
    }

    #[test]
    fn test_request_body_uses_fixed_voice() {
        let synthesizer =
            GoogleTtsSynthesizer::new(&AudioConfig::default(), "key".to_string()).unwrap();
        let body = synthesizer.request_body("Hello there");

        assert_eq!(body["input"]["text"], "Hello there");
        assert_eq!(body["voice"]["languageCode"], "en-US");
        assert_eq!(body["voice"]["name"], "en-US-Chirp3-HD-Algieba");
        assert_eq!(body["audioConfig"]["audioEncoding"], "MP3");
        assert_eq!(body["audioConfig"]["sampleRateHertz"], 24_000);
    }
}
