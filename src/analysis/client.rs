use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::error::UploadError;
use crate::recording::AudioBlob;

/// Speech analysis returned for an uploaded recording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeechMetrics {
    pub words_per_minute: f64,
    pub filler_word_count: u32,
    pub speech_intelligibility: f64,
    #[serde(default)]
    pub raw_transcript: String,
    /// Any further fields the service reports, kept verbatim
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Remote speech analysis
#[async_trait::async_trait]
pub trait SpeechAnalyzer: Send + Sync {
    /// Upload a recording once and return its analysis
    async fn analyze(&self, audio: AudioBlob) -> Result<SpeechMetrics, UploadError>;
}

/// Multipart upload to the analysis endpoint
pub struct HttpSpeechAnalyzer {
    client: reqwest::Client,
    url: String,
}

impl HttpSpeechAnalyzer {
    pub fn new(base_url: &str, path: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: format!("{}{}", base_url.trim_end_matches('/'), path),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait::async_trait]
impl SpeechAnalyzer for HttpSpeechAnalyzer {
    async fn analyze(&self, audio: AudioBlob) -> Result<SpeechMetrics, UploadError> {
        info!(
            "Uploading {:.1}s of audio ({} bytes) to {}",
            audio.duration_secs(),
            audio.bytes.len(),
            self.url
        );

        let part = Part::bytes(audio.bytes)
            .file_name("recording.wav")
            .mime_str("audio/wav")
            .map_err(|e| UploadError::Network(e.to_string()))?;
        let form = Form::new().part("audio", part);

        let response = self
            .client
            .post(&self.url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                error!("Audio upload failed: {}", e);
                UploadError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Analysis service returned {}", status);
            return Err(UploadError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| UploadError::Network(e.to_string()))?;
        let metrics: SpeechMetrics = serde_json::from_slice(&body)
            .map_err(|e| UploadError::InvalidResponse(e.to_string()))?;

        info!(
            "Speech analysis received: {:.0} wpm, {} filler words",
            metrics.words_per_minute, metrics.filler_word_count
        );

        Ok(metrics)
    }
}
