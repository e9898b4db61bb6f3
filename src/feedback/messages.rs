use serde::{Deserialize, Serialize};

use crate::error::MalformedMessageError;

/// Frames sent to the analysis service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// One sampled frame as a JPEG data URL
    Video { frame: String },
    /// The user stopped recording; the service answers with a summary
    EndSession,
}

/// Per-frame signals pushed while a session is live
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveFeedback {
    pub attention_status: String,
    #[serde(default)]
    pub sentiment: Option<String>,
    #[serde(default)]
    pub posture: Option<String>,
}

/// Aggregate video scores delivered once at session end
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VideoMetrics {
    pub eye_contact_score: f64,
    pub sentiment_score: f64,
    pub posture_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryData {
    pub video_metrics: VideoMetrics,
}

/// Frames received from the analysis service, decoded once at the socket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum InboundMessage {
    #[serde(rename = "video_feedback")]
    LiveFeedback { feedback: LiveFeedback },
    #[serde(rename = "session_summary")]
    SessionSummary { data: SummaryData },
}

impl InboundMessage {
    pub fn decode(text: &str) -> Result<Self, MalformedMessageError> {
        serde_json::from_str(text).map_err(|e| MalformedMessageError {
            reason: e.to_string(),
        })
    }
}
