use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::client::SpeechMetrics;
use crate::feedback::VideoMetrics;

/// Why the finalize handshake produced no video metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingSummary {
    /// The channel was not open when the session stopped
    NotConnected,
    /// The channel closed while the summary was pending
    ChannelClosed,
    /// No summary within the finalize timeout
    TimedOut,
}

/// Resolution of the finalize wait
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SummaryOutcome {
    Received(VideoMetrics),
    Missing(MissingSummary),
}

/// Merged speech and video record handed to the results view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionResult {
    session_id: String,
    recorded_at: DateTime<Utc>,
    duration_seconds: u64,
    duration_minutes: f64,
    speech_metrics: SpeechMetrics,
    video_metrics: Option<VideoMetrics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    video_metrics_missing: Option<MissingSummary>,
}

impl SessionResult {
    /// Build a result once both the speech analysis and the finalize
    /// outcome are in hand
    pub fn merge(
        session_id: impl Into<String>,
        elapsed_seconds: u64,
        recorded_at: DateTime<Utc>,
        speech: SpeechMetrics,
        summary: SummaryOutcome,
    ) -> Self {
        let (video_metrics, video_metrics_missing) = match summary {
            SummaryOutcome::Received(metrics) => (Some(metrics), None),
            SummaryOutcome::Missing(reason) => (None, Some(reason)),
        };

        Self {
            session_id: session_id.into(),
            recorded_at,
            duration_seconds: elapsed_seconds,
            duration_minutes: elapsed_seconds as f64 / 60.0,
            speech_metrics: speech,
            video_metrics,
            video_metrics_missing,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }

    pub fn duration_seconds(&self) -> u64 {
        self.duration_seconds
    }

    pub fn duration_minutes(&self) -> f64 {
        self.duration_minutes
    }

    pub fn speech_metrics(&self) -> &SpeechMetrics {
        &self.speech_metrics
    }

    pub fn video_metrics(&self) -> Option<&VideoMetrics> {
        self.video_metrics.as_ref()
    }

    pub fn video_metrics_missing(&self) -> Option<MissingSummary> {
        self.video_metrics_missing
    }
}
