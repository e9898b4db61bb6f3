use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

use crate::feedback::LiveFeedbackState;

/// Lifecycle of one practice session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Recording,
    Finalizing,
    Done,
    Error {
        message: String,
        /// The upload can be attempted again
        retryable: bool,
    },
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Recording => "recording",
            Self::Finalizing => "finalizing",
            Self::Done => "done",
            Self::Error { .. } => "error",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Snapshot of what the capture page shows
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub session_id: String,

    pub state: SessionState,

    /// Prompt shown to the candidate
    pub current_question: String,

    /// When the current recording started
    pub started_at: Option<DateTime<Utc>>,

    /// Seconds counted by the session timer
    pub elapsed_seconds: u64,

    pub is_muted: bool,

    /// False when camera/microphone acquisition failed
    pub media_available: bool,

    /// Microphone level, 0.0 to 1.0
    pub audio_level: f32,

    pub live_feedback: LiveFeedbackState,
}
