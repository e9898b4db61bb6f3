use std::time::Duration;

use super::questions;
use crate::media::MediaConstraints;
use crate::sampler::SamplerConfig;

/// Configuration for a practice session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Unique session identifier (e.g., "session-<uuid>")
    pub session_id: String,

    /// Interview prompt answered during the session
    pub question: String,

    /// Camera/microphone request
    pub constraints: MediaConstraints,

    /// Frame sampling rate and encoding
    pub sampler: SamplerConfig,

    /// Upper bound on the wait for the session summary
    /// Default: 30 seconds
    pub finalize_timeout: Duration,

    /// Wall-clock timer resolution
    pub timer_interval: Duration,

    /// Audio level polling interval (one display frame)
    pub level_tick: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_id: format!("session-{}", uuid::Uuid::new_v4()),
            question: questions::question(0).to_string(),
            constraints: MediaConstraints::default(),
            sampler: SamplerConfig::default(),
            finalize_timeout: Duration::from_secs(30),
            timer_interval: Duration::from_secs(1),
            level_tick: Duration::from_millis(16),
        }
    }
}
