//! Speech analysis upload, result merging, scoring and the handoff slot

pub mod client;
pub mod result;
pub mod scores;
pub mod store;

pub use client::{HttpSpeechAnalyzer, SpeechAnalyzer, SpeechMetrics};
pub use result::{MissingSummary, SessionResult, SummaryOutcome};
pub use scores::ResultScores;
pub use store::{ResultStore, RESULTS_SLOT};
