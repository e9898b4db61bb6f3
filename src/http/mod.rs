//! HTTP API for driving a capture session from a browser or script
//!
//! - POST /session/start - Begin recording
//! - POST /session/stop - Finalize and return the merged result
//! - POST /session/retry - Retry a failed speech upload
//! - POST /session/mute - Mute or unmute the microphone
//! - GET /session/status - Current state, timer, level and live feedback
//! - GET /results - Last persisted result with scores
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
