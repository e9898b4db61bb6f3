pub mod analysis;
pub mod config;
pub mod error;
pub mod feedback;
pub mod http;
pub mod media;
pub mod recording;
pub mod sampler;
pub mod session;

pub use analysis::{
    HttpSpeechAnalyzer, MissingSummary, ResultScores, ResultStore, SessionResult, SpeechAnalyzer,
    SpeechMetrics, SummaryOutcome,
};
pub use config::Config;
pub use error::{
    CaptureError, MalformedMessageError, MediaAccessError, RecorderError, SocketError, UploadError,
};
pub use feedback::{
    ChannelState, FeedbackChannel, FeedbackSocket, LiveFeedback, LiveFeedbackState, VideoMetrics,
};
pub use http::{create_router, AppState};
pub use media::{
    AcquiredMedia, AudioAnalyser, AudioFrame, AudioLevelMonitor, FileMediaDevice, MediaAcquirer,
    MediaConstraints, MediaDevice, MediaStream, VideoSource,
};
pub use recording::{AudioBlob, LocalRecorder};
pub use sampler::{FrameSampler, SamplerConfig};
pub use session::{SessionConfig, SessionController, SessionState, SessionStatus};
