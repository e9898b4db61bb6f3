use thiserror::Error;

/// Camera/microphone acquisition failures. The session degrades, no retry.
#[derive(Debug, Error)]
pub enum MediaAccessError {
    #[error("media permission denied")]
    PermissionDenied,

    #[error("no capture device found: {0}")]
    DeviceNotFound(String),

    #[error("media device error: {0}")]
    Device(String),
}

/// Feedback channel failures. Live feedback degrades to last-known values.
#[derive(Debug, Error)]
pub enum SocketError {
    #[error("feedback channel is not open")]
    NotOpen,

    #[error("a finalize request is already pending")]
    FinalizePending,

    #[error("websocket connect failed: {0}")]
    Connect(String),

    #[error("failed to encode outbound message: {0}")]
    Encode(#[from] serde_json::Error),
}

/// An inbound payload that could not be decoded. Dropped, never fatal.
#[derive(Debug, Error)]
#[error("malformed feedback message: {reason}")]
pub struct MalformedMessageError {
    pub reason: String,
}

/// Audio upload failures. These are terminal for a finalize attempt.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("upload request failed: {0}")]
    Network(String),

    #[error("analysis service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("analysis response could not be decoded: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Error)]
pub enum RecorderError {
    #[error("recorder has not finished stopping")]
    StillRecording,

    #[error("failed to encode WAV: {0}")]
    Encode(#[from] hound::Error),
}

/// Errors surfaced by the session controller.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error(transparent)]
    Media(#[from] MediaAccessError),

    #[error(transparent)]
    Socket(#[from] SocketError),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error(transparent)]
    Recorder(#[from] RecorderError),

    #[error("recording is empty; nothing was captured")]
    EmptyRecording,

    #[error("cannot {action} while session is {state}")]
    InvalidState { action: &'static str, state: String },

    #[error("failed to persist session result: {0}")]
    Persist(String),

    #[error("session was torn down")]
    Cancelled,
}
