//! Local audio recording for end-of-session upload

mod recorder;

pub use recorder::{AudioBlob, AudioChunkBuffer, LocalRecorder, RecorderFeed};
