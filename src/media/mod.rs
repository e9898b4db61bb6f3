//! Camera and microphone acquisition
//!
//! - `MediaDevice` opens a combined stream (platform or file backed)
//! - `MediaAcquirer` wires the stream into the audio graph: analyser for the
//!   level meter, recorder for upload
//! - `AudioLevelMonitor` polls the analyser and publishes a 0..1 level

pub mod acquirer;
pub mod analyser;
pub mod backend;
pub mod file;
pub mod level;

pub use acquirer::{process_frame, AcquiredMedia, MediaAcquirer};
pub use analyser::{AudioAnalyser, FFT_SIZE};
pub use backend::{
    AudioConstraints, AudioFrame, MediaConstraints, MediaDevice, MediaStream, MediaTrack,
    TrackKind, TrackSet, VideoSource,
};
pub use file::{AudioFile, FileMediaDevice, StillImageSource};
pub use level::{level_from_frequency_data, AudioLevelMonitor};
