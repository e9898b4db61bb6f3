use image::RgbImage;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::MediaAccessError;

/// Audio sample data (16-bit PCM, interleaved)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

/// Microphone processing requested from the platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioConstraints {
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    pub auto_gain_control: bool,
    /// Fixed sample rate delivered to the recorder and analyser
    pub sample_rate: u32,
    pub channels: u16,
}

impl Default for AudioConstraints {
    fn default() -> Self {
        Self {
            echo_cancellation: true,
            noise_suppression: true,
            auto_gain_control: false,
            sample_rate: 16000, // speech analysis expects 16kHz
            channels: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaConstraints {
    pub audio: AudioConstraints,
    pub video: bool,
}

impl Default for MediaConstraints {
    fn default() -> Self {
        Self {
            audio: AudioConstraints::default(),
            video: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Audio,
    Video,
}

/// A hardware track. Stopping releases the device.
pub trait MediaTrack: Send {
    fn kind(&self) -> TrackKind;

    /// Stop the track. Must tolerate repeated calls.
    fn stop(&mut self);

    fn is_live(&self) -> bool;
}

/// All tracks of one acquired stream
#[derive(Default)]
pub struct TrackSet {
    tracks: Vec<Box<dyn MediaTrack>>,
}

impl TrackSet {
    pub fn new(tracks: Vec<Box<dyn MediaTrack>>) -> Self {
        Self { tracks }
    }

    pub fn push(&mut self, track: Box<dyn MediaTrack>) {
        self.tracks.push(track);
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn live_count(&self) -> usize {
        self.tracks.iter().filter(|t| t.is_live()).count()
    }

    pub fn stop_all(&mut self) {
        for track in self.tracks.iter_mut().filter(|t| t.is_live()) {
            debug!("Stopping {:?} track", track.kind());
            track.stop();
        }
    }
}

/// Live camera feed
pub trait VideoSource: Send + Sync {
    /// Native frame size, once the device has reported it
    fn dimensions(&self) -> Option<(u32, u32)>;

    /// The current frame, if one is available
    fn snapshot(&self) -> Option<RgbImage>;
}

/// A combined audio+video stream returned by a device
pub struct MediaStream {
    pub audio_rx: mpsc::Receiver<AudioFrame>,
    pub video: Option<Arc<dyn VideoSource>>,
    pub tracks: TrackSet,
}

/// Camera and microphone access
///
/// Platform-specific implementations open the hardware; `FileMediaDevice`
/// reads a WAV file and a still image for headless runs.
#[async_trait::async_trait]
pub trait MediaDevice: Send {
    /// Request a combined stream with the given constraints
    async fn open(&mut self, constraints: &MediaConstraints)
        -> Result<MediaStream, MediaAccessError>;

    /// Get device name for logging
    fn name(&self) -> &str;
}
