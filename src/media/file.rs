use anyhow::{Context, Result};
use hound::WavReader;
use image::{Rgb, RgbImage};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

use super::backend::{
    AudioFrame, MediaConstraints, MediaDevice, MediaStream, MediaTrack, TrackKind, TrackSet,
    VideoSource,
};
use crate::error::MediaAccessError;

/// Frame length delivered by the file microphone
const FRAME_MS: u64 = 100;

/// A decoded WAV file
pub struct AudioFile {
    pub path: String,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<i16>,
}

impl AudioFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening audio file: {}", path.display());

        let reader = WavReader::open(path).context("Failed to open WAV file")?;

        let spec = reader.spec();
        let samples: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read audio samples")?;

        let duration_seconds = samples.len() as f64 / (spec.sample_rate as f64 * spec.channels as f64);

        info!(
            "Audio file loaded: {:.1}s, {}Hz, {} channels, {} samples",
            duration_seconds,
            spec.sample_rate,
            spec.channels,
            samples.len()
        );

        Ok(Self {
            path: path.display().to_string(),
            duration_seconds,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            samples,
        })
    }
}

/// Camera backed by a still image
pub struct StillImageSource {
    frame: RgbImage,
}

impl StillImageSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let frame = image::open(path.as_ref())
            .with_context(|| format!("Failed to open image: {}", path.as_ref().display()))?
            .to_rgb8();
        Ok(Self { frame })
    }

    /// Horizontal gradient test pattern
    pub fn test_pattern(width: u32, height: u32) -> Self {
        let frame = RgbImage::from_fn(width, height, |x, y| {
            let r = (x * 255 / width.max(1)) as u8;
            let g = (y * 255 / height.max(1)) as u8;
            Rgb([r, g, 128])
        });
        Self { frame }
    }
}

impl VideoSource for StillImageSource {
    fn dimensions(&self) -> Option<(u32, u32)> {
        Some(self.frame.dimensions())
    }

    fn snapshot(&self) -> Option<RgbImage> {
        Some(self.frame.clone())
    }
}

struct FileTrack {
    kind: TrackKind,
    live: Arc<AtomicBool>,
}

impl MediaTrack for FileTrack {
    fn kind(&self) -> TrackKind {
        self.kind
    }

    fn stop(&mut self) {
        self.live.store(false, Ordering::SeqCst);
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }
}

/// Media device reading a WAV file as the microphone and an optional
/// image as the camera, paced in real time
pub struct FileMediaDevice {
    audio_path: PathBuf,
    image_path: Option<PathBuf>,
    /// Loop the file instead of going silent at its end
    looping: bool,
}

impl FileMediaDevice {
    pub fn new(audio_path: impl Into<PathBuf>) -> Self {
        Self {
            audio_path: audio_path.into(),
            image_path: None,
            looping: false,
        }
    }

    pub fn with_image(mut self, image_path: impl Into<PathBuf>) -> Self {
        self.image_path = Some(image_path.into());
        self
    }

    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }
}

#[async_trait::async_trait]
impl MediaDevice for FileMediaDevice {
    async fn open(
        &mut self,
        constraints: &MediaConstraints,
    ) -> Result<MediaStream, MediaAccessError> {
        if !self.audio_path.exists() {
            return Err(MediaAccessError::DeviceNotFound(
                self.audio_path.display().to_string(),
            ));
        }
        let audio = AudioFile::open(&self.audio_path)
            .map_err(|e| MediaAccessError::Device(format!("{:#}", e)))?;

        let video: Option<Arc<dyn VideoSource>> = if constraints.video {
            let source = match &self.image_path {
                Some(path) => StillImageSource::open(path)
                    .map_err(|e| MediaAccessError::Device(format!("{:#}", e)))?,
                None => StillImageSource::test_pattern(640, 480),
            };
            Some(Arc::new(source))
        } else {
            None
        };

        let audio_live = Arc::new(AtomicBool::new(true));
        let mut tracks = TrackSet::default();
        tracks.push(Box::new(FileTrack {
            kind: TrackKind::Audio,
            live: Arc::clone(&audio_live),
        }));
        if video.is_some() {
            tracks.push(Box::new(FileTrack {
                kind: TrackKind::Video,
                live: Arc::new(AtomicBool::new(true)),
            }));
        }

        let (tx, rx) = mpsc::channel(64);
        let looping = self.looping;
        tokio::spawn(async move {
            let channels = audio.channels.max(1) as usize;
            let frame_len = (audio.sample_rate as u64 * FRAME_MS / 1000) as usize * channels;
            if frame_len == 0 {
                warn!("Audio file has no usable sample rate");
                return;
            }

            let mut interval = tokio::time::interval(Duration::from_millis(FRAME_MS));
            let mut timestamp_ms = 0;
            let mut offset = 0;

            loop {
                interval.tick().await;
                if !audio_live.load(Ordering::SeqCst) {
                    break;
                }

                if looping && offset >= audio.samples.len() {
                    offset = 0;
                }

                let samples = if offset < audio.samples.len() {
                    let end = (offset + frame_len).min(audio.samples.len());
                    let chunk = audio.samples[offset..end].to_vec();
                    offset = end;
                    chunk
                } else {
                    vec![0; frame_len]
                };

                let frame = AudioFrame {
                    samples,
                    sample_rate: audio.sample_rate,
                    channels: audio.channels,
                    timestamp_ms,
                };
                if tx.send(frame).await.is_err() {
                    break;
                }
                timestamp_ms += FRAME_MS;
            }

            info!("File microphone stopped");
        });

        Ok(MediaStream {
            audio_rx: rx,
            video,
            tracks,
        })
    }

    fn name(&self) -> &str {
        "file"
    }
}
