use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::analyser::AudioAnalyser;
use super::backend::{AudioFrame, MediaConstraints, MediaDevice, TrackSet, VideoSource};
use crate::error::MediaAccessError;
use crate::recording::{LocalRecorder, RecorderFeed};

/// Handles produced by a successful acquisition
///
/// Owns the hardware tracks and every node derived from them (audio
/// graph, analyser, recorder) until `release()`.
pub struct AcquiredMedia {
    pub tracks: TrackSet,
    pub analyser: Arc<AudioAnalyser>,
    pub video: Option<Arc<dyn VideoSource>>,
    recorder: Option<LocalRecorder>,
    muted: Arc<AtomicBool>,
    graph: Option<JoinHandle<()>>,
    released: bool,
}

impl AcquiredMedia {
    /// Take the recorder bound to this stream
    pub fn take_recorder(&mut self) -> Option<LocalRecorder> {
        self.recorder.take()
    }

    pub fn set_muted(&self, muted: bool) {
        self.muted.store(muted, Ordering::SeqCst);
    }

    pub fn is_muted(&self) -> bool {
        self.muted.load(Ordering::SeqCst)
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Stop every track and close the audio graph. Idempotent.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        self.tracks.stop_all();
        if let Some(graph) = self.graph.take() {
            graph.abort();
        }
        if let Some(recorder) = self.recorder.as_mut() {
            recorder.shutdown();
        }

        info!("Media released ({} tracks stopped)", self.tracks.len());
    }
}

impl Drop for AcquiredMedia {
    fn drop(&mut self) {
        self.release();
    }
}

/// Requests camera+microphone access and wires the audio graph
pub struct MediaAcquirer;

impl MediaAcquirer {
    pub async fn acquire(
        device: &mut dyn MediaDevice,
        constraints: &MediaConstraints,
    ) -> Result<AcquiredMedia, MediaAccessError> {
        info!(
            "Requesting media from {} (echo_cancellation={}, noise_suppression={}, auto_gain_control={}, {}Hz)",
            device.name(),
            constraints.audio.echo_cancellation,
            constraints.audio.noise_suppression,
            constraints.audio.auto_gain_control,
            constraints.audio.sample_rate
        );

        let stream = device.open(constraints).await.map_err(|e| {
            error!("Media access failed: {}", e);
            e
        })?;

        let mut tracks = stream.tracks;
        if tracks.live_count() == 0 {
            tracks.stop_all();
            return Err(MediaAccessError::Device(
                "device returned no live tracks".to_string(),
            ));
        }
        if constraints.video && stream.video.is_none() {
            warn!("Video requested but device provided none");
        }

        let analyser = Arc::new(AudioAnalyser::new());
        let (recorder, feed) =
            LocalRecorder::bound(constraints.audio.sample_rate, constraints.audio.channels);
        let muted = Arc::new(AtomicBool::new(false));

        let graph = spawn_audio_graph(
            stream.audio_rx,
            Arc::clone(&analyser),
            feed,
            Arc::clone(&muted),
            constraints.audio.sample_rate,
            constraints.audio.channels,
        );

        info!("Media acquired: {} tracks", tracks.len());

        Ok(AcquiredMedia {
            tracks,
            analyser,
            video: stream.video,
            recorder: Some(recorder),
            muted,
            graph: Some(graph),
            released: false,
        })
    }
}

fn spawn_audio_graph(
    mut audio_rx: mpsc::Receiver<AudioFrame>,
    analyser: Arc<AudioAnalyser>,
    feed: RecorderFeed,
    muted: Arc<AtomicBool>,
    sample_rate: u32,
    channels: u16,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Audio graph started");

        while let Some(frame) = audio_rx.recv().await {
            let mut frame = process_frame(frame, sample_rate, channels);

            // A muted track keeps running but delivers silence
            if muted.load(Ordering::SeqCst) {
                frame.samples.iter_mut().for_each(|s| *s = 0);
            }

            analyser.push(&frame);
            if !feed.push(frame) {
                break;
            }
        }

        info!("Audio graph stopped");
    })
}

/// Convert a frame to the target rate and channel layout
///
/// Any channel count downmixes to mono by averaging. Rates are converted
/// by linear interpolation, so the output rate is exactly `target_sample_rate`.
pub fn process_frame(frame: AudioFrame, target_sample_rate: u32, target_channels: u16) -> AudioFrame {
    let mut processed = frame;

    if processed.channels > 1 && target_channels == 1 {
        processed = downmix_to_mono(processed);
    }

    if processed.sample_rate != target_sample_rate {
        processed = resample_frame(processed, target_sample_rate);
    }

    processed
}

/// Resample by linear interpolation between neighbouring sample groups
fn resample_frame(frame: AudioFrame, target_rate: u32) -> AudioFrame {
    if target_rate == 0 || frame.sample_rate == 0 {
        return frame;
    }

    let channels = frame.channels.max(1) as usize;
    let in_len = frame.samples.len() / channels;
    let out_len = (in_len as u64 * target_rate as u64 / frame.sample_rate as u64) as usize;
    let step = frame.sample_rate as f64 / target_rate as f64;

    let mut resampled = Vec::with_capacity(out_len * channels);
    if in_len > 0 {
        let last = in_len - 1;
        for i in 0..out_len {
            let position = i as f64 * step;
            let index = (position.floor() as usize).min(last);
            let next = (index + 1).min(last);
            let frac = position - index as f64;

            for c in 0..channels {
                let a = frame.samples[index * channels + c] as f64;
                let b = frame.samples[next * channels + c] as f64;
                resampled.push((a + (b - a) * frac).round() as i16);
            }
        }
    }

    AudioFrame {
        samples: resampled,
        sample_rate: target_rate,
        channels: frame.channels,
        timestamp_ms: frame.timestamp_ms,
    }
}

/// Average every interleaved sample group into one mono sample
fn downmix_to_mono(frame: AudioFrame) -> AudioFrame {
    let channels = frame.channels as usize;
    if channels <= 1 {
        return frame;
    }

    let mono_samples = frame
        .samples
        .chunks_exact(channels)
        .map(|group| {
            let sum: i32 = group.iter().map(|&s| s as i32).sum();
            (sum / channels as i32) as i16
        })
        .collect();

    AudioFrame {
        samples: mono_samples,
        sample_rate: frame.sample_rate,
        channels: 1,
        timestamp_ms: frame.timestamp_ms,
    }
}
