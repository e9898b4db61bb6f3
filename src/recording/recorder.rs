use std::io::Cursor;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::RecorderError;
use crate::media::{process_frame, AudioFrame};

/// Ordered chunks captured since the last `start()`
#[derive(Debug, Default, Clone)]
pub struct AudioChunkBuffer {
    chunks: Vec<Vec<i16>>,
}

impl AudioChunkBuffer {
    pub fn clear(&mut self) {
        self.chunks.clear();
    }

    /// Append a chunk; empty chunks are dropped
    pub fn push(&mut self, chunk: Vec<i16>) {
        if !chunk.is_empty() {
            self.chunks.push(chunk);
        }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn total_samples(&self) -> usize {
        self.chunks.iter().map(Vec::len).sum()
    }

    pub fn samples(&self) -> impl Iterator<Item = i16> + '_ {
        self.chunks.iter().flatten().copied()
    }
}

/// The concatenated recording, WAV encoded
#[derive(Debug, Clone)]
pub struct AudioBlob {
    /// WAV bytes; empty when nothing was captured
    pub bytes: Vec<u8>,
    pub sample_count: usize,
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioBlob {
    pub fn empty(sample_rate: u32, channels: u16) -> Self {
        Self {
            bytes: Vec::new(),
            sample_count: 0,
            sample_rate,
            channels,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sample_count == 0
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0.0;
        }
        self.sample_count as f64 / (self.sample_rate as f64 * self.channels as f64)
    }
}

enum RecorderInput {
    Start,
    Data(AudioFrame),
    Stop(oneshot::Sender<()>),
}

/// Data-available side of a recorder, held by the audio graph
#[derive(Clone)]
pub struct RecorderFeed {
    tx: mpsc::UnboundedSender<RecorderInput>,
}

impl RecorderFeed {
    /// Hand a captured frame to the recorder. Returns false once the
    /// recorder has shut down.
    pub fn push(&self, frame: AudioFrame) -> bool {
        self.tx.send(RecorderInput::Data(frame)).is_ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Inactive,
    Recording,
    Stopped,
}

/// Buffers microphone audio for upload at the end of a session
///
/// Frames and start/stop requests travel through one FIFO channel, so a
/// stop only completes after every frame queued before it was buffered.
pub struct LocalRecorder {
    tx: Option<mpsc::UnboundedSender<RecorderInput>>,
    buffer: Arc<Mutex<AudioChunkBuffer>>,
    task: Option<JoinHandle<()>>,
    phase: Phase,
    sample_rate: u32,
    channels: u16,
}

impl LocalRecorder {
    /// Create a recorder bound to a stream, returning the feed the stream
    /// pushes frames into
    pub fn bound(sample_rate: u32, channels: u16) -> (Self, RecorderFeed) {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let buffer = Arc::new(Mutex::new(AudioChunkBuffer::default()));

        let chunks = Arc::clone(&buffer);
        let task = tokio::spawn(async move {
            let mut capturing = false;

            while let Some(input) = rx.recv().await {
                match input {
                    RecorderInput::Start => {
                        lock(&chunks).clear();
                        capturing = true;
                    }
                    RecorderInput::Data(frame) => {
                        if !capturing {
                            continue;
                        }
                        let frame = if frame.sample_rate != sample_rate || frame.channels != channels {
                            process_frame(frame, sample_rate, channels)
                        } else {
                            frame
                        };
                        // The WAV header is written from our own format
                        if frame.sample_rate != sample_rate || frame.channels != channels {
                            warn!(
                                "Dropping {}Hz/{}ch frame; recorder is {}Hz/{}ch",
                                frame.sample_rate, frame.channels, sample_rate, channels
                            );
                            continue;
                        }
                        lock(&chunks).push(frame.samples);
                    }
                    RecorderInput::Stop(done) => {
                        capturing = false;
                        let _ = done.send(());
                    }
                }
            }

            debug!("Recorder task finished");
        });

        let feed = RecorderFeed { tx: tx.clone() };
        let recorder = Self {
            tx: Some(tx),
            buffer,
            task: Some(task),
            phase: Phase::Inactive,
            sample_rate,
            channels,
        };

        (recorder, feed)
    }

    /// A recorder with no media behind it; every operation is a no-op
    pub fn detached(sample_rate: u32, channels: u16) -> Self {
        Self {
            tx: None,
            buffer: Arc::new(Mutex::new(AudioChunkBuffer::default())),
            task: None,
            phase: Phase::Inactive,
            sample_rate,
            channels,
        }
    }

    pub fn is_bound(&self) -> bool {
        self.tx.is_some()
    }

    pub fn is_recording(&self) -> bool {
        self.phase == Phase::Recording
    }

    /// Clear the buffer and begin capturing
    pub fn start(&mut self) {
        let Some(tx) = &self.tx else {
            debug!("Recorder start ignored: no media");
            return;
        };

        if tx.send(RecorderInput::Start).is_err() {
            warn!("Recorder start ignored: recorder shut down");
            return;
        }
        self.phase = Phase::Recording;
        info!("Local recording started");
    }

    /// Stop capturing. Resolves once the recorder has observed the stop.
    pub async fn stop(&mut self) {
        if self.phase != Phase::Recording {
            return;
        }
        self.phase = Phase::Stopped;

        let Some(tx) = &self.tx else {
            return;
        };

        let (done_tx, done_rx) = oneshot::channel();
        if tx.send(RecorderInput::Stop(done_tx)).is_err() {
            warn!("Recorder already shut down at stop");
            return;
        }

        if done_rx.await.is_err() {
            warn!("Recorder shut down before stop completed");
        }

        let buffer = lock(&self.buffer);
        info!(
            "Local recording stopped: {} chunks, {} samples",
            buffer.len(),
            buffer.total_samples()
        );
    }

    /// Snapshot of the chunk buffer
    pub fn chunks(&self) -> AudioChunkBuffer {
        lock(&self.buffer).clone()
    }

    /// Concatenate the buffered chunks into one WAV blob
    pub fn to_wav(&self) -> Result<AudioBlob, RecorderError> {
        if self.phase == Phase::Recording {
            return Err(RecorderError::StillRecording);
        }

        let buffer = lock(&self.buffer);
        if buffer.is_empty() {
            return Ok(AudioBlob::empty(self.sample_rate, self.channels));
        }

        let spec = hound::WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
            for sample in buffer.samples() {
                writer.write_sample(sample)?;
            }
            writer.finalize()?;
        }

        Ok(AudioBlob {
            bytes: cursor.into_inner(),
            sample_count: buffer.total_samples(),
            sample_rate: self.sample_rate,
            channels: self.channels,
        })
    }

    /// Stop the recorder task. Buffered audio stays readable.
    pub fn shutdown(&mut self) {
        self.tx = None;
        if self.phase == Phase::Recording {
            self.phase = Phase::Stopped;
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for LocalRecorder {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn lock(buffer: &Mutex<AudioChunkBuffer>) -> MutexGuard<'_, AudioChunkBuffer> {
    buffer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
