// Test doubles shared by the integration tests

#![allow(dead_code)]

use image::{Rgb, RgbImage};
use interview_capture::analysis::{SpeechAnalyzer, SpeechMetrics};
use interview_capture::error::{MediaAccessError, SocketError, UploadError};
use interview_capture::feedback::{
    ChannelCore, ChannelState, FeedbackChannel, LiveFeedback, OutboundMessage, VideoMetrics,
};
use interview_capture::media::{
    AudioFrame, MediaConstraints, MediaDevice, MediaStream, MediaTrack, TrackKind, TrackSet,
    VideoSource,
};
use interview_capture::recording::AudioBlob;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, mpsc, oneshot};

// ============================================================================
// Media
// ============================================================================

pub struct FakeTrack {
    kind: TrackKind,
    live: Arc<AtomicBool>,
    stops: Arc<AtomicUsize>,
}

impl MediaTrack for FakeTrack {
    fn kind(&self) -> TrackKind {
        self.kind
    }

    fn stop(&mut self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.live.store(false, Ordering::SeqCst);
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }
}

/// Small solid-colour camera
pub struct FakeVideo {
    pub width: u32,
    pub height: u32,
}

impl VideoSource for FakeVideo {
    fn dimensions(&self) -> Option<(u32, u32)> {
        Some((self.width, self.height))
    }

    fn snapshot(&self) -> Option<RgbImage> {
        Some(RgbImage::from_pixel(self.width, self.height, Rgb([90, 120, 150])))
    }
}

/// Device handing out one stream; the test keeps the microphone sender
pub struct FakeDevice {
    deny: bool,
    audio_tx: Option<mpsc::Sender<AudioFrame>>,
    audio_rx: Option<mpsc::Receiver<AudioFrame>>,
    pub live: Vec<Arc<AtomicBool>>,
    pub stops: Arc<AtomicUsize>,
}

impl FakeDevice {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel(1024);
        Self {
            deny: false,
            audio_tx: Some(tx),
            audio_rx: Some(rx),
            live: Vec::new(),
            stops: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn denied() -> Self {
        Self {
            deny: true,
            ..Self::new()
        }
    }

    /// Microphone side of the stream
    pub fn microphone(&mut self) -> mpsc::Sender<AudioFrame> {
        self.audio_tx
            .clone()
            .expect("microphone sender available")
    }

    pub fn live_tracks(&self) -> usize {
        self.live.iter().filter(|l| l.load(Ordering::SeqCst)).count()
    }

    pub fn stop_calls(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl MediaDevice for FakeDevice {
    async fn open(
        &mut self,
        constraints: &MediaConstraints,
    ) -> Result<MediaStream, MediaAccessError> {
        if self.deny {
            return Err(MediaAccessError::PermissionDenied);
        }
        let audio_rx = self
            .audio_rx
            .take()
            .ok_or_else(|| MediaAccessError::Device("stream already opened".to_string()))?;

        let mut tracks = TrackSet::default();
        let mut kinds = vec![TrackKind::Audio];
        if constraints.video {
            kinds.push(TrackKind::Video);
        }
        for kind in kinds {
            let live = Arc::new(AtomicBool::new(true));
            self.live.push(Arc::clone(&live));
            tracks.push(Box::new(FakeTrack {
                kind,
                live,
                stops: Arc::clone(&self.stops),
            }));
        }

        let video: Option<Arc<dyn VideoSource>> = if constraints.video {
            Some(Arc::new(FakeVideo {
                width: 16,
                height: 12,
            }))
        } else {
            None
        };

        Ok(MediaStream {
            audio_rx,
            video,
            tracks,
        })
    }

    fn name(&self) -> &str {
        "fake"
    }
}

pub fn speech_frame(timestamp_ms: u64) -> AudioFrame {
    // 100ms of a 440Hz tone at 16kHz
    let samples = (0..1600)
        .map(|i| {
            let t = (timestamp_ms as f32 / 1000.0) + i as f32 / 16000.0;
            ((2.0 * std::f32::consts::PI * 440.0 * t).sin() * 8000.0) as i16
        })
        .collect();
    AudioFrame {
        samples,
        sample_rate: 16000,
        channels: 1,
        timestamp_ms,
    }
}

// ============================================================================
// Feedback channel
// ============================================================================

/// In-memory feedback channel recording what was sent
pub struct ScriptedChannel {
    pub core: ChannelCore,
    sent: Mutex<Vec<OutboundMessage>>,
    close_calls: AtomicUsize,
    /// Summary delivered as soon as end_session is sent
    reply: Option<VideoMetrics>,
}

impl ScriptedChannel {
    pub fn open() -> Self {
        Self::with_state(ChannelState::Open)
    }

    pub fn with_state(state: ChannelState) -> Self {
        Self {
            core: ChannelCore::new(state),
            sent: Mutex::new(Vec::new()),
            close_calls: AtomicUsize::new(0),
            reply: None,
        }
    }

    pub fn replying_with(mut self, metrics: VideoMetrics) -> Self {
        self.reply = Some(metrics);
        self
    }

    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn frames_sent(&self) -> usize {
        self.sent()
            .iter()
            .filter(|m| matches!(m, OutboundMessage::Video { .. }))
            .count()
    }

    pub fn end_session_sent(&self) -> bool {
        self.sent().contains(&OutboundMessage::EndSession)
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    /// Simulate an inbound text frame
    pub fn deliver(&self, text: &str) {
        self.core.dispatch(text);
    }

    pub fn deliver_feedback(&self, attention: &str, sentiment: Option<&str>) {
        let feedback = LiveFeedback {
            attention_status: attention.to_string(),
            sentiment: sentiment.map(str::to_string),
            posture: None,
        };
        let json = serde_json::json!({ "type": "video_feedback", "feedback": feedback });
        self.deliver(&json.to_string());
    }

    /// The server dropped the connection
    pub fn drop_connection(&self) {
        self.core.mark_closed();
    }
}

impl FeedbackChannel for ScriptedChannel {
    fn state(&self) -> ChannelState {
        self.core.state()
    }

    fn send(&self, message: OutboundMessage) -> Result<(), SocketError> {
        if self.core.state() != ChannelState::Open {
            return Err(SocketError::NotOpen);
        }
        self.sent.lock().unwrap().push(message);
        Ok(())
    }

    fn subscribe_live(&self) -> broadcast::Receiver<LiveFeedback> {
        self.core.subscribe_live()
    }

    fn end_session(&self) -> Result<oneshot::Receiver<VideoMetrics>, SocketError> {
        if self.core.state() != ChannelState::Open {
            return Err(SocketError::NotOpen);
        }
        let rx = self.core.install_summary_listener()?;
        self.send(OutboundMessage::EndSession)?;

        if let Some(metrics) = self.reply {
            let json = serde_json::json!({
                "type": "session_summary",
                "data": { "video_metrics": metrics },
            });
            self.core.dispatch(&json.to_string());
        }
        Ok(rx)
    }

    fn close(&self) {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        if self.core.begin_close() {
            self.core.mark_closed();
        }
    }
}

// ============================================================================
// Speech analysis
// ============================================================================

pub fn speech_metrics(wpm: f64, fillers: u32, intelligibility: f64) -> SpeechMetrics {
    SpeechMetrics {
        words_per_minute: wpm,
        filler_word_count: fillers,
        speech_intelligibility: intelligibility,
        raw_transcript: "tell me about yourself".to_string(),
        extra: serde_json::Map::new(),
    }
}

/// Analyzer answering from a queue; an empty queue stalls forever
pub struct FakeAnalyzer {
    responses: Mutex<VecDeque<Result<SpeechMetrics, UploadError>>>,
    calls: AtomicUsize,
    last_sample_count: AtomicUsize,
}

impl FakeAnalyzer {
    pub fn new(responses: Vec<Result<SpeechMetrics, UploadError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: AtomicUsize::new(0),
            last_sample_count: AtomicUsize::new(0),
        }
    }

    pub fn returning(metrics: SpeechMetrics) -> Self {
        Self::new(vec![Ok(metrics)])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_sample_count(&self) -> usize {
        self.last_sample_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl SpeechAnalyzer for FakeAnalyzer {
    async fn analyze(&self, audio: AudioBlob) -> Result<SpeechMetrics, UploadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.last_sample_count
            .store(audio.sample_count, Ordering::SeqCst);

        let next = self.responses.lock().unwrap().pop_front();
        match next {
            Some(response) => response,
            None => std::future::pending().await,
        }
    }
}
