use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::config::SessionConfig;
use super::state::{SessionState, SessionStatus};
use crate::analysis::{
    MissingSummary, ResultStore, SessionResult, SpeechAnalyzer, SummaryOutcome,
};
use crate::error::CaptureError;
use crate::feedback::{ChannelState, FeedbackChannel, LiveFeedbackState};
use crate::media::{AcquiredMedia, AudioLevelMonitor, MediaAcquirer, MediaDevice};
use crate::recording::{AudioBlob, LocalRecorder};
use crate::sampler::FrameSampler;

/// Every resource owned for the lifetime of the page
#[derive(Default)]
struct Resources {
    media: Option<AcquiredMedia>,
    level_monitor: Option<AudioLevelMonitor>,
    timer: Option<JoinHandle<()>>,
    sampler: Option<JoinHandle<()>>,
    live_reducer: Option<JoinHandle<()>>,
}

/// Audio and summary kept after a failed upload so it can be retried
struct PendingUpload {
    elapsed_seconds: u64,
    summary: SummaryOutcome,
    audio: AudioBlob,
}

/// Drives one practice session: Idle -> Recording -> Finalizing -> Done | Error
///
/// Owns the media, timer, sampler and feedback channel. `teardown()` may be
/// called from any state, any number of times; resources are released once.
pub struct SessionController {
    config: SessionConfig,
    channel: Arc<dyn FeedbackChannel>,
    analyzer: Arc<dyn SpeechAnalyzer>,
    store: ResultStore,

    state_tx: watch::Sender<SessionState>,
    live_tx: Arc<watch::Sender<LiveFeedbackState>>,
    teardown_tx: watch::Sender<bool>,

    /// Session active; checked at the head of the sampler and reducer loops
    recording: Arc<AtomicBool>,
    elapsed: Arc<AtomicU64>,
    muted: AtomicBool,
    media_available: bool,
    released: AtomicBool,

    started_at: Mutex<Option<DateTime<Utc>>>,
    resources: Mutex<Resources>,
    recorder: tokio::sync::Mutex<LocalRecorder>,
    pending_upload: tokio::sync::Mutex<Option<PendingUpload>>,
    result: Mutex<Option<SessionResult>>,
}

impl SessionController {
    /// Acquire media and wire feedback. Acquisition failure leaves the
    /// controller in a degraded mode (no video, no live feedback).
    pub async fn mount(
        config: SessionConfig,
        device: &mut dyn MediaDevice,
        channel: Arc<dyn FeedbackChannel>,
        analyzer: Arc<dyn SpeechAnalyzer>,
        store: ResultStore,
    ) -> Self {
        info!("Mounting session {}", config.session_id);

        let audio = &config.constraints.audio;
        let (media, recorder) = match MediaAcquirer::acquire(device, &config.constraints).await {
            Ok(mut media) => {
                let recorder = media
                    .take_recorder()
                    .unwrap_or_else(|| LocalRecorder::detached(audio.sample_rate, audio.channels));
                (Some(media), recorder)
            }
            Err(e) => {
                warn!("Continuing without media; video and feedback disabled: {}", e);
                (None, LocalRecorder::detached(audio.sample_rate, audio.channels))
            }
        };

        let (state_tx, _) = watch::channel(SessionState::Idle);
        let (live_tx, _) = watch::channel(LiveFeedbackState::default());
        let live_tx = Arc::new(live_tx);
        let (teardown_tx, _) = watch::channel(false);
        let recording = Arc::new(AtomicBool::new(false));

        let mut resources = Resources::default();
        let media_available = media.is_some();

        if let Some(media) = &media {
            resources.level_monitor = Some(AudioLevelMonitor::spawn(
                Arc::clone(&media.analyser),
                config.level_tick,
            ));
            resources.live_reducer = Some(spawn_live_reducer(
                channel.as_ref(),
                Arc::clone(&live_tx),
                Arc::clone(&recording),
            ));
        }
        resources.media = media;

        Self {
            config,
            channel,
            analyzer,
            store,
            state_tx,
            live_tx,
            teardown_tx,
            recording,
            elapsed: Arc::new(AtomicU64::new(0)),
            muted: AtomicBool::new(false),
            media_available,
            released: AtomicBool::new(false),
            started_at: Mutex::new(None),
            resources: Mutex::new(resources),
            recorder: tokio::sync::Mutex::new(recorder),
            pending_upload: tokio::sync::Mutex::new(None),
            result: Mutex::new(None),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.config.session_id
    }

    pub fn state(&self) -> SessionState {
        self.state_tx.borrow().clone()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed.load(Ordering::SeqCst)
    }

    pub fn live_feedback(&self) -> LiveFeedbackState {
        self.live_tx.borrow().clone()
    }

    pub fn subscribe_live_feedback(&self) -> watch::Receiver<LiveFeedbackState> {
        self.live_tx.subscribe()
    }

    pub fn audio_level(&self) -> f32 {
        lock(&self.resources)
            .level_monitor
            .as_ref()
            .map(AudioLevelMonitor::level)
            .unwrap_or(0.0)
    }

    pub fn media_available(&self) -> bool {
        self.media_available
    }

    pub fn is_muted(&self) -> bool {
        self.muted.load(Ordering::SeqCst)
    }

    pub fn set_muted(&self, muted: bool) {
        self.muted.store(muted, Ordering::SeqCst);
        if let Some(media) = &lock(&self.resources).media {
            media.set_muted(muted);
        }
        info!("Microphone {}", if muted { "muted" } else { "unmuted" });
    }

    /// Live tracks still holding hardware
    pub fn live_track_count(&self) -> usize {
        lock(&self.resources)
            .media
            .as_ref()
            .map(|media| media.tracks.live_count())
            .unwrap_or(0)
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    pub fn is_torn_down(&self) -> bool {
        *self.teardown_tx.borrow()
    }

    /// Whether the recorder task is still attached to the audio graph
    pub async fn recorder_bound(&self) -> bool {
        self.recorder.lock().await.is_bound()
    }

    /// The merged result once the session is done
    pub fn result(&self) -> Option<SessionResult> {
        lock(&self.result).clone()
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            session_id: self.config.session_id.clone(),
            state: self.state(),
            current_question: self.config.question.clone(),
            started_at: *lock(&self.started_at),
            elapsed_seconds: self.elapsed_seconds(),
            is_muted: self.is_muted(),
            media_available: self.media_available,
            audio_level: self.audio_level(),
            live_feedback: self.live_feedback(),
        }
    }

    /// Idle -> Recording
    pub async fn start(&self) -> Result<(), CaptureError> {
        let mut recorder = self.recorder.lock().await;
        let mut resources = lock(&self.resources);

        // Claimed under the resources lock so a concurrent stop or teardown
        // sees either no session or a fully started one
        if self.is_released() {
            return Err(CaptureError::InvalidState {
                action: "start",
                state: self.state().to_string(),
            });
        }
        self.transition("start", SessionState::Idle, SessionState::Recording)?;

        info!("Starting session {}", self.config.session_id);

        recorder.start();
        self.elapsed.store(0, Ordering::SeqCst);
        *lock(&self.started_at) = Some(Utc::now());
        self.recording.store(true, Ordering::SeqCst);

        let timer = spawn_timer(
            self.config.timer_interval,
            Arc::clone(&self.elapsed),
            Arc::clone(&self.recording),
        );
        let video = resources.media.as_ref().and_then(|media| media.video.clone());
        let sampler = FrameSampler::new(
            &self.config.sampler,
            video,
            Arc::clone(&self.channel),
            Arc::clone(&self.recording),
        );
        abort(resources.sampler.replace(sampler.spawn(self.config.sampler.tick())));
        abort(resources.timer.replace(timer));

        Ok(())
    }

    /// Recording -> Finalizing -> Done | Error
    ///
    /// Waits for the session summary and the recorder concurrently, then
    /// uploads the audio once and persists the merged result.
    pub async fn stop(&self) -> Result<SessionResult, CaptureError> {
        {
            let mut resources = lock(&self.resources);
            self.transition("stop", SessionState::Recording, SessionState::Finalizing)?;

            info!("Stopping session {}", self.config.session_id);
            self.recording.store(false, Ordering::SeqCst);
            abort(resources.timer.take());
            abort(resources.sampler.take());
        }
        let elapsed_seconds = self.elapsed_seconds();

        let finalize = async {
            tokio::join!(self.await_summary(), async {
                let mut recorder = self.recorder.lock().await;
                recorder.stop().await;
                recorder.to_wav()
            })
        };

        // Teardown wins over a finalize that completes in the same poll
        let finalized = tokio::select! {
            biased;
            _ = self.torn_down() => None,
            pair = finalize => Some(pair),
        };
        let Some((summary, audio)) = finalized else {
            // Teardown could not reach the recorder while finalize held it
            self.recorder.lock().await.shutdown();
            return Err(CaptureError::Cancelled);
        };

        let audio = match audio {
            Ok(audio) => audio,
            Err(e) => return self.fail(e.into(), false),
        };
        if audio.is_empty() {
            return self.fail(CaptureError::EmptyRecording, false);
        }

        self.upload_and_finish(elapsed_seconds, summary, audio).await
    }

    /// Error -> Finalizing -> Done | Error, reusing the kept recording
    pub async fn retry_upload(&self) -> Result<SessionResult, CaptureError> {
        let pending = self.pending_upload.lock().await.take();
        let Some(pending) = pending else {
            return Err(CaptureError::InvalidState {
                action: "retry upload",
                state: self.state().to_string(),
            });
        };
        if self.is_torn_down() {
            return Err(CaptureError::Cancelled);
        }

        info!("Retrying upload for session {}", self.config.session_id);
        self.set_state(SessionState::Finalizing);
        self.upload_and_finish(pending.elapsed_seconds, pending.summary, pending.audio)
            .await
    }

    /// Release everything from any state. Safe to call repeatedly and
    /// while a `stop()` is still pending; the pending call is cancelled.
    pub fn teardown(&self) {
        if !self.teardown_tx.send_replace(true) {
            info!("Tearing down session {}", self.config.session_id);
        }
        self.release_resources();
    }

    async fn await_summary(&self) -> SummaryOutcome {
        if self.channel.state() != ChannelState::Open {
            warn!("Feedback channel not open; finishing without video metrics");
            return SummaryOutcome::Missing(MissingSummary::NotConnected);
        }

        let summary_rx = match self.channel.end_session() {
            Ok(rx) => rx,
            Err(e) => {
                warn!("Could not request session summary: {}", e);
                return SummaryOutcome::Missing(MissingSummary::NotConnected);
            }
        };

        match tokio::time::timeout(self.config.finalize_timeout, summary_rx).await {
            Ok(Ok(metrics)) => SummaryOutcome::Received(metrics),
            Ok(Err(_)) => {
                warn!("Feedback channel closed while awaiting session summary");
                SummaryOutcome::Missing(MissingSummary::ChannelClosed)
            }
            Err(_) => {
                warn!(
                    "No session summary within {:?}; finishing without video metrics",
                    self.config.finalize_timeout
                );
                SummaryOutcome::Missing(MissingSummary::TimedOut)
            }
        }
    }

    async fn upload_and_finish(
        &self,
        elapsed_seconds: u64,
        summary: SummaryOutcome,
        audio: AudioBlob,
    ) -> Result<SessionResult, CaptureError> {
        let analysis = tokio::select! {
            biased;
            _ = self.torn_down() => return Err(CaptureError::Cancelled),
            analysis = self.analyzer.analyze(audio.clone()) => analysis,
        };

        let speech = match analysis {
            Ok(speech) => speech,
            Err(e) => {
                *self.pending_upload.lock().await = Some(PendingUpload {
                    elapsed_seconds,
                    summary,
                    audio,
                });
                return self.fail(e.into(), true);
            }
        };

        let result = SessionResult::merge(
            self.config.session_id.clone(),
            elapsed_seconds,
            Utc::now(),
            speech,
            summary,
        );

        if self.is_torn_down() {
            return Err(CaptureError::Cancelled);
        }
        if let Err(e) = self.store.save(&result) {
            return self.fail(CaptureError::Persist(format!("{:#}", e)), false);
        }

        *lock(&self.result) = Some(result.clone());
        self.release_resources();
        self.set_state(SessionState::Done);

        info!(
            "Session {} done ({:.2} min)",
            self.config.session_id,
            result.duration_minutes()
        );

        Ok(result)
    }

    fn fail(&self, error: CaptureError, retryable: bool) -> Result<SessionResult, CaptureError> {
        error!("Session {} failed: {}", self.config.session_id, error);
        self.release_resources();
        if !self.is_torn_down() {
            self.set_state(SessionState::Error {
                message: error.to_string(),
                retryable,
            });
        }
        Err(error)
    }

    /// Resolves once `teardown()` has been called
    async fn torn_down(&self) {
        let mut rx = self.teardown_tx.subscribe();
        // The sender lives in self, so this only fails if self is gone
        let _ = rx.wait_for(|down| *down).await;
    }

    fn release_resources(&self) {
        if self.released.swap(true, Ordering::SeqCst) {
            return;
        }
        self.recording.store(false, Ordering::SeqCst);

        {
            let mut resources = lock(&self.resources);
            abort(resources.timer.take());
            abort(resources.sampler.take());
            abort(resources.live_reducer.take());
            if let Some(mut monitor) = resources.level_monitor.take() {
                monitor.cancel();
            }
            if let Some(media) = resources.media.as_mut() {
                media.release();
            }
        }

        // A pending stop() holds the recorder and shuts it down on cancel
        if let Ok(mut recorder) = self.recorder.try_lock() {
            recorder.shutdown();
        }

        self.channel.close();
        info!("Session {} resources released", self.config.session_id);
    }

    /// Move `from` -> `to` in one step, or fail with the state actually seen
    fn transition(
        &self,
        action: &'static str,
        from: SessionState,
        to: SessionState,
    ) -> Result<(), CaptureError> {
        let mut seen = None;
        let moved = self.state_tx.send_if_modified(|state| {
            if *state == from {
                *state = to.clone();
                true
            } else {
                seen = Some(state.to_string());
                false
            }
        });

        if !moved {
            return Err(CaptureError::InvalidState {
                action,
                state: seen.unwrap_or_default(),
            });
        }
        info!("Session {} -> {}", self.config.session_id, to);
        Ok(())
    }

    fn set_state(&self, state: SessionState) {
        info!("Session {} -> {}", self.config.session_id, state);
        self.state_tx.send_replace(state);
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn spawn_timer(
    interval: Duration,
    elapsed: Arc<AtomicU64>,
    recording: Arc<AtomicBool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // First tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            if !recording.load(Ordering::SeqCst) {
                break;
            }
            elapsed.fetch_add(1, Ordering::SeqCst);
        }
    })
}

fn spawn_live_reducer(
    channel: &dyn FeedbackChannel,
    live_tx: Arc<watch::Sender<LiveFeedbackState>>,
    recording: Arc<AtomicBool>,
) -> JoinHandle<()> {
    let mut live_rx = channel.subscribe_live();
    tokio::spawn(async move {
        loop {
            match live_rx.recv().await {
                Ok(feedback) => {
                    if recording.load(Ordering::SeqCst) {
                        live_tx.send_modify(|state| state.apply(&feedback));
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Live feedback reducer skipped {} messages", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

fn abort(handle: Option<JoinHandle<()>>) {
    if let Some(handle) = handle {
        handle.abort();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
