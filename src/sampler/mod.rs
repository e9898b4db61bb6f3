//! Fixed-rate video frame sampling over the feedback channel

mod encoder;
mod throttle;

pub use encoder::FrameEncoder;
pub use throttle::FrameThrottle;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::feedback::{ChannelState, FeedbackChannel, OutboundMessage};
use crate::media::VideoSource;

#[derive(Debug, Clone)]
pub struct SamplerConfig {
    /// Frames sent per second
    pub target_fps: u32,
    /// Callback rate driving the sampler (display refresh)
    pub tick_hz: u32,
    pub jpeg_quality: u8,
    pub default_width: u32,
    pub default_height: u32,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            target_fps: 10,
            tick_hz: 60,
            jpeg_quality: 50,
            default_width: 640,
            default_height: 480,
        }
    }
}

impl SamplerConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_secs(1) / self.tick_hz.max(1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleOutcome {
    /// Session inactive or channel not open; sampling ends
    Stopped,
    /// Not due yet, or no frame available
    Skipped,
    Sent,
}

/// Pushes downsampled frames to the feedback channel while a session is live
pub struct FrameSampler {
    throttle: FrameThrottle,
    encoder: FrameEncoder,
    video: Option<Arc<dyn VideoSource>>,
    channel: Arc<dyn FeedbackChannel>,
    active: Arc<AtomicBool>,
    frames_sent: u64,
}

impl FrameSampler {
    pub fn new(
        config: &SamplerConfig,
        video: Option<Arc<dyn VideoSource>>,
        channel: Arc<dyn FeedbackChannel>,
        active: Arc<AtomicBool>,
    ) -> Self {
        Self {
            throttle: FrameThrottle::from_fps(config.target_fps),
            encoder: FrameEncoder::new(
                config.jpeg_quality,
                config.default_width,
                config.default_height,
            ),
            video,
            channel,
            active,
            frames_sent: 0,
        }
    }

    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }

    /// One display callback, `delta` after the previous one
    pub fn on_tick(&mut self, delta: Duration) -> SampleOutcome {
        // Checked first so an in-flight callback never emits after stop
        if !self.active.load(Ordering::SeqCst) || self.channel.state() != ChannelState::Open {
            return SampleOutcome::Stopped;
        }

        if !self.throttle.tick(delta) {
            return SampleOutcome::Skipped;
        }

        let Some(video) = &self.video else {
            return SampleOutcome::Skipped;
        };

        let frame = match self.encoder.encode(video.as_ref()) {
            Ok(Some(frame)) => frame,
            Ok(None) => return SampleOutcome::Skipped,
            Err(e) => {
                warn!("Failed to encode video frame: {}", e);
                return SampleOutcome::Skipped;
            }
        };

        // Encoding is synchronous; the session may have stopped meanwhile
        if !self.active.load(Ordering::SeqCst) {
            return SampleOutcome::Stopped;
        }

        match self.channel.send(OutboundMessage::Video { frame }) {
            Ok(()) => {
                self.frames_sent += 1;
                SampleOutcome::Sent
            }
            Err(e) => {
                debug!("Frame not sent: {}", e);
                SampleOutcome::Stopped
            }
        }
    }

    /// Drive `on_tick` every `tick` until the sampler reports `Stopped`
    pub fn spawn(mut self, tick: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!("Frame sampler started");
            let mut interval = tokio::time::interval(tick);
            let mut last = Instant::now();

            loop {
                interval.tick().await;
                let now = Instant::now();
                let delta = now.duration_since(last);
                last = now;

                if self.on_tick(delta) == SampleOutcome::Stopped {
                    break;
                }
            }

            info!("Frame sampler stopped after {} frames", self.frames_sent);
        })
    }
}
