use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::analyser::AudioAnalyser;

/// Mean of the frequency bytes normalized to [0, 1]
pub fn level_from_frequency_data(data: &[u8]) -> f32 {
    if data.is_empty() {
        return 0.0;
    }
    let sum: u32 = data.iter().map(|&b| b as u32).sum();
    let mean = sum as f32 / data.len() as f32;
    (mean / 255.0).clamp(0.0, 1.0)
}

/// Cooperative polling loop publishing the microphone level
///
/// Runs until cancelled; it has no termination condition of its own.
pub struct AudioLevelMonitor {
    running: Arc<AtomicBool>,
    level_rx: watch::Receiver<f32>,
    handle: Option<JoinHandle<()>>,
}

impl AudioLevelMonitor {
    /// Start polling `analyser` once per `tick`
    pub fn spawn(analyser: Arc<AudioAnalyser>, tick: Duration) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let (level_tx, level_rx) = watch::channel(0.0f32);

        let is_running = Arc::clone(&running);
        let handle = tokio::spawn(async move {
            debug!("Audio level monitor started");
            let mut interval = tokio::time::interval(tick);
            let mut data = vec![0u8; analyser.frequency_bin_count()];

            loop {
                interval.tick().await;
                if !is_running.load(Ordering::SeqCst) {
                    break;
                }

                analyser.byte_frequency_data(&mut data);
                level_tx.send_replace(level_from_frequency_data(&data));
            }

            debug!("Audio level monitor stopped");
        });

        Self {
            running,
            level_rx,
            handle: Some(handle),
        }
    }

    /// Latest published level
    pub fn level(&self) -> f32 {
        *self.level_rx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<f32> {
        self.level_rx.clone()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Cancel the pending tick. Safe to call more than once.
    pub fn cancel(&mut self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
        info!("Audio level monitor cancelled");
    }
}

impl Drop for AudioLevelMonitor {
    fn drop(&mut self) {
        self.cancel();
    }
}
