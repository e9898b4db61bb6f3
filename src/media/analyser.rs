//! Frequency-domain view of the microphone signal

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use super::backend::AudioFrame;

/// Analysis window in samples (power of 2 for efficiency)
pub const FFT_SIZE: usize = 256;

const MIN_DECIBELS: f32 = -100.0;
const MAX_DECIBELS: f32 = -30.0;
const SMOOTHING: f32 = 0.8;

struct AnalyserState {
    /// Most recent FFT_SIZE mono samples, normalized to [-1, 1]
    window: VecDeque<f32>,
    /// Smoothed magnitude per bin
    smoothed: Vec<f32>,
}

/// Audio-graph source node feeding the level monitor
///
/// Mirrors a web audio analyser: the last `FFT_SIZE` samples are
/// Hann-windowed, transformed, smoothed over time and mapped from
/// [-100 dB, -30 dB] onto bytes.
pub struct AudioAnalyser {
    fft: Arc<dyn Fft<f32>>,
    hann: Vec<f32>,
    state: Mutex<AnalyserState>,
}

impl AudioAnalyser {
    pub fn new() -> Self {
        let fft = FftPlanner::new().plan_fft_forward(FFT_SIZE);

        let hann: Vec<f32> = (0..FFT_SIZE)
            .map(|i| 0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / FFT_SIZE as f32).cos()))
            .collect();

        Self {
            fft,
            hann,
            state: Mutex::new(AnalyserState {
                window: VecDeque::from(vec![0.0; FFT_SIZE]),
                smoothed: vec![0.0; FFT_SIZE / 2],
            }),
        }
    }

    /// Number of frequency bins produced
    pub fn frequency_bin_count(&self) -> usize {
        FFT_SIZE / 2
    }

    /// Feed a captured frame; multichannel input is mixed down to mono
    pub fn push(&self, frame: &AudioFrame) {
        let channels = frame.channels.max(1) as usize;
        let Ok(mut state) = self.state.lock() else {
            return;
        };

        for group in frame.samples.chunks(channels) {
            let sum: f32 = group.iter().map(|&s| s as f32 / i16::MAX as f32).sum();
            state.window.push_back(sum / group.len() as f32);
            if state.window.len() > FFT_SIZE {
                state.window.pop_front();
            }
        }
    }

    /// Fill `out` with byte frequency data (one byte per bin)
    pub fn byte_frequency_data(&self, out: &mut [u8]) {
        let Ok(mut state) = self.state.lock() else {
            out.fill(0);
            return;
        };

        let mut buffer: Vec<Complex<f32>> = state
            .window
            .iter()
            .zip(&self.hann)
            .map(|(&s, &w)| Complex::new(s * w, 0.0))
            .collect();
        self.fft.process(&mut buffer);

        let bins = FFT_SIZE / 2;
        for (i, value) in buffer.iter().take(bins).enumerate() {
            let magnitude = value.norm() / FFT_SIZE as f32;
            state.smoothed[i] = SMOOTHING * state.smoothed[i] + (1.0 - SMOOTHING) * magnitude;
        }

        for (slot, &magnitude) in out.iter_mut().zip(&state.smoothed) {
            *slot = magnitude_to_byte(magnitude);
        }
        if out.len() > bins {
            out[bins..].fill(0);
        }
    }
}

impl Default for AudioAnalyser {
    fn default() -> Self {
        Self::new()
    }
}

fn magnitude_to_byte(magnitude: f32) -> u8 {
    if magnitude <= 0.0 {
        return 0;
    }
    let db = 20.0 * magnitude.log10();
    let scaled = 255.0 * (db - MIN_DECIBELS) / (MAX_DECIBELS - MIN_DECIBELS);
    scaled.clamp(0.0, 255.0) as u8
}
