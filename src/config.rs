use anyhow::Result;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::media::{AudioConstraints, MediaConstraints};
use crate::sampler::SamplerConfig;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub backend: BackendConfig,
    pub audio: AudioConfig,
    pub video: VideoConfig,
    pub session: SessionSettings,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "interview-capture".to_string(),
            http: HttpConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 8765,
        }
    }
}

/// Remote analysis service endpoints
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub ws_url: String,
    pub http_base: String,
    pub analysis_path: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            ws_url: "ws://localhost:8000/api/ws/video".to_string(),
            http_base: "http://localhost:8000".to_string(),
            analysis_path: "/analysis/speech".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub channels: u16,
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    pub auto_gain_control: bool,
}

impl Default for AudioConfig {
    fn default() -> Self {
        let constraints = AudioConstraints::default();
        Self {
            sample_rate: constraints.sample_rate,
            channels: constraints.channels,
            echo_cancellation: constraints.echo_cancellation,
            noise_suppression: constraints.noise_suppression,
            auto_gain_control: constraints.auto_gain_control,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    pub target_fps: u32,
    /// Display refresh rate driving the sampling loop
    pub tick_hz: u32,
    pub jpeg_quality: u8,
    pub default_width: u32,
    pub default_height: u32,
}

impl Default for VideoConfig {
    fn default() -> Self {
        let sampler = SamplerConfig::default();
        Self {
            target_fps: sampler.target_fps,
            tick_hz: sampler.tick_hz,
            jpeg_quality: sampler.jpeg_quality,
            default_width: sampler.default_width,
            default_height: sampler.default_height,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub finalize_timeout_secs: u64,
    pub results_dir: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            finalize_timeout_secs: 30,
            results_dir: ".".to_string(),
        }
    }
}

impl Config {
    /// Load from a TOML file; a missing file yields the defaults.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn media_constraints(&self) -> MediaConstraints {
        MediaConstraints {
            audio: AudioConstraints {
                echo_cancellation: self.audio.echo_cancellation,
                noise_suppression: self.audio.noise_suppression,
                auto_gain_control: self.audio.auto_gain_control,
                sample_rate: self.audio.sample_rate,
                channels: self.audio.channels,
            },
            video: true,
        }
    }

    pub fn sampler_config(&self) -> SamplerConfig {
        SamplerConfig {
            target_fps: self.video.target_fps,
            tick_hz: self.video.tick_hz,
            jpeg_quality: self.video.jpeg_quality,
            default_width: self.video.default_width,
            default_height: self.video.default_height,
        }
    }

    pub fn finalize_timeout(&self) -> Duration {
        Duration::from_secs(self.session.finalize_timeout_secs)
    }

    pub fn results_dir(&self) -> PathBuf {
        PathBuf::from(&self.session.results_dir)
    }
}
