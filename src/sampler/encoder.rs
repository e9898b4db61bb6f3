use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{ExtendedColorType, ImageResult};

use crate::media::VideoSource;

/// Off-screen canvas turning the current video frame into a JPEG data URL
#[derive(Debug, Clone)]
pub struct FrameEncoder {
    /// JPEG quality, 1-100
    quality: u8,
    default_width: u32,
    default_height: u32,
}

impl FrameEncoder {
    pub fn new(quality: u8, default_width: u32, default_height: u32) -> Self {
        Self {
            quality: quality.clamp(1, 100),
            default_width: default_width.max(1),
            default_height: default_height.max(1),
        }
    }

    /// Canvas size: the video's native size, or the default until known
    pub fn canvas_size(&self, video: &dyn VideoSource) -> (u32, u32) {
        video
            .dimensions()
            .filter(|&(w, h)| w > 0 && h > 0)
            .unwrap_or((self.default_width, self.default_height))
    }

    /// Encode the current frame; `None` when the video has no frame yet
    pub fn encode(&self, video: &dyn VideoSource) -> ImageResult<Option<String>> {
        let Some(frame) = video.snapshot() else {
            return Ok(None);
        };

        let (width, height) = self.canvas_size(video);
        let canvas = if frame.dimensions() == (width, height) {
            frame
        } else {
            imageops::resize(&frame, width, height, FilterType::Triangle)
        };

        let mut jpeg = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg, self.quality).encode(
            canvas.as_raw(),
            width,
            height,
            ExtendedColorType::Rgb8,
        )?;

        let encoded = base64::engine::general_purpose::STANDARD.encode(&jpeg);
        Ok(Some(format!("data:image/jpeg;base64,{}", encoded)))
    }
}

impl Default for FrameEncoder {
    fn default() -> Self {
        Self::new(50, 640, 480)
    }
}
