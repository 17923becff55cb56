//! Encoder boundary.
//!
//! The perceptual encoder is an opaque collaborator: it receives a native
//! pixel buffer and a quality and returns JPEG bytes or a failure. The
//! baseline backend here wraps the `image` crate's JPEG encoder so the tool
//! works without a native perceptual encoder linked in.

use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;

use crate::error::EncoderFailure;
use crate::normalize::{NativeBuffer, PixelLayout};
use crate::quality::Quality;

/// Something that turns native pixel buffers into JPEG bytes.
pub trait Encoder: Send + Sync {
    /// Encode a buffer. Failures are surfaced as-is and never retried.
    fn encode(&self, buffer: &NativeBuffer<'_>, quality: Quality) -> Result<Vec<u8>, EncoderFailure>;

    /// Short backend name for logs.
    fn name(&self) -> &'static str;
}

/// Baseline JPEG backend built on `image::codecs::jpeg`.
///
/// Alpha is ignored, matching the native RGBA entry point. Qualities above
/// 100 saturate at the backend maximum.
#[derive(Debug, Clone, Copy, Default)]
pub struct BaselineJpegEncoder;

impl BaselineJpegEncoder {
    const MAX_BACKEND_QUALITY: u8 = 100;

    fn backend_quality(quality: Quality) -> u8 {
        quality.get().min(Self::MAX_BACKEND_QUALITY)
    }

    /// Whether `quality` is above what the backend can express.
    pub fn saturates(quality: Quality) -> bool {
        quality.get() > Self::MAX_BACKEND_QUALITY
    }
}

impl Encoder for BaselineJpegEncoder {
    fn encode(&self, buffer: &NativeBuffer<'_>, quality: Quality) -> Result<Vec<u8>, EncoderFailure> {
        if buffer.width() == 0 || buffer.height() == 0 {
            return Err(EncoderFailure(format!(
                "cannot encode empty image ({}x{})",
                buffer.width(),
                buffer.height()
            )));
        }

        if Self::saturates(quality) {
            tracing::debug!(
                "Quality {} above baseline maximum, encoding at {}",
                quality,
                Self::MAX_BACKEND_QUALITY
            );
        }

        let (packed, color) = pack_rows(buffer);
        let mut out = Vec::new();
        JpegEncoder::new_with_quality(&mut out, Self::backend_quality(quality))
            .encode(&packed, buffer.width(), buffer.height(), color)
            .map_err(|e| EncoderFailure(e.to_string()))?;
        Ok(out)
    }

    fn name(&self) -> &'static str {
        "baseline-jpeg"
    }
}

/// Strip row padding and alpha into a tightly packed L8 or RGB8 buffer.
fn pack_rows(buffer: &NativeBuffer<'_>) -> (Vec<u8>, ExtendedColorType) {
    let pixel_count = buffer.width() as usize * buffer.height() as usize;
    match buffer.layout() {
        PixelLayout::Gray8 => (buffer.rows().flatten().copied().collect(), ExtendedColorType::L8),
        PixelLayout::Rgb8 => {
            let mut packed = Vec::with_capacity(pixel_count * 3);
            for row in buffer.rows() {
                packed.extend_from_slice(row);
            }
            (packed, ExtendedColorType::Rgb8)
        }
        PixelLayout::Rgba8 => {
            let mut packed = Vec::with_capacity(pixel_count * 3);
            for row in buffer.rows() {
                for px in row.chunks_exact(4) {
                    packed.extend_from_slice(&px[..3]);
                }
            }
            (packed, ExtendedColorType::Rgb8)
        }
    }
}
