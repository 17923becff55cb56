//! Image decoding with signature-based format detection.

use image::{DynamicImage, GenericImageView, ImageFormat, ImageReader};
use std::io::Cursor;
use std::path::Path;

use crate::error::PipelineError;

/// Extensions the registered decoders can read, sorted.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["bmp", "gif", "jpeg", "jpg", "png", "tif", "tiff", "webp"];

/// Check whether a file extension (without dot, any case) is decodable.
pub fn is_supported_extension(ext: &str) -> bool {
    let ext = ext.to_lowercase();
    SUPPORTED_EXTENSIONS.binary_search(&ext.as_str()).is_ok()
}

/// Decodes image containers picked by byte signature.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageDecoder;

/// Result of decoding an image.
#[derive(Debug)]
pub struct DecodedImage {
    /// The decoded image data
    pub image: DynamicImage,
    /// Detected image format
    pub format: ImageFormat,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
}

impl ImageDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Pick a reader for an in-memory file.
    ///
    /// The byte signature decides the decoder; the extension of `path` is
    /// only consulted when no signature matches.
    fn reader<'a>(
        &self,
        bytes: &'a [u8],
        path: &Path,
    ) -> Result<(ImageReader<Cursor<&'a [u8]>>, ImageFormat), PipelineError> {
        let mut reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| PipelineError::Decode {
                path: path.to_path_buf(),
                message: format!("Cannot detect image format: {}", e),
            })?;

        let format = match reader.format() {
            Some(f) => f,
            None => ImageFormat::from_path(path).map_err(|_| PipelineError::UnsupportedFormat {
                path: path.to_path_buf(),
                format: path
                    .extension()
                    .and_then(|e| e.to_str())
                    .unwrap_or("unknown")
                    .to_string(),
            })?,
        };
        reader.set_format(format);
        Ok((reader, format))
    }

    /// Read the image dimensions from the container header without decoding pixels.
    pub fn dimensions(&self, bytes: &[u8], path: &Path) -> Result<(u32, u32), PipelineError> {
        let (reader, _) = self.reader(bytes, path)?;
        reader.into_dimensions().map_err(|e| PipelineError::Decode {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Decode an in-memory file.
    pub fn decode_bytes(&self, bytes: &[u8], path: &Path) -> Result<DecodedImage, PipelineError> {
        let (reader, format) = self.reader(bytes, path)?;
        let image = reader.decode().map_err(|e| PipelineError::Decode {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let (width, height) = image.dimensions();
        Ok(DecodedImage {
            image,
            format,
            width,
            height,
        })
    }
}

/// Convert an ImageFormat to a string representation.
pub fn format_to_string(format: ImageFormat) -> String {
    match format {
        ImageFormat::Jpeg => "jpeg".to_string(),
        ImageFormat::Png => "png".to_string(),
        ImageFormat::WebP => "webp".to_string(),
        ImageFormat::Gif => "gif".to_string(),
        ImageFormat::Tiff => "tiff".to_string(),
        ImageFormat::Bmp => "bmp".to_string(),
        _ => "unknown".to_string(),
    }
}
