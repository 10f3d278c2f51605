//! Re-encode oversize or WEBP images to JPEG before upload.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;

use super::naming::{guess_ext_and_type, is_webp, sniff_ext_and_type};
use crate::error::{PipelineError, PipelineResult};
use crate::types::NormalizedImage;

/// Prepares bytes for an upload host with a size ceiling.
#[derive(Debug, Clone, Copy)]
pub struct Normalizer {
    max_bytes: u64,
    jpeg_quality: u8,
}

impl Normalizer {
    pub fn new(max_bytes: u64, jpeg_quality: u8) -> Self {
        Self {
            max_bytes,
            jpeg_quality: jpeg_quality.clamp(1, 100),
        }
    }

    /// Build from a ceiling in megabytes.
    pub fn with_max_mb(max_mb: u64, jpeg_quality: u8) -> Self {
        Self::new(max_mb * 1024 * 1024, jpeg_quality)
    }

    /// Whether these bytes should be re-encoded.
    pub fn needs_reencode(&self, len: usize, content_type: Option<&str>) -> bool {
        len as u64 > self.max_bytes || is_webp(content_type)
    }

    /// Re-encode to JPEG when oversize or WEBP, otherwise pass through.
    ///
    /// Decode or encode failures also pass the original bytes through; the
    /// upload host gets the final say.
    pub fn normalize(
        &self,
        bytes: Vec<u8>,
        content_type: Option<&str>,
        url: &str,
    ) -> NormalizedImage {
        if self.needs_reencode(bytes.len(), content_type) {
            match reencode_jpeg(&bytes, self.jpeg_quality) {
                Ok(jpeg) => {
                    tracing::debug!(
                        "Re-encoded {} bytes to {} byte JPEG",
                        bytes.len(),
                        jpeg.len()
                    );
                    return NormalizedImage {
                        bytes: jpeg,
                        extension: ".jpg".to_string(),
                        mime_type: "image/jpeg".to_string(),
                        reencoded: true,
                    };
                }
                Err(e) => {
                    tracing::debug!("Re-encode failed, sending original bytes: {e}");
                }
            }
        }

        // A declared image type wins; otherwise trust the bytes over the URL.
        let declared = content_type.filter(|ct| ct.to_ascii_lowercase().starts_with("image/"));
        let (extension, mime_type) = match declared {
            Some(ct) => guess_ext_and_type(Some(ct), url),
            None => sniff_ext_and_type(&bytes).unwrap_or_else(|| guess_ext_and_type(None, url)),
        };
        NormalizedImage {
            bytes,
            extension: extension.to_string(),
            mime_type: mime_type.to_string(),
            reencoded: false,
        }
    }

    /// [`normalize`](Self::normalize) on the blocking pool.
    pub async fn normalize_async(
        &self,
        bytes: Vec<u8>,
        content_type: Option<String>,
        url: String,
    ) -> PipelineResult<NormalizedImage> {
        let normalizer = *self;
        tokio::task::spawn_blocking(move || {
            normalizer.normalize(bytes, content_type.as_deref(), &url)
        })
        .await
        .map_err(|e| PipelineError::validation(format!("Normalize task failed: {e}")))
    }
}

/// Decode any supported format and write it back as JPEG.
fn reencode_jpeg(bytes: &[u8], quality: u8) -> Result<Vec<u8>, image::ImageError> {
    let img = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()?
        .decode()?;

    // JPEG has no alpha; only RGB8 and L8 go through untouched.
    let img = match img {
        DynamicImage::ImageRgb8(_) | DynamicImage::ImageLuma8(_) => img,
        other => DynamicImage::ImageRgb8(other.to_rgb8()),
    };

    let mut out = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut out, quality);
    img.write_with_encoder(encoder)?;
    Ok(out)
}
