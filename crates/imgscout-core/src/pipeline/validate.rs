//! Checks that downloaded bytes are actually an image.

use std::io::Cursor;

use crate::error::{PipelineError, PipelineResult};

/// Validates downloaded content before it is saved or uploaded.
#[derive(Debug, Clone, Copy, Default)]
pub struct Validator;

impl Validator {
    pub fn new() -> Self {
        Self
    }

    /// Run every check.
    ///
    /// Checks:
    /// - Declared content type mentions "image" (a missing header is allowed)
    /// - Bytes start with a known image signature
    /// - The `image` crate can decode the bytes
    ///
    /// Decoding is CPU-bound; async callers should run this in `spawn_blocking`.
    pub fn validate(&self, bytes: &[u8], content_type: Option<&str>) -> PipelineResult<()> {
        Self::check_content_type(content_type)?;
        Self::check_magic_bytes(bytes)?;
        Self::check_decodable(bytes)
    }

    fn check_content_type(content_type: Option<&str>) -> PipelineResult<()> {
        match content_type {
            Some(ct) if !ct.to_ascii_lowercase().contains("image") => Err(
                PipelineError::validation(format!("Content type is not an image: {ct}")),
            ),
            _ => Ok(()),
        }
    }

    fn check_magic_bytes(bytes: &[u8]) -> PipelineResult<()> {
        if bytes.len() < 4 {
            return Err(PipelineError::validation(
                "Content too small to be a valid image",
            ));
        }
        if !Self::is_valid_image_header(bytes) {
            return Err(PipelineError::validation(
                "Unrecognized image format (invalid magic bytes)",
            ));
        }
        Ok(())
    }

    /// Check if the leading bytes match a known image format.
    fn is_valid_image_header(header: &[u8]) -> bool {
        let len = header.len();
        if len < 4 {
            return false;
        }

        // JPEG: FF D8 FF
        if header[0] == 0xFF && header[1] == 0xD8 && header[2] == 0xFF {
            return true;
        }

        // PNG: 89 50 4E 47
        if header[0] == 0x89 && header[1] == b'P' && header[2] == b'N' && header[3] == b'G' {
            return true;
        }

        // GIF: GIF8
        if header.starts_with(b"GIF8") {
            return true;
        }

        // WebP: RIFF....WEBP
        if header.starts_with(b"RIFF") {
            return len >= 12 && &header[8..12] == b"WEBP";
        }

        // BMP: BM
        if header[0] == b'B' && header[1] == b'M' {
            return true;
        }

        // TIFF: II*\0 or MM\0*
        if header.starts_with(&[b'I', b'I', 0x2A, 0x00])
            || header.starts_with(&[b'M', b'M', 0x00, 0x2A])
        {
            return true;
        }

        // AVIF/HEIF: ftyp box at offset 4
        len >= 12 && &header[4..8] == b"ftyp"
    }

    fn check_decodable(bytes: &[u8]) -> PipelineResult<()> {
        let reader = image::ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| PipelineError::validation(format!("Cannot detect format: {e}")))?;

        reader
            .decode()
            .map(|_| ())
            .map_err(|e| PipelineError::validation(format!("Cannot decode image: {e}")))
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use image::{DynamicImage, ImageFormat, RgbImage, RgbaImage};
    use std::io::Cursor;

    pub fn encode(img: &DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, format).unwrap();
        out.into_inner()
    }

    pub fn jpeg(w: u32, h: u32) -> Vec<u8> {
        encode(
            &DynamicImage::ImageRgb8(RgbImage::from_fn(w, h, |x, y| {
                image::Rgb([(x % 256) as u8, (y % 256) as u8, 90])
            })),
            ImageFormat::Jpeg,
        )
    }

    pub fn png_rgba(w: u32, h: u32) -> Vec<u8> {
        encode(
            &DynamicImage::ImageRgba8(RgbaImage::from_fn(w, h, |x, y| {
                image::Rgba([(x % 256) as u8, (y % 256) as u8, 200, 128])
            })),
            ImageFormat::Png,
        )
    }

    pub fn webp(w: u32, h: u32) -> Vec<u8> {
        encode(
            &DynamicImage::ImageRgba8(RgbaImage::from_pixel(w, h, image::Rgba([10, 20, 30, 255]))),
            ImageFormat::WebP,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_magic_bytes_jpeg() {
        let header = [0xFF, 0xD8, 0xFF, 0xE0, 0, 0, 0, 0, 0, 0, 0, 0];
        assert!(Validator::is_valid_image_header(&header));
    }

    #[test]
    fn test_magic_bytes_webp() {
        let header = [b'R', b'I', b'F', b'F', 0, 0, 0, 0, b'W', b'E', b'B', b'P'];
        assert!(Validator::is_valid_image_header(&header));
    }

    #[test]
    fn test_magic_bytes_riff_without_webp_rejected() {
        let header = [b'R', b'I', b'F', b'F', 0, 0, 0, 0, b'W', b'A', b'V', b'E'];
        assert!(!Validator::is_valid_image_header(&header));
    }

    #[test]
    fn test_magic_bytes_html_rejected() {
        assert!(!Validator::is_valid_image_header(b"<!DOCTYPE html>"));
    }

    #[test]
    fn test_valid_jpeg_passes() {
        let bytes = fixtures::jpeg(8, 8);
        assert!(Validator::new().validate(&bytes, Some("image/jpeg")).is_ok());
        assert!(Validator::new().validate(&bytes, None).is_ok());
    }

    #[test]
    fn test_non_image_content_type_rejected() {
        let bytes = fixtures::jpeg(8, 8);
        let err = Validator::new()
            .validate(&bytes, Some("text/html; charset=utf-8"))
            .unwrap_err();
        assert!(err.to_string().contains("not an image"));
    }

    #[test]
    fn test_truncated_png_rejected() {
        let bytes = fixtures::png_rgba(32, 32);
        let truncated = &bytes[..bytes.len() / 3];
        let err = Validator::new().validate(truncated, None).unwrap_err();
        assert!(matches!(err, PipelineError::Validation { .. }));
    }

    #[test]
    fn test_tiny_payload_rejected() {
        assert!(Validator::new().validate(&[0xFF, 0xD8], None).is_err());
    }
}
