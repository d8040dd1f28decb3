//! Output encoding back into the source container format.
//!
//! A processed image is returned in the format the request arrived in, so the
//! pipeline detects the format once and asks [`EncoderFactory`] for a matching
//! encoder. Encoders work on raw RGBA bytes to keep them independent of the
//! transform steps.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::{ColorType, ImageEncoder as _, ImageFormat};

use super::error::RasterError;

/// Container format of a source payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Jpeg,
    Png,
    WebP,
    Gif,
}

impl SourceFormat {
    /// Sniff the format from payload bytes.
    ///
    /// Unknown payloads fall back to JPEG; the decode step is where
    /// undecodable input actually gets rejected.
    pub fn detect(data: &[u8]) -> Self {
        match image::guess_format(data) {
            Ok(ImageFormat::Png) => SourceFormat::Png,
            Ok(ImageFormat::WebP) => SourceFormat::WebP,
            Ok(ImageFormat::Gif) => SourceFormat::Gif,
            _ => SourceFormat::Jpeg,
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            SourceFormat::Jpeg => "image/jpeg",
            SourceFormat::Png => "image/png",
            SourceFormat::WebP => "image/webp",
            SourceFormat::Gif => "image/gif",
        }
    }
}

/// Encodes raw RGBA pixels into one container format.
pub trait OutputEncoder: Send + Sync {
    /// Format this encoder produces.
    fn format(&self) -> SourceFormat;

    /// Encode `rgba` (tightly packed, `width * height * 4` bytes).
    fn encode(
        &self,
        rgba: &[u8],
        width: u32,
        height: u32,
        quality: u8,
    ) -> Result<Vec<u8>, RasterError>;
}

pub struct JpegOutputEncoder;

impl OutputEncoder for JpegOutputEncoder {
    fn format(&self) -> SourceFormat {
        SourceFormat::Jpeg
    }

    fn encode(
        &self,
        rgba: &[u8],
        width: u32,
        height: u32,
        quality: u8,
    ) -> Result<Vec<u8>, RasterError> {
        let rgb = rgba_to_rgb(rgba);
        let mut output = Cursor::new(Vec::new());
        let encoder = JpegEncoder::new_with_quality(&mut output, quality);
        encoder
            .write_image(&rgb, width, height, ColorType::Rgb8)
            .map_err(|e| RasterError::Encode {
                format: "jpeg",
                message: e.to_string(),
            })?;
        Ok(output.into_inner())
    }
}

pub struct PngOutputEncoder;

impl OutputEncoder for PngOutputEncoder {
    fn format(&self) -> SourceFormat {
        SourceFormat::Png
    }

    fn encode(
        &self,
        rgba: &[u8],
        width: u32,
        height: u32,
        _quality: u8,
    ) -> Result<Vec<u8>, RasterError> {
        let mut output = Cursor::new(Vec::new());
        let encoder = PngEncoder::new(&mut output);
        encoder
            .write_image(rgba, width, height, ColorType::Rgba8)
            .map_err(|e| RasterError::Encode {
                format: "png",
                message: e.to_string(),
            })?;
        Ok(output.into_inner())
    }
}

pub struct WebPOutputEncoder;

impl OutputEncoder for WebPOutputEncoder {
    fn format(&self) -> SourceFormat {
        SourceFormat::WebP
    }

    fn encode(
        &self,
        rgba: &[u8],
        width: u32,
        height: u32,
        _quality: u8,
    ) -> Result<Vec<u8>, RasterError> {
        let mut output = Cursor::new(Vec::new());
        let encoder = WebPEncoder::new_lossless(&mut output);
        encoder
            .write_image(rgba, width, height, ColorType::Rgba8)
            .map_err(|e| RasterError::Encode {
                format: "webp",
                message: e.to_string(),
            })?;
        Ok(output.into_inner())
    }
}

pub struct EncoderFactory;

impl EncoderFactory {
    /// Encoder for the given source format.
    ///
    /// Animated GIF output is not produced; a GIF source comes back as a PNG
    /// of its first frame.
    pub fn for_format(format: SourceFormat) -> Box<dyn OutputEncoder> {
        match format {
            SourceFormat::Jpeg => Box::new(JpegOutputEncoder),
            SourceFormat::Png | SourceFormat::Gif => Box::new(PngOutputEncoder),
            SourceFormat::WebP => Box::new(WebPOutputEncoder),
        }
    }
}

/// Drop the alpha channel from tightly packed RGBA bytes.
fn rgba_to_rgb(rgba: &[u8]) -> Vec<u8> {
    rgba.chunks_exact(4)
        .flat_map(|px| [px[0], px[1], px[2]])
        .collect()
}
