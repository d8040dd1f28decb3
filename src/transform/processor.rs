//! Transform orchestration.
//!
//! [`TransformEngine`] owns the pieces that live for the whole process
//! (validated config, font catalog) and drives each request through the
//! same stations: validate the plan, decode, validate dimensions, resolve
//! geometry or placement, execute on the raster backend, re-encode.

use bytes::Bytes;
use image::{DynamicImage, Rgba, RgbaImage};
use tracing::{debug, error};

use crate::backend::{raster, text, EncoderFactory, FontCatalog, SourceFormat};
use crate::config::{ConfigError, EngineConfig};
use crate::error::{Stage, TransformError};
use crate::transform::plan::{
    ResizePlan, RotatePlan, ScaleDirective, WatermarkMask, WatermarkPlan,
};
use crate::transform::{geometry, placement, validate, Dimensions};

/// Stateful engine shared by all transform requests.
///
/// Construction validates the config once; after that every entry point is
/// `&self` and safe to call from multiple threads. The font catalog caches
/// loaded fonts internally, so repeated text watermarks do not re-read
/// font files.
pub struct TransformEngine {
    config: EngineConfig,
    fonts: FontCatalog,
}

impl TransformEngine {
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let fonts = FontCatalog::new(config.fonts.dir.clone());
        Ok(TransformEngine { config, fonts })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Resize `data` according to `plan` and re-encode in the source
    /// format.
    pub fn resize(&self, data: &[u8], plan: &ResizePlan) -> Result<Vec<u8>, TransformError> {
        plan.validate()?;
        let format = SourceFormat::detect(data);
        let img = decode_base(data)?;
        let origin = Dimensions::of(&img);
        validate::validate_origin_dimensions(
            origin.width,
            origin.height,
            self.config.max_dimension,
        )?;

        let overlay = self.overlay_dimensions(plan)?;
        let resolved = geometry::resolve(origin, plan, overlay, self.config.max_dimension)?;
        debug!(
            origin_width = origin.width,
            origin_height = origin.height,
            target_width = resolved.target_width,
            target_height = resolved.target_height,
            pad = resolved.pad_to_canvas,
            exact = resolved.force_exact,
            "resolved resize geometry"
        );

        let output = self.execute_geometry(&img, origin, &resolved, &plan.background)?;
        self.encode(&output, format)
    }

    /// Composite the plan's watermark mask onto `data`.
    pub fn watermark(&self, data: &[u8], plan: &WatermarkPlan) -> Result<Vec<u8>, TransformError> {
        plan.validate()?;
        validate::validate_watermark_plan(plan)?;
        let format = SourceFormat::detect(data);
        let img = decode_base(data)?;
        let origin = Dimensions::of(&img);
        validate::validate_origin_dimensions(
            origin.width,
            origin.height,
            self.config.max_dimension,
        )?;

        let overlay = self.materialize_mask(plan)?;
        let overlay_dims = Dimensions::new(overlay.width(), overlay.height());
        let spot = placement::resolve_placement(plan, origin, overlay_dims);
        debug!(
            anchor = ?plan.position,
            x = spot.x,
            y = spot.y,
            order = ?plan.order,
            align = ?plan.align,
            interval = plan.interval,
            "resolved watermark placement"
        );

        let mut base = img.to_rgba8();
        let opacity = plan.transparency as f32 / 100.0;
        raster::composite(&mut base, &overlay, spot.x, spot.y, opacity);
        self.encode(&DynamicImage::ImageRgba8(base), format)
    }

    /// Rotate `data` clockwise by the plan's angle, growing the canvas to
    /// hold the rotated image.
    pub fn rotate(&self, data: &[u8], plan: &RotatePlan) -> Result<Vec<u8>, TransformError> {
        plan.validate()?;
        let format = SourceFormat::detect(data);
        let img = decode_base(data)?;
        let origin = Dimensions::of(&img);
        validate::validate_origin_dimensions(
            origin.width,
            origin.height,
            self.config.max_dimension,
        )?;

        let background = raster::parse_color(&plan.background)
            .map_err(|e| TransformError::backend(Stage::Rotate, e))?;
        let rotated = raster::rotate(&img, plan.degrees, background);
        debug!(
            degrees = plan.degrees,
            width = rotated.width(),
            height = rotated.height(),
            "rotated image"
        );
        self.encode(&rotated, format)
    }

    /// Decode the overlay only when the directive scales the base against
    /// it; the other directives never touch the overlay.
    fn overlay_dimensions(&self, plan: &ResizePlan) -> Result<Option<Dimensions>, TransformError> {
        match &plan.directive {
            ScaleDirective::OverlayProportion { overlay, .. } => {
                let img = decode_overlay(overlay)?;
                Ok(Some(Dimensions::of(&img)))
            }
            _ => Ok(None),
        }
    }

    fn execute_geometry(
        &self,
        img: &DynamicImage,
        origin: Dimensions,
        resolved: &geometry::ResolvedGeometry,
        background: &str,
    ) -> Result<DynamicImage, TransformError> {
        let stage_err = |e| TransformError::backend(Stage::Resize, e);

        if resolved.pad_to_canvas {
            let color = raster::parse_color(background).map_err(stage_err)?;
            return raster::pad_to_canvas(img, resolved.target_width, resolved.target_height, color)
                .map_err(stage_err);
        }
        if let Some(rect) = resolved.crop {
            // crop coordinates live in the cover-scaled space
            let (scaled_w, scaled_h) =
                geometry::cover_scaled_dims(origin, resolved.target_width, resolved.target_height);
            let scaled = raster::resize_exact(img, scaled_w, scaled_h).map_err(stage_err)?;
            return raster::crop(&scaled, rect.x, rect.y, rect.width, rect.height)
                .map_err(stage_err);
        }
        if resolved.target_width == origin.width && resolved.target_height == origin.height {
            return Ok(img.clone());
        }
        raster::resize_exact(img, resolved.target_width, resolved.target_height).map_err(stage_err)
    }

    /// Turn the plan's mask into an RGBA overlay ready for compositing.
    fn materialize_mask(&self, plan: &WatermarkPlan) -> Result<RgbaImage, TransformError> {
        match &plan.mask {
            WatermarkMask::Picture(mask) => {
                let decoded = decode_overlay(&mask.data)?;
                let decoded = match mask.crop {
                    Some(rect) => raster::crop(&decoded, rect.x, rect.y, rect.width, rect.height)
                        .map_err(|e| TransformError::backend(Stage::Composite, e))?,
                    None => decoded,
                };
                if plan.rotate % 360 != 0 {
                    // rotated corners stay transparent so the base shows
                    // through
                    Ok(raster::rotate(&decoded, plan.rotate, Rgba([0, 0, 0, 0])).to_rgba8())
                } else {
                    Ok(decoded.to_rgba8())
                }
            }
            WatermarkMask::Text(mask) => {
                let font = self
                    .fonts
                    .get(mask.font)
                    .map_err(|e| TransformError::backend(Stage::RenderText, e))?;
                let color = raster::parse_color(&mask.color)
                    .map_err(|e| TransformError::backend(Stage::RenderText, e))?;
                let style = text::TextStyle {
                    size: mask.size,
                    color,
                    shadow: mask.shadow,
                    fill_background: mask.fill_background,
                    rotate_degrees: plan.rotate,
                };
                text::render_text(&font, &mask.text, &style)
                    .map_err(|e| TransformError::backend(Stage::RenderText, e))
            }
        }
    }

    fn encode(&self, img: &DynamicImage, format: SourceFormat) -> Result<Vec<u8>, TransformError> {
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        let encoder = EncoderFactory::for_format(format);
        encoder
            .encode(rgba.as_raw(), width, height, self.config.encode_quality)
            .map_err(|e| {
                error!(error = %e, format = format.content_type(), "encode failed");
                TransformError::backend(Stage::Encode, e)
            })
    }
}

impl Default for TransformEngine {
    fn default() -> Self {
        let config = EngineConfig::default();
        let fonts = FontCatalog::new(config.fonts.dir.clone());
        TransformEngine { config, fonts }
    }
}

impl std::fmt::Debug for TransformEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformEngine")
            .field("config", &self.config)
            .field("fonts", &self.fonts)
            .finish()
    }
}

fn decode_base(data: &[u8]) -> Result<DynamicImage, TransformError> {
    raster::decode(data).map_err(|e| {
        debug!(error = %e, "source image decode failed");
        TransformError::UnsupportedMediaType
    })
}

fn decode_overlay(data: &Bytes) -> Result<DynamicImage, TransformError> {
    raster::decode(data).map_err(|e| {
        debug!(error = %e, "watermark picture decode failed");
        TransformError::InvalidWatermarkPicture
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::plan::{Anchor, BoxSpec, CropRect, PictureMask, ResizeMode};
    use std::io::Cursor;

    fn engine() -> TransformEngine {
        TransformEngine::default()
    }

    fn png_bytes(width: u32, height: u32, color: Rgba<u8>) -> Vec<u8> {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, color));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), image::ImageOutputFormat::Png)
            .unwrap();
        buf
    }

    fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            width,
            height,
            Rgba([40, 80, 120, 255]),
        ));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), image::ImageOutputFormat::Jpeg(90))
            .unwrap();
        buf
    }

    fn decoded_dims(data: &[u8]) -> (u32, u32) {
        let img = raster::decode(data).unwrap();
        (img.width(), img.height())
    }

    #[test]
    fn test_resize_lfit_end_to_end() {
        let input = png_bytes(100, 50, Rgba([10, 20, 30, 255]));
        let plan = ResizePlan::sized(BoxSpec::with_dimensions(ResizeMode::Lfit, 50, 50));
        let output = engine().resize(&input, &plan).unwrap();
        assert_eq!(decoded_dims(&output), (50, 25));
    }

    #[test]
    fn test_resize_proportion_end_to_end() {
        let input = png_bytes(100, 50, Rgba([10, 20, 30, 255]));
        let output = engine().resize(&input, &ResizePlan::proportion(50)).unwrap();
        assert_eq!(decoded_dims(&output), (50, 25));
    }

    #[test]
    fn test_resize_fixed_distorts() {
        let input = png_bytes(100, 50, Rgba([10, 20, 30, 255]));
        let plan = ResizePlan::sized(BoxSpec::with_dimensions(ResizeMode::Fixed, 40, 40));
        let output = engine().resize(&input, &plan).unwrap();
        assert_eq!(decoded_dims(&output), (40, 40));
    }

    #[test]
    fn test_resize_pad_letterboxes() {
        let input = png_bytes(100, 50, Rgba([10, 20, 30, 255]));
        let mut plan = ResizePlan::sized(BoxSpec::with_dimensions(ResizeMode::Pad, 80, 80));
        plan.background = "black".to_string();
        plan.limit_enlargement = false;
        let output = engine().resize(&input, &plan).unwrap();
        assert_eq!(decoded_dims(&output), (80, 80));

        let img = raster::decode(&output).unwrap().to_rgba8();
        // letterbox bands above and below the centered 80x40 inner image
        assert_eq!(*img.get_pixel(40, 2), Rgba([0, 0, 0, 255]));
        assert_eq!(*img.get_pixel(40, 40), Rgba([10, 20, 30, 255]));
    }

    #[test]
    fn test_resize_fill_crops_to_box() {
        let input = png_bytes(100, 50, Rgba([10, 20, 30, 255]));
        let plan = ResizePlan::sized(BoxSpec::with_dimensions(ResizeMode::Fill, 40, 40));
        let output = engine().resize(&input, &plan).unwrap();
        assert_eq!(decoded_dims(&output), (40, 40));
    }

    #[test]
    fn test_resize_noop_keeps_dimensions() {
        let input = png_bytes(60, 40, Rgba([10, 20, 30, 255]));
        let plan = ResizePlan::sized(BoxSpec::with_dimensions(ResizeMode::Lfit, 0, 0));
        let output = engine().resize(&input, &plan).unwrap();
        assert_eq!(decoded_dims(&output), (60, 40));
    }

    #[test]
    fn test_undecodable_source_rejected() {
        let err = engine()
            .resize(b"definitely not an image", &ResizePlan::proportion(50))
            .unwrap_err();
        assert_eq!(err.response().0, 415);
    }

    #[test]
    fn test_oversized_source_rejected() {
        let config = EngineConfig {
            max_dimension: 64,
            ..EngineConfig::default()
        };
        let engine = TransformEngine::new(config).unwrap();
        let input = png_bytes(100, 50, Rgba([10, 20, 30, 255]));
        let err = engine.resize(&input, &ResizePlan::proportion(50)).unwrap_err();
        assert!(matches!(err, TransformError::DimensionTooLong));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = EngineConfig {
            encode_quality: 0,
            ..EngineConfig::default()
        };
        assert!(TransformEngine::new(config).is_err());
    }

    #[test]
    fn test_watermark_picture_bottom_right() {
        let base = png_bytes(100, 100, Rgba([255, 255, 255, 255]));
        let overlay = png_bytes(10, 10, Rgba([255, 0, 0, 255]));
        let plan = WatermarkPlan::with_picture(Bytes::from(overlay));

        let output = engine().watermark(&base, &plan).unwrap();
        let img = raster::decode(&output).unwrap().to_rgba8();
        // default anchor is the bottom-right corner, 10px margins
        assert_eq!(*img.get_pixel(85, 85), Rgba([255, 0, 0, 255]));
        assert_eq!(*img.get_pixel(50, 50), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_watermark_transparency_blends() {
        let base = png_bytes(100, 100, Rgba([255, 255, 255, 255]));
        let overlay = png_bytes(10, 10, Rgba([0, 0, 0, 255]));
        let mut plan = WatermarkPlan::with_picture(Bytes::from(overlay));
        plan.transparency = 50;

        let output = engine().watermark(&base, &plan).unwrap();
        let img = raster::decode(&output).unwrap().to_rgba8();
        let px = img.get_pixel(85, 85);
        assert!(px[0] > 100 && px[0] < 155, "expected a mid gray, got {px:?}");
    }

    #[test]
    fn test_watermark_picture_crop_applied() {
        // left half red, right half blue; cropping keeps only the blue side
        let mut overlay_img = RgbaImage::from_pixel(20, 10, Rgba([255, 0, 0, 255]));
        for y in 0..10 {
            for x in 10..20 {
                overlay_img.put_pixel(x, y, Rgba([0, 0, 255, 255]));
            }
        }
        let mut overlay = Vec::new();
        DynamicImage::ImageRgba8(overlay_img)
            .write_to(&mut Cursor::new(&mut overlay), image::ImageOutputFormat::Png)
            .unwrap();

        let base = png_bytes(100, 100, Rgba([255, 255, 255, 255]));
        let mut plan = WatermarkPlan::with_picture(Bytes::from(overlay));
        if let WatermarkMask::Picture(PictureMask { crop, .. }) = &mut plan.mask {
            *crop = Some(CropRect {
                x: 10,
                y: 0,
                width: 10,
                height: 10,
            });
        }

        let output = engine().watermark(&base, &plan).unwrap();
        let img = raster::decode(&output).unwrap().to_rgba8();
        assert_eq!(*img.get_pixel(85, 85), Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn test_watermark_center_anchor() {
        let base = png_bytes(100, 100, Rgba([255, 255, 255, 255]));
        let overlay = png_bytes(10, 10, Rgba([255, 0, 0, 255]));
        let mut plan = WatermarkPlan::with_picture(Bytes::from(overlay));
        plan.position = Anchor::Center;

        let output = engine().watermark(&base, &plan).unwrap();
        let img = raster::decode(&output).unwrap().to_rgba8();
        assert_eq!(*img.get_pixel(50, 50), Rgba([255, 0, 0, 255]));
        assert_eq!(*img.get_pixel(85, 85), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_watermark_undecodable_picture_rejected() {
        let base = png_bytes(100, 100, Rgba([255, 255, 255, 255]));
        let plan = WatermarkPlan::with_picture(Bytes::from_static(b"not a picture"));
        let err = engine().watermark(&base, &plan).unwrap_err();
        assert_eq!(err.response(), (406, "Invalid watermark picture."));
    }

    #[test]
    fn test_watermark_empty_picture_rejected() {
        let base = png_bytes(100, 100, Rgba([255, 255, 255, 255]));
        let plan = WatermarkPlan::with_picture(Bytes::new());
        let err = engine().watermark(&base, &plan).unwrap_err();
        assert_eq!(err.response(), (406, "Invalid watermark parameter."));
    }

    #[test]
    fn test_rotate_end_to_end() {
        let input = png_bytes(40, 20, Rgba([10, 20, 30, 255]));
        let output = engine().rotate(&input, &RotatePlan::new(90)).unwrap();
        assert_eq!(decoded_dims(&output), (20, 40));
    }

    #[test]
    fn test_rotate_bad_background_rejected() {
        let input = png_bytes(40, 20, Rgba([10, 20, 30, 255]));
        let mut plan = RotatePlan::new(45);
        plan.background = "not-a-color".to_string();
        let err = engine().rotate(&input, &plan).unwrap_err();
        assert!(matches!(
            err,
            TransformError::Backend {
                stage: Stage::Rotate,
                ..
            }
        ));

        // multi-byte hex lookalikes take the same error path
        plan.background = "#日日".to_string();
        let err = engine().rotate(&input, &plan).unwrap_err();
        assert_eq!(err.response(), (400, "No error has found"));
    }

    #[test]
    fn test_jpeg_source_stays_jpeg() {
        let input = jpeg_bytes(60, 40);
        let output = engine().resize(&input, &ResizePlan::proportion(50)).unwrap();
        assert_eq!(&output[..2], &[0xFF, 0xD8]);
        assert_eq!(decoded_dims(&output), (30, 20));
    }

    #[test]
    fn test_png_source_stays_png() {
        let input = png_bytes(60, 40, Rgba([10, 20, 30, 255]));
        let output = engine().resize(&input, &ResizePlan::proportion(50)).unwrap();
        assert_eq!(&output[..4], &[0x89, b'P', b'N', b'G']);
    }

    #[test]
    fn test_overlay_proportion_resize() {
        let input = png_bytes(100, 50, Rgba([10, 20, 30, 255]));
        let overlay = png_bytes(20, 20, Rgba([1, 2, 3, 255]));
        // factor = 0.1 * 100 / 20 = 0.5
        let plan = ResizePlan::overlay_proportion(10, Bytes::from(overlay));
        let output = engine().resize(&input, &plan).unwrap();
        assert_eq!(decoded_dims(&output), (50, 25));
    }

    #[test]
    fn test_overlay_proportion_bad_overlay_rejected() {
        let input = png_bytes(100, 50, Rgba([10, 20, 30, 255]));
        let plan = ResizePlan::overlay_proportion(10, Bytes::from_static(b"junk"));
        let err = engine().resize(&input, &plan).unwrap_err();
        assert!(matches!(err, TransformError::InvalidWatermarkPicture));
    }
}
