//! Text rasterization for text watermarks.
//!
//! Fonts are loaded from a configured directory on first use and cached for
//! the lifetime of the catalog. Rendering lays glyphs out with kerning on a
//! tight canvas, applies the optional shadow pass, and rotates the finished
//! canvas when the style asks for it.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use ab_glyph::{point, Font, FontVec, GlyphId, PxScale, ScaleFont};
use image::{DynamicImage, Rgba, RgbaImage};
use parking_lot::RwLock;
use serde::Deserialize;

use super::error::RasterError;
use super::raster;

/// Named font families accepted in text watermark requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
pub enum FontVariant {
    #[default]
    #[serde(rename = "wqy-zenhei")]
    WqyZenhei,
    #[serde(rename = "wqy-microhei")]
    WqyMicrohei,
    #[serde(rename = "fangzhengshusong")]
    FangZhengShuSong,
    #[serde(rename = "fangzhengkaiti")]
    FangZhengKaiTi,
    #[serde(rename = "fangzhengheiti")]
    FangZhengHeiTi,
    #[serde(rename = "fangzhengfangsong")]
    FangZhengFangSong,
    #[serde(rename = "droidsansfallback")]
    DroidSansFallback,
}

impl FontVariant {
    /// File looked up under the catalog directory.
    pub fn file_name(&self) -> &'static str {
        match self {
            FontVariant::WqyZenhei => "wqy-zenhei.ttf",
            FontVariant::WqyMicrohei => "wqy-microhei.ttf",
            FontVariant::FangZhengShuSong => "fangzhengshusong.ttf",
            FontVariant::FangZhengKaiTi => "fangzhengkaiti.ttf",
            FontVariant::FangZhengHeiTi => "fangzhengheiti.ttf",
            FontVariant::FangZhengFangSong => "fangzhengfangsong.ttf",
            FontVariant::DroidSansFallback => "droidsansfallback.ttf",
        }
    }

    /// Parse a request token. Unknown names select the default family
    /// instead of failing, matching how sloppy clients are handled upstream.
    pub fn from_token(token: &str) -> Self {
        match token {
            "wqy-zenhei" => FontVariant::WqyZenhei,
            "wqy-microhei" => FontVariant::WqyMicrohei,
            "fangzhengshusong" => FontVariant::FangZhengShuSong,
            "fangzhengkaiti" => FontVariant::FangZhengKaiTi,
            "fangzhengheiti" => FontVariant::FangZhengHeiTi,
            "fangzhengfangsong" => FontVariant::FangZhengFangSong,
            "droidsansfallback" => FontVariant::DroidSansFallback,
            _ => FontVariant::default(),
        }
    }
}

/// Lazily loaded, shared font files keyed by variant.
pub struct FontCatalog {
    dir: PathBuf,
    loaded: RwLock<HashMap<FontVariant, Arc<FontVec>>>,
}

impl FontCatalog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FontCatalog {
            dir: dir.into(),
            loaded: RwLock::new(HashMap::new()),
        }
    }

    /// Font for `variant`, reading it from disk on first request.
    pub fn get(&self, variant: FontVariant) -> Result<Arc<FontVec>, RasterError> {
        if let Some(font) = self.loaded.read().get(&variant) {
            return Ok(font.clone());
        }

        let path = self.dir.join(variant.file_name());
        let bytes = std::fs::read(&path).map_err(|source| RasterError::FontUnavailable {
            path: path.clone(),
            source,
        })?;
        let font = Arc::new(
            FontVec::try_from_vec(bytes).map_err(|_| RasterError::FontData { path })?,
        );
        self.loaded.write().insert(variant, font.clone());
        Ok(font)
    }
}

impl std::fmt::Debug for FontCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontCatalog")
            .field("dir", &self.dir)
            .field("loaded", &self.loaded.read().len())
            .finish()
    }
}

/// How to paint a piece of watermark text.
#[derive(Debug, Clone, Copy)]
pub struct TextStyle {
    /// Glyph size in pixels.
    pub size: u32,
    pub color: Rgba<u8>,
    /// Shadow opacity in percent; 0 disables the shadow pass.
    pub shadow: u8,
    /// Paint on an opaque white canvas instead of a transparent one.
    pub fill_background: bool,
    /// Clockwise rotation applied to the finished canvas.
    pub rotate_degrees: u16,
}

/// Render `text` into an RGBA canvas sized to fit it.
pub fn render_text(
    font: &FontVec,
    text: &str,
    style: &TextStyle,
) -> Result<RgbaImage, RasterError> {
    if style.size == 0 {
        return Err(RasterError::Render("glyph size is zero".to_string()));
    }
    let scale = PxScale::from(style.size as f32);
    let (canvas_w, canvas_h) = measure_text(font, text, scale);

    let backdrop = if style.fill_background {
        Rgba([255, 255, 255, 255])
    } else {
        Rgba([0, 0, 0, 0])
    };
    let mut canvas = RgbaImage::from_pixel(canvas_w, canvas_h, backdrop);

    if style.shadow > 0 {
        let offset = ((style.size as f32) / 12.0).ceil().max(1.0) as i32;
        let alpha = (style.shadow.min(100) as f32 / 100.0 * 255.0).round() as u8;
        let shadow_color = Rgba([0, 0, 0, alpha]);
        draw_glyphs(&mut canvas, font, text, scale, shadow_color, offset, offset);
    }
    draw_glyphs(&mut canvas, font, text, scale, style.color, 0, 0);

    if style.rotate_degrees % 360 != 0 {
        let rotated = raster::rotate(
            &DynamicImage::ImageRgba8(canvas),
            style.rotate_degrees,
            backdrop,
        );
        return Ok(rotated.to_rgba8());
    }
    Ok(canvas)
}

/// Canvas size needed for `text` at `scale`, with a 1px border all round.
fn measure_text(font: &FontVec, text: &str, scale: PxScale) -> (u32, u32) {
    let scaled = font.as_scaled(scale);
    let mut width = 0.0f32;
    let mut prev: Option<GlyphId> = None;
    for c in text.chars() {
        let id = scaled.glyph_id(c);
        if let Some(p) = prev {
            width += scaled.kern(p, id);
        }
        width += scaled.h_advance(id);
        prev = Some(id);
    }
    let height = scaled.height();
    ((width.ceil() as u32).max(1) + 2, (height.ceil() as u32).max(1) + 2)
}

fn draw_glyphs(
    canvas: &mut RgbaImage,
    font: &FontVec,
    text: &str,
    scale: PxScale,
    color: Rgba<u8>,
    offset_x: i32,
    offset_y: i32,
) {
    let scaled = font.as_scaled(scale);
    let baseline = 1.0 + scaled.ascent();
    let mut cursor_x = 1.0f32;
    let mut prev: Option<GlyphId> = None;

    for c in text.chars() {
        let id = scaled.glyph_id(c);
        if let Some(p) = prev {
            cursor_x += scaled.kern(p, id);
        }
        let glyph = id.with_scale_and_position(scale, point(cursor_x, baseline));
        if let Some(outlined) = font.outline_glyph(glyph) {
            let bounds = outlined.px_bounds();
            outlined.draw(|gx, gy, coverage| {
                let px = bounds.min.x as i32 + gx as i32 + offset_x;
                let py = bounds.min.y as i32 + gy as i32 + offset_y;
                if px >= 0
                    && py >= 0
                    && (px as u32) < canvas.width()
                    && (py as u32) < canvas.height()
                {
                    let bg = *canvas.get_pixel(px as u32, py as u32);
                    let blended = raster::blend_pixels(color, bg, coverage);
                    canvas.put_pixel(px as u32, py as u32, blended);
                }
            });
        }
        cursor_x += scaled.h_advance(id);
        prev = Some(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_variant_tokens_roundtrip_through_serde() {
        let v: FontVariant = serde_yaml::from_str("wqy-microhei").unwrap();
        assert_eq!(v, FontVariant::WqyMicrohei);
        let v: FontVariant = serde_yaml::from_str("fangzhengkaiti").unwrap();
        assert_eq!(v, FontVariant::FangZhengKaiTi);
    }

    // Test: unknown font names select the default family, they never fail
    #[test]
    fn test_unknown_token_falls_back_to_default() {
        assert_eq!(FontVariant::from_token("comic-sans"), FontVariant::WqyZenhei);
        assert_eq!(FontVariant::from_token(""), FontVariant::WqyZenhei);
    }

    #[test]
    fn test_file_names_are_distinct() {
        let variants = [
            FontVariant::WqyZenhei,
            FontVariant::WqyMicrohei,
            FontVariant::FangZhengShuSong,
            FontVariant::FangZhengKaiTi,
            FontVariant::FangZhengHeiTi,
            FontVariant::FangZhengFangSong,
            FontVariant::DroidSansFallback,
        ];
        let mut names: Vec<_> = variants.iter().map(|v| v.file_name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), variants.len());
    }

    #[test]
    fn test_catalog_reports_missing_font_with_path() {
        let catalog = FontCatalog::new("/nonexistent/font/dir");
        let err = catalog.get(FontVariant::WqyZenhei).unwrap_err();
        match err {
            RasterError::FontUnavailable { path, .. } => {
                assert!(path.ends_with("wqy-zenhei.ttf"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_catalog_rejects_non_font_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("wqy-zenhei.ttf"), b"not a font").unwrap();
        let catalog = FontCatalog::new(dir.path());
        let err = catalog.get(FontVariant::WqyZenhei).unwrap_err();
        assert!(matches!(err, RasterError::FontData { .. }));
    }

    fn find_any_system_font(dir: &Path, depth: u8) -> Option<FontVec> {
        let entries = std::fs::read_dir(dir).ok()?;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                if depth > 0 {
                    if let Some(font) = find_any_system_font(&path, depth - 1) {
                        return Some(font);
                    }
                }
                continue;
            }
            let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
            if matches!(ext, "ttf" | "otf") {
                if let Ok(bytes) = std::fs::read(&path) {
                    if let Ok(font) = FontVec::try_from_vec(bytes) {
                        return Some(font);
                    }
                }
            }
        }
        None
    }

    // Test: full render path, skipped quietly when the host has no fonts
    #[test]
    fn test_render_text_produces_nonempty_canvas() {
        let Some(font) = find_any_system_font(Path::new("/usr/share/fonts"), 3) else {
            return;
        };
        let style = TextStyle {
            size: 24,
            color: Rgba([255, 0, 0, 255]),
            shadow: 0,
            fill_background: false,
            rotate_degrees: 0,
        };
        let canvas = render_text(&font, "hello", &style).unwrap();
        assert!(canvas.width() > 2);
        assert!(canvas.height() > 2);
        let painted = canvas.pixels().any(|p| p[3] > 0);
        assert!(painted, "no glyph coverage was painted");
    }

    #[test]
    fn test_render_rejects_zero_size() {
        let Some(font) = find_any_system_font(Path::new("/usr/share/fonts"), 3) else {
            return;
        };
        let style = TextStyle {
            size: 0,
            color: Rgba([0, 0, 0, 255]),
            shadow: 0,
            fill_background: false,
            rotate_degrees: 0,
        };
        assert!(matches!(
            render_text(&font, "x", &style),
            Err(RasterError::Render(_))
        ));
    }
}
