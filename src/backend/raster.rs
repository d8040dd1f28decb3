//! Pixel-level primitives built on `image` and `fast_image_resize`.
//!
//! Everything here is format-agnostic: bytes go through [`decode`] once and
//! the rest of the pipeline works on `DynamicImage` / `RgbaImage` buffers.
//! Callers decide how failures map to request-level errors.

use std::io::Cursor;
use std::num::NonZeroU32;

use fast_image_resize as fr;
use image::io::Reader as ImageReader;
use image::{imageops, DynamicImage, Rgba, RgbaImage};

use super::error::RasterError;

/// Decode an image from raw bytes, sniffing the container format.
pub fn decode(data: &[u8]) -> Result<DynamicImage, RasterError> {
    ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| RasterError::Decode(e.to_string()))?
        .decode()
        .map_err(|e| RasterError::Decode(e.to_string()))
}

/// Resize to exactly `width`x`height` with Lanczos3 convolution.
///
/// Aspect ratio is the caller's concern; this function stretches.
pub fn resize_exact(
    img: &DynamicImage,
    width: u32,
    height: u32,
) -> Result<DynamicImage, RasterError> {
    let resize_err = |message: String| RasterError::Resize {
        width,
        height,
        message,
    };

    let src_width = NonZeroU32::new(img.width())
        .ok_or_else(|| resize_err("source width is zero".to_string()))?;
    let src_height = NonZeroU32::new(img.height())
        .ok_or_else(|| resize_err("source height is zero".to_string()))?;
    let dst_width =
        NonZeroU32::new(width).ok_or_else(|| resize_err("target width is zero".to_string()))?;
    let dst_height =
        NonZeroU32::new(height).ok_or_else(|| resize_err("target height is zero".to_string()))?;

    let src_image = fr::Image::from_vec_u8(
        src_width,
        src_height,
        img.to_rgba8().into_raw(),
        fr::PixelType::U8x4,
    )
    .map_err(|e| resize_err(e.to_string()))?;

    let mut dst_image = fr::Image::new(dst_width, dst_height, fr::PixelType::U8x4);
    let mut resizer = fr::Resizer::new(fr::ResizeAlg::Convolution(fr::FilterType::Lanczos3));
    resizer
        .resize(&src_image.view(), &mut dst_image.view_mut())
        .map_err(|e| resize_err(e.to_string()))?;

    let buf = RgbaImage::from_raw(width, height, dst_image.into_vec())
        .ok_or_else(|| resize_err("resized buffer has unexpected length".to_string()))?;
    Ok(DynamicImage::ImageRgba8(buf))
}

/// Scale the image to fit inside `width`x`height` and center it on a canvas
/// of exactly that size filled with `background`.
pub fn pad_to_canvas(
    img: &DynamicImage,
    width: u32,
    height: u32,
    background: Rgba<u8>,
) -> Result<DynamicImage, RasterError> {
    if width == 0 || height == 0 {
        return Err(RasterError::Resize {
            width,
            height,
            message: "canvas dimension is zero".to_string(),
        });
    }
    let ratio_w = width as f64 / img.width() as f64;
    let ratio_h = height as f64 / img.height() as f64;
    let ratio = ratio_w.min(ratio_h);

    let inner_w = ((img.width() as f64 * ratio).round() as u32).clamp(1, width);
    let inner_h = ((img.height() as f64 * ratio).round() as u32).clamp(1, height);

    let inner = if inner_w == img.width() && inner_h == img.height() {
        img.to_rgba8()
    } else {
        resize_exact(img, inner_w, inner_h)?.to_rgba8()
    };

    let mut canvas = RgbaImage::from_pixel(width, height, background);
    let x = ((width - inner_w) / 2) as i32;
    let y = ((height - inner_h) / 2) as i32;
    composite(&mut canvas, &inner, x, y, 1.0);
    Ok(DynamicImage::ImageRgba8(canvas))
}

/// Cut the given rectangle out of the image.
pub fn crop(
    img: &DynamicImage,
    x: u32,
    y: u32,
    width: u32,
    height: u32,
) -> Result<DynamicImage, RasterError> {
    let within = width > 0
        && height > 0
        && x.checked_add(width).is_some_and(|right| right <= img.width())
        && y.checked_add(height).is_some_and(|bottom| bottom <= img.height());
    if !within {
        return Err(RasterError::CropOutOfBounds {
            x,
            y,
            width,
            height,
        });
    }
    Ok(DynamicImage::ImageRgba8(
        imageops::crop_imm(img, x, y, width, height).to_image(),
    ))
}

/// Rotate clockwise by `degrees`, growing the canvas to the rotated bounding
/// box and filling the uncovered corners with `background`.
pub fn rotate(img: &DynamicImage, degrees: u16, background: Rgba<u8>) -> DynamicImage {
    // right angles stay exact and never expose corners
    match degrees % 360 {
        0 => return DynamicImage::ImageRgba8(img.to_rgba8()),
        90 => return DynamicImage::ImageRgba8(img.rotate90().to_rgba8()),
        180 => return DynamicImage::ImageRgba8(img.rotate180().to_rgba8()),
        270 => return DynamicImage::ImageRgba8(img.rotate270().to_rgba8()),
        _ => {}
    }

    let src = img.to_rgba8();
    let radians = (degrees as f32).to_radians();
    let (cos_a, sin_a) = (radians.cos(), radians.sin());

    let src_w = src.width() as f32;
    let src_h = src.height() as f32;
    let new_w = (src_w * cos_a.abs() + src_h * sin_a.abs()).ceil() as u32;
    let new_h = (src_w * sin_a.abs() + src_h * cos_a.abs()).ceil() as u32;

    let cx_src = src_w / 2.0;
    let cy_src = src_h / 2.0;
    let cx_dst = new_w as f32 / 2.0;
    let cy_dst = new_h as f32 / 2.0;

    let mut output = RgbaImage::from_pixel(new_w, new_h, background);
    for y in 0..new_h {
        for x in 0..new_w {
            let dx = x as f32 - cx_dst;
            let dy = y as f32 - cy_dst;
            // inverse mapping back into the source
            let sx = dx * cos_a + dy * sin_a + cx_src;
            let sy = -dx * sin_a + dy * cos_a + cy_src;
            if sx >= 0.0 && sx < src_w - 1.0 && sy >= 0.0 && sy < src_h - 1.0 {
                let sampled = bilinear_sample(&src, sx, sy);
                let blended = blend_over(sampled, background);
                output.put_pixel(x, y, blended);
            }
        }
    }
    DynamicImage::ImageRgba8(output)
}

fn bilinear_sample(src: &RgbaImage, sx: f32, sy: f32) -> Rgba<u8> {
    let x0 = sx.floor() as u32;
    let y0 = sy.floor() as u32;
    let fx = sx - x0 as f32;
    let fy = sy - y0 as f32;

    let p00 = src.get_pixel(x0, y0);
    let p10 = src.get_pixel(x0 + 1, y0);
    let p01 = src.get_pixel(x0, y0 + 1);
    let p11 = src.get_pixel(x0 + 1, y0 + 1);

    let mut out = [0u8; 4];
    for (i, slot) in out.iter_mut().enumerate() {
        let top = p00[i] as f32 * (1.0 - fx) + p10[i] as f32 * fx;
        let bottom = p01[i] as f32 * (1.0 - fx) + p11[i] as f32 * fx;
        *slot = (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8;
    }
    Rgba(out)
}

fn blend_over(fg: Rgba<u8>, bg: Rgba<u8>) -> Rgba<u8> {
    blend_pixels(fg, bg, 1.0)
}

/// Draw `overlay` onto `target` with its top-left corner at `(x, y)`.
///
/// The overlay is clipped at the target edges, so negative or oversized
/// positions are safe. `opacity` is a further multiplier on the overlay's
/// own alpha channel.
pub fn composite(target: &mut RgbaImage, overlay: &RgbaImage, x: i32, y: i32, opacity: f32) {
    let (target_w, target_h) = (target.width() as i32, target.height() as i32);
    let (overlay_w, overlay_h) = (overlay.width() as i32, overlay.height() as i32);

    let x_start = x.max(0);
    let y_start = y.max(0);
    let x_end = x.saturating_add(overlay_w).min(target_w);
    let y_end = y.saturating_add(overlay_h).min(target_h);

    for ty in y_start..y_end {
        for tx in x_start..x_end {
            let ox = (tx - x) as u32;
            let oy = (ty - y) as u32;
            let fg = *overlay.get_pixel(ox, oy);
            let bg = *target.get_pixel(tx as u32, ty as u32);
            target.put_pixel(tx as u32, ty as u32, blend_pixels(fg, bg, opacity));
        }
    }
}

/// Porter-Duff "over" for a single pixel pair.
pub(super) fn blend_pixels(fg: Rgba<u8>, bg: Rgba<u8>, opacity: f32) -> Rgba<u8> {
    let fg_alpha = (fg[3] as f32 / 255.0) * opacity.clamp(0.0, 1.0);
    let bg_alpha = bg[3] as f32 / 255.0;
    let out_alpha = fg_alpha + bg_alpha * (1.0 - fg_alpha);

    if out_alpha < 0.001 {
        return Rgba([0, 0, 0, 0]);
    }

    let blend = |f: u8, b: u8| -> u8 {
        let f = f as f32 / 255.0;
        let b = b as f32 / 255.0;
        let out = (f * fg_alpha + b * bg_alpha * (1.0 - fg_alpha)) / out_alpha;
        (out * 255.0).round().clamp(0.0, 255.0) as u8
    };

    Rgba([
        blend(fg[0], bg[0]),
        blend(fg[1], bg[1]),
        blend(fg[2], bg[2]),
        (out_alpha * 255.0).round().clamp(0.0, 255.0) as u8,
    ])
}

/// Parse a fill color: `#RGB`, `#RRGGBB`, or a small set of names.
pub fn parse_color(value: &str) -> Result<Rgba<u8>, RasterError> {
    let named = match value.to_ascii_lowercase().as_str() {
        "white" => Some(Rgba([255, 255, 255, 255])),
        "black" => Some(Rgba([0, 0, 0, 255])),
        "red" => Some(Rgba([255, 0, 0, 255])),
        "green" => Some(Rgba([0, 255, 0, 255])),
        "blue" => Some(Rgba([0, 0, 255, 255])),
        "gray" | "grey" => Some(Rgba([128, 128, 128, 255])),
        "transparent" => Some(Rgba([0, 0, 0, 0])),
        _ => None,
    };
    if let Some(color) = named {
        return Ok(color);
    }

    let hex = value
        .strip_prefix('#')
        .ok_or_else(|| RasterError::Color(value.to_string()))?;
    // all-ASCII-hex guarantees every byte index below is a char boundary
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(RasterError::Color(value.to_string()));
    }
    let channel =
        |s: &str| u8::from_str_radix(s, 16).map_err(|_| RasterError::Color(value.to_string()));
    match hex.len() {
        3 => {
            let r = channel(&hex[0..1])? * 17;
            let g = channel(&hex[1..2])? * 17;
            let b = channel(&hex[2..3])? * 17;
            Ok(Rgba([r, g, b, 255]))
        }
        6 => {
            let r = channel(&hex[0..2])?;
            let g = channel(&hex[2..4])?;
            let b = channel(&hex[4..6])?;
            Ok(Rgba([r, g, b, 255]))
        }
        _ => Err(RasterError::Color(value.to_string())),
    }
}
