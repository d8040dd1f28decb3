//! Geometry resolution.
//!
//! Turns a [`ResizePlan`] plus the decoded origin dimensions into one
//! [`ResolvedGeometry`] value that tells the raster backend exactly what to
//! do. All sizing decisions live here; the backend only executes them.

use crate::error::TransformError;
use crate::transform::plan::{BoxSpec, CropRect, ResizeMode, ResizePlan, ScaleDirective};
use crate::transform::validate::validate_watermark_scale;
use crate::transform::Dimensions;

/// Output of geometry resolution.
///
/// `target_width`/`target_height` are the dimensions of the final output
/// canvas. The flags say how to reach them:
///
/// * `crop` set: scale the source to cover the target, then cut the
///   centered rectangle (fill mode).
/// * `pad_to_canvas`: fit the source inside the target and letterbox the
///   rest with the plan background (pad mode).
/// * `force_exact`: stretch to the target ignoring aspect ratio (fixed
///   mode).
/// * none of the above: plain resize, aspect already encoded in the target.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedGeometry {
    pub target_width: u32,
    pub target_height: u32,
    pub scale_factor: Option<f64>,
    pub crop: Option<CropRect>,
    pub pad_to_canvas: bool,
    pub force_exact: bool,
}

impl ResolvedGeometry {
    fn plain(width: u32, height: u32) -> Self {
        ResolvedGeometry {
            target_width: width,
            target_height: height,
            scale_factor: None,
            crop: None,
            pad_to_canvas: false,
            force_exact: false,
        }
    }
}

/// Resolve a resize plan against the origin dimensions.
///
/// `overlay` carries the decoded watermark dimensions and is only consulted
/// for watermark-relative scaling. `max_dimension` bounds the scaled base
/// in that mode.
///
/// Directive precedence is encoded in the plan type itself: a watermark
/// proportion wins over a plain proportion, which wins over a sized box.
pub fn resolve(
    origin: Dimensions,
    plan: &ResizePlan,
    overlay: Option<Dimensions>,
    max_dimension: u32,
) -> Result<ResolvedGeometry, TransformError> {
    if origin.width == 0 || origin.height == 0 {
        return Err(TransformError::DimensionIsZero);
    }

    match &plan.directive {
        ScaleDirective::OverlayProportion { proportion, .. } => {
            let overlay = overlay.ok_or(TransformError::WatermarkCannotProcess)?;
            if overlay.width == 0 || overlay.height == 0 {
                return Err(TransformError::WatermarkCannotProcess);
            }
            // The factor scales the base image so the overlay ends up
            // covering the requested share of its dominant edge.
            let base_dominant = origin.width.max(origin.height) as f64;
            let overlay_dominant = overlay.width.max(overlay.height) as f64;
            let factor = (*proportion as f64 / 100.0) * base_dominant / overlay_dominant;
            // Bounds are checked on the raw factor; the enlargement limit
            // only applies afterwards.
            validate_watermark_scale(factor, origin.width, origin.height, max_dimension)?;
            Ok(scaled_by(
                origin,
                apply_zoom_limit(factor, plan.limit_enlargement),
            ))
        }
        ScaleDirective::Proportion(proportion) => {
            let factor = apply_zoom_limit(*proportion as f64 / 100.0, plan.limit_enlargement);
            Ok(scaled_by(origin, factor))
        }
        ScaleDirective::Sized(spec) => Ok(resolve_sized(origin, spec, plan.limit_enlargement)),
    }
}

/// Scaled dimensions that cover `target_width` x `target_height` while
/// keeping the origin aspect ratio. Used for fill-mode resizing; the crop
/// rectangle in [`ResolvedGeometry`] is expressed in this scaled space.
pub(crate) fn cover_scaled_dims(
    origin: Dimensions,
    target_width: u32,
    target_height: u32,
) -> (u32, u32) {
    let scale = (target_width as f64 / origin.width as f64)
        .max(target_height as f64 / origin.height as f64);
    let width = ((origin.width as f64 * scale).round() as u32).max(target_width);
    let height = ((origin.height as f64 * scale).round() as u32).max(target_height);
    (width, height)
}

fn apply_zoom_limit(factor: f64, limit_enlargement: bool) -> f64 {
    if limit_enlargement && factor > 1.0 {
        1.0
    } else {
        factor
    }
}

fn scaled_by(origin: Dimensions, factor: f64) -> ResolvedGeometry {
    let width = ((origin.width as f64 * factor).round() as u32).max(1);
    let height = ((origin.height as f64 * factor).round() as u32).max(1);
    ResolvedGeometry {
        scale_factor: Some(factor),
        ..ResolvedGeometry::plain(width, height)
    }
}

fn resolve_sized(origin: Dimensions, spec: &BoxSpec, limit_enlargement: bool) -> ResolvedGeometry {
    let (box_w, box_h) = normalize_box(origin, spec);
    if box_w == 0 && box_h == 0 {
        return ResolvedGeometry::plain(origin.width, origin.height);
    }

    match spec.mode {
        ResizeMode::Lfit | ResizeMode::Mfit => {
            let (mut width, mut height) = fit_dimensions(origin, box_w, box_h, spec.mode);
            if limit_enlargement {
                width = width.min(origin.width);
                height = height.min(origin.height);
            }
            ResolvedGeometry::plain(width, height)
        }
        ResizeMode::Fixed => {
            let (width, height) = clamp_box(origin, box_w, box_h, limit_enlargement);
            ResolvedGeometry {
                force_exact: true,
                ..ResolvedGeometry::plain(width, height)
            }
        }
        ResizeMode::Pad => {
            let (width, height) = clamp_box(origin, box_w, box_h, limit_enlargement);
            ResolvedGeometry {
                pad_to_canvas: true,
                ..ResolvedGeometry::plain(width, height)
            }
        }
        ResizeMode::Fill => {
            let (width, height) = clamp_box(origin, box_w, box_h, limit_enlargement);
            let (scaled_w, scaled_h) = cover_scaled_dims(origin, width, height);
            ResolvedGeometry {
                crop: Some(CropRect {
                    x: (scaled_w - width) / 2,
                    y: (scaled_h - height) / 2,
                    width,
                    height,
                }),
                ..ResolvedGeometry::plain(width, height)
            }
        }
    }
}

/// Map a box request onto concrete width/height fields. Long/short edges
/// only apply when neither width nor height was given, and attach to the
/// origin's orientation. A single missing edge is derived from the origin
/// aspect ratio.
fn normalize_box(origin: Dimensions, spec: &BoxSpec) -> (u32, u32) {
    let (box_w, box_h) = if spec.width > 0 || spec.height > 0 {
        (spec.width, spec.height)
    } else if origin.width >= origin.height {
        (spec.long, spec.short)
    } else {
        (spec.short, spec.long)
    };

    let (ow, oh) = (origin.width as u64, origin.height as u64);
    match (box_w, box_h) {
        (0, 0) => (0, 0),
        (0, h) => (((h as u64 * ow / oh) as u32).max(1), h),
        (w, 0) => (w, ((w as u64 * oh / ow) as u32).max(1)),
        both => both,
    }
}

/// The lfit/mfit core. Exactly one edge of the box is recomputed from the
/// origin ratio; which one depends on how the origin ratio compares to the
/// box ratio, and mfit flips the comparison so the result covers the box
/// instead of fitting inside it. Comparisons use cross products to stay in
/// integers.
fn fit_dimensions(origin: Dimensions, box_w: u32, box_h: u32, mode: ResizeMode) -> (u32, u32) {
    let (ow, oh) = (origin.width as u64, origin.height as u64);
    let (bw, bh) = (box_w as u64, box_h as u64);
    let recompute_height = match mode {
        ResizeMode::Lfit => ow * bh > bw * oh,
        _ => ow * bh < bw * oh,
    };
    if recompute_height {
        (box_w, ((bw * oh / ow) as u32).max(1))
    } else {
        (((bh * ow / oh) as u32).max(1), box_h)
    }
}

fn clamp_box(origin: Dimensions, box_w: u32, box_h: u32, limit_enlargement: bool) -> (u32, u32) {
    if limit_enlargement {
        (box_w.min(origin.width), box_h.min(origin.height))
    } else {
        (box_w, box_h)
    }
}
