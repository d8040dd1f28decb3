//! Entry-point guards.
//!
//! These run between decode and geometry resolution, so every expensive
//! pixel operation works on dimensions that already passed the bounds here.

use crate::error::TransformError;
use crate::transform::plan::{WatermarkMask, WatermarkPlan};

/// Reject origins with a zero edge or an edge beyond `max_dimension`.
pub fn validate_origin_dimensions(
    width: u32,
    height: u32,
    max_dimension: u32,
) -> Result<(), TransformError> {
    if width == 0 || height == 0 {
        return Err(TransformError::DimensionIsZero);
    }
    if width > max_dimension || height > max_dimension {
        return Err(TransformError::DimensionTooLong);
    }
    Ok(())
}

/// Reject watermark-relative scale factors that cannot produce output.
///
/// The factor applies to the base image, so the check is that the scaled
/// base stays within `max_dimension` and the factor itself is a usable
/// positive number.
pub fn validate_watermark_scale(
    factor: f64,
    origin_width: u32,
    origin_height: u32,
    max_dimension: u32,
) -> Result<(), TransformError> {
    if !factor.is_finite() || factor <= 0.0 {
        return Err(TransformError::WatermarkCannotProcess);
    }
    let max = max_dimension as f64;
    if origin_width as f64 * factor > max || origin_height as f64 * factor > max {
        return Err(TransformError::WatermarkCannotProcess);
    }
    Ok(())
}

/// Reject watermark plans whose payload is empty.
///
/// The mask type guarantees exactly one payload kind is present; what is
/// left to check is that the payload actually carries content.
pub fn validate_watermark_plan(plan: &WatermarkPlan) -> Result<(), TransformError> {
    match &plan.mask {
        WatermarkMask::Picture(mask) if mask.data.is_empty() => {
            Err(TransformError::InvalidWatermarkProcess)
        }
        WatermarkMask::Text(mask) if mask.text.trim().is_empty() => {
            Err(TransformError::InvalidWatermarkProcess)
        }
        _ => Ok(()),
    }
}
