//! Transform planning and orchestration.
//!
//! The flow through this module is plan -> validate -> resolve -> execute:
//!
//! 1. [`plan`] holds the declarative request types ([`ResizePlan`],
//!    [`WatermarkPlan`], [`RotatePlan`]) and their field-level validation.
//! 2. [`validate`] guards decoded dimensions and watermark payloads.
//! 3. [`geometry`] and [`placement`] turn plans into pure, raster-free
//!    decisions ([`ResolvedGeometry`], [`ResolvedPlacement`]).
//! 4. [`processor`] wires those decisions to the raster backend and owns
//!    the shared state (config, font catalog) behind [`TransformEngine`].

pub mod geometry;
pub mod placement;
pub mod plan;
pub mod processor;
pub mod validate;

pub use geometry::ResolvedGeometry;
pub use placement::ResolvedPlacement;
pub use plan::{
    Anchor, BoxSpec, CropRect, PictureMask, ResizeMode, ResizePlan, RotatePlan, ScaleDirective,
    TextMask, WatermarkAlign, WatermarkMask, WatermarkOrder, WatermarkPlan,
};
pub use processor::TransformEngine;

use image::DynamicImage;

/// Pixel dimensions of a decoded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Dimensions { width, height }
    }

    pub fn of(image: &DynamicImage) -> Self {
        Dimensions {
            width: image.width(),
            height: image.height(),
        }
    }
}
