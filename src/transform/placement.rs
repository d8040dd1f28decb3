//! Watermark placement.
//!
//! Maps an anchor plus margins onto the top-left pixel of the overlay
//! within the base image. Coordinates are signed: an overlay larger than
//! the base resolves to a negative corner and the compositor clips it.

use crate::transform::plan::{Anchor, WatermarkPlan};
use crate::transform::Dimensions;

/// Top-left corner of the overlay, in base-image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedPlacement {
    pub x: i32,
    pub y: i32,
}

/// Resolve the overlay position for a watermark plan.
///
/// Margins push inward from the anchored edge. The vertical offset only
/// applies to the middle row (west, center, east); the top and bottom rows
/// ignore it. Anchor tokens that did not match any known position land in
/// [`Anchor::Unrecognized`] and place like south-east.
pub fn resolve_placement(
    plan: &WatermarkPlan,
    base: Dimensions,
    overlay: Dimensions,
) -> ResolvedPlacement {
    let base_w = base.width as i32;
    let base_h = base.height as i32;
    let overlay_w = overlay.width as i32;
    let overlay_h = overlay.height as i32;
    let x_margin = plan.x_margin as i32;
    let y_margin = plan.y_margin as i32;

    let left = x_margin;
    let center_x = (base_w - overlay_w) / 2;
    let right = base_w - x_margin - overlay_w;
    let top = y_margin;
    let middle_y = (base_h - overlay_h) / 2 - plan.voffset;
    let bottom = base_h - y_margin - overlay_h;

    let (x, y) = match plan.position {
        Anchor::NorthWest => (left, top),
        Anchor::North => (center_x, top),
        Anchor::NorthEast => (right, top),
        Anchor::West => (left, middle_y),
        Anchor::Center => (center_x, middle_y),
        Anchor::East => (right, middle_y),
        Anchor::SouthWest => (left, bottom),
        Anchor::South => (center_x, bottom),
        Anchor::SouthEast | Anchor::Unrecognized => (right, bottom),
    };
    ResolvedPlacement { x, y }
}
