//! Validated descriptions of the work a request asks for.
//!
//! A plan is built by whatever parses the request surface (task strings,
//! query parameters) and handed to the engine. Field ranges are checked by
//! `validate` before any pixels are touched, so the engine can trust a plan
//! that passed.
//!
//! Scaling intent is a sum type: a plan either targets a box, a proportion
//! of the origin, or a proportion tied to a watermark overlay. Exactly one
//! applies, so precedence is decided where the plan is built instead of
//! being re-derived from magic field values downstream.

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use serde::Deserialize;

use crate::backend::FontVariant;
use crate::constants::{
    DEFAULT_MARGIN, DEFAULT_MAX_DIMENSION, DEFAULT_TEXT_COLOR, DEFAULT_TEXT_SIZE,
    DEFAULT_TRANSPARENCY, MAX_ROTATE_DEGREES, MAX_TEXT_LENGTH, MAX_TEXT_SIZE, MAX_VOFFSET,
    MIN_VOFFSET,
};
use crate::error::TransformError;

/// How a target box maps onto the origin image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeMode {
    /// Largest output that fits inside the box, aspect preserved.
    #[default]
    Lfit,
    /// Smallest output that covers the box, aspect preserved.
    Mfit,
    /// Cover the box, then center-crop to it exactly.
    Fill,
    /// Fit inside the box, then pad to the box with the background color.
    Pad,
    /// Exactly the box, aspect ignored.
    Fixed,
}

impl FromStr for ResizeMode {
    type Err = TransformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lfit" => Ok(ResizeMode::Lfit),
            "mfit" => Ok(ResizeMode::Mfit),
            "fill" => Ok(ResizeMode::Fill),
            "pad" => Ok(ResizeMode::Pad),
            "fixed" => Ok(ResizeMode::Fixed),
            _ => Err(TransformError::InvalidMode),
        }
    }
}

/// Grid anchor for overlay placement.
///
/// `Unrecognized` absorbs tokens outside the nine-cell grid; placement
/// treats it exactly like `SouthEast` so sloppy clients degrade instead of
/// failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum Anchor {
    #[serde(rename = "nw")]
    NorthWest,
    #[serde(rename = "north")]
    North,
    #[serde(rename = "ne")]
    NorthEast,
    #[serde(rename = "west")]
    West,
    #[serde(rename = "center")]
    Center,
    #[serde(rename = "east")]
    East,
    #[serde(rename = "sw")]
    SouthWest,
    #[serde(rename = "south")]
    South,
    #[default]
    #[serde(rename = "se")]
    SouthEast,
    #[serde(other)]
    Unrecognized,
}

impl Anchor {
    /// Parse a request token. Anything outside the grid becomes
    /// [`Anchor::Unrecognized`], never an error.
    pub fn from_token(token: &str) -> Self {
        match token {
            "nw" => Anchor::NorthWest,
            "north" => Anchor::North,
            "ne" => Anchor::NorthEast,
            "west" => Anchor::West,
            "center" => Anchor::Center,
            "east" => Anchor::East,
            "sw" => Anchor::SouthWest,
            "south" => Anchor::South,
            "se" => Anchor::SouthEast,
            _ => Anchor::Unrecognized,
        }
    }
}

/// Target box for sized resizes. A zero field means "not given"; geometry
/// derives the missing edges from the origin's aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BoxSpec {
    pub mode: ResizeMode,
    pub width: u32,
    pub height: u32,
    /// Target for the origin's longer edge.
    pub long: u32,
    /// Target for the origin's shorter edge.
    pub short: u32,
}

impl BoxSpec {
    pub fn with_dimensions(mode: ResizeMode, width: u32, height: u32) -> Self {
        BoxSpec {
            mode,
            width,
            height,
            ..BoxSpec::default()
        }
    }
}

/// The one way a resize plan scales the origin.
#[derive(Clone)]
pub enum ScaleDirective {
    /// Scale both edges by `proportion` percent of the origin.
    Proportion(u8),
    /// Scale so a watermark overlay occupies `proportion` percent of the
    /// base image's dominant edge. The overlay bytes ride along because the
    /// factor depends on the overlay's decoded dimensions.
    OverlayProportion { proportion: u8, overlay: Bytes },
    /// Scale into a target box.
    Sized(BoxSpec),
}

impl fmt::Debug for ScaleDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScaleDirective::Proportion(p) => f.debug_tuple("Proportion").field(p).finish(),
            ScaleDirective::OverlayProportion { proportion, overlay } => f
                .debug_struct("OverlayProportion")
                .field("proportion", proportion)
                .field("overlay_len", &overlay.len())
                .finish(),
            ScaleDirective::Sized(spec) => f.debug_tuple("Sized").field(spec).finish(),
        }
    }
}

/// A validated resize request.
#[derive(Debug, Clone)]
pub struct ResizePlan {
    pub directive: ScaleDirective,
    /// Refuse to enlarge past the origin (on by default).
    pub limit_enlargement: bool,
    /// Fill color for `Pad` output.
    pub background: String,
}

impl ResizePlan {
    pub fn sized(spec: BoxSpec) -> Self {
        ResizePlan {
            directive: ScaleDirective::Sized(spec),
            limit_enlargement: crate::constants::DEFAULT_LIMIT_ENLARGEMENT,
            background: crate::constants::DEFAULT_BACKGROUND.to_string(),
        }
    }

    pub fn proportion(proportion: u8) -> Self {
        ResizePlan {
            directive: ScaleDirective::Proportion(proportion),
            ..ResizePlan::sized(BoxSpec::default())
        }
    }

    pub fn overlay_proportion(proportion: u8, overlay: Bytes) -> Self {
        ResizePlan {
            directive: ScaleDirective::OverlayProportion {
                proportion,
                overlay,
            },
            ..ResizePlan::sized(BoxSpec::default())
        }
    }

    pub fn validate(&self) -> Result<(), TransformError> {
        match &self.directive {
            ScaleDirective::Proportion(p)
            | ScaleDirective::OverlayProportion { proportion: p, .. } => {
                if *p == 0 || *p > 100 {
                    return Err(TransformError::InvalidProportion);
                }
            }
            ScaleDirective::Sized(spec) => {
                for dim in [spec.width, spec.height, spec.long, spec.short] {
                    if dim > DEFAULT_MAX_DIMENSION {
                        return Err(TransformError::InvalidParameter);
                    }
                }
            }
        }
        Ok(())
    }
}

/// Sub-rectangle cut out of a decoded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Picture payload of a watermark.
#[derive(Clone)]
pub struct PictureMask {
    pub data: Bytes,
    /// Optional pre-crop applied to the decoded overlay.
    pub crop: Option<CropRect>,
}

impl fmt::Debug for PictureMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PictureMask")
            .field("data_len", &self.data.len())
            .field("crop", &self.crop)
            .finish()
    }
}

/// Text payload of a watermark.
#[derive(Debug, Clone)]
pub struct TextMask {
    pub text: String,
    pub font: FontVariant,
    /// `#RGB`, `#RRGGBB`, or a named color.
    pub color: String,
    pub size: u32,
    /// Shadow opacity in percent; 0 disables it.
    pub shadow: u8,
    /// Paint on an opaque white canvas.
    pub fill_background: bool,
}

/// What a watermark paints. A plan always carries exactly one payload, so
/// there is no "neither picture nor text" state to fall through.
#[derive(Debug, Clone)]
pub enum WatermarkMask {
    Picture(PictureMask),
    Text(TextMask),
}

/// Order of image and text when both watermark kinds are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatermarkOrder {
    #[default]
    ImageFirst,
    TextFirst,
}

/// Cross-axis alignment between combined image and text watermarks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatermarkAlign {
    #[default]
    Top,
    Middle,
    Bottom,
}

/// A validated watermark request.
#[derive(Debug, Clone)]
pub struct WatermarkPlan {
    /// Overlay opacity in percent.
    pub transparency: u8,
    /// Clockwise rotation applied to the overlay before placement.
    pub rotate: u16,
    pub position: Anchor,
    pub x_margin: u32,
    pub y_margin: u32,
    /// Shift for the vertically centered anchors, positive moves up.
    pub voffset: i32,
    pub mask: WatermarkMask,
    pub order: WatermarkOrder,
    pub align: WatermarkAlign,
    /// Spacing between combined image and text watermarks.
    pub interval: u32,
}

impl WatermarkPlan {
    fn with_mask(mask: WatermarkMask) -> Self {
        WatermarkPlan {
            transparency: DEFAULT_TRANSPARENCY,
            rotate: 0,
            position: Anchor::SouthEast,
            x_margin: DEFAULT_MARGIN,
            y_margin: DEFAULT_MARGIN,
            voffset: 0,
            mask,
            order: WatermarkOrder::default(),
            align: WatermarkAlign::default(),
            interval: 0,
        }
    }

    pub fn with_picture(data: Bytes) -> Self {
        Self::with_mask(WatermarkMask::Picture(PictureMask { data, crop: None }))
    }

    pub fn with_text(text: impl Into<String>) -> Self {
        Self::with_mask(WatermarkMask::Text(TextMask {
            text: text.into(),
            font: FontVariant::default(),
            color: DEFAULT_TEXT_COLOR.to_string(),
            size: DEFAULT_TEXT_SIZE,
            shadow: 0,
            fill_background: false,
        }))
    }

    pub fn validate(&self) -> Result<(), TransformError> {
        if self.transparency > 100 {
            return Err(TransformError::InvalidTransparency);
        }
        if self.rotate > MAX_ROTATE_DEGREES {
            return Err(TransformError::InvalidRotate);
        }
        if self.x_margin > DEFAULT_MAX_DIMENSION {
            return Err(TransformError::InvalidXMargin);
        }
        if self.y_margin > DEFAULT_MAX_DIMENSION {
            return Err(TransformError::InvalidYMargin);
        }
        if self.voffset < MIN_VOFFSET || self.voffset > MAX_VOFFSET {
            return Err(TransformError::InvalidVoffset);
        }
        if self.interval > 1000 {
            return Err(TransformError::InvalidParameterFormat);
        }
        if let WatermarkMask::Text(text) = &self.mask {
            if text.text.is_empty() || text.text.chars().count() > MAX_TEXT_LENGTH {
                return Err(TransformError::InvalidText);
            }
            if text.size == 0 || text.size > MAX_TEXT_SIZE {
                return Err(TransformError::InvalidTextSize);
            }
            if text.shadow > 100 {
                return Err(TransformError::InvalidParameterFormat);
            }
        }
        Ok(())
    }
}

/// A validated rotate request.
#[derive(Debug, Clone)]
pub struct RotatePlan {
    /// Clockwise degrees, 0..=360.
    pub degrees: u16,
    /// Fill for the corners the rotated image no longer covers.
    pub background: String,
}

impl RotatePlan {
    pub fn new(degrees: u16) -> Self {
        RotatePlan {
            degrees,
            background: crate::constants::DEFAULT_BACKGROUND.to_string(),
        }
    }

    pub fn validate(&self) -> Result<(), TransformError> {
        if self.degrees > MAX_ROTATE_DEGREES {
            return Err(TransformError::InvalidRotate);
        }
        Ok(())
    }
}
