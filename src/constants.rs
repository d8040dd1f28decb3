// Constants module - centralized default values for configuration
//
// This module defines all default values used throughout the codebase.
// Using constants instead of magic numbers improves maintainability
// and makes it easier to understand and modify defaults.

// =============================================================================
// Dimension defaults
// =============================================================================

/// Default maximum edge length for any processed image
pub const DEFAULT_MAX_DIMENSION: u32 = 4096;

/// Default JPEG/WebP encode quality
pub const DEFAULT_ENCODE_QUALITY: u8 = 90;

/// Default background color for pad and rotate canvases
pub const DEFAULT_BACKGROUND: &str = "white";

/// Enlargement guard is on unless a plan switches it off
pub const DEFAULT_LIMIT_ENLARGEMENT: bool = true;

// =============================================================================
// Watermark defaults
// =============================================================================

/// Default overlay opacity in percent (fully opaque)
pub const DEFAULT_TRANSPARENCY: u8 = 100;

/// Default horizontal and vertical margin in pixels
pub const DEFAULT_MARGIN: u32 = 10;

/// Smallest accepted vertical offset
pub const MIN_VOFFSET: i32 = -1000;

/// Largest accepted vertical offset
pub const MAX_VOFFSET: i32 = 1000;

/// Largest accepted rotation in degrees
pub const MAX_ROTATE_DEGREES: u16 = 360;

// =============================================================================
// Text watermark defaults
// =============================================================================

/// Default text glyph size in pixels
pub const DEFAULT_TEXT_SIZE: u32 = 40;

/// Largest accepted text glyph size
pub const MAX_TEXT_SIZE: u32 = 1000;

/// Longest accepted text payload in characters
pub const MAX_TEXT_LENGTH: usize = 64;

/// Default text color
pub const DEFAULT_TEXT_COLOR: &str = "#000000";

/// Default directory searched for font files
pub const DEFAULT_FONT_DIR: &str = "/usr/share/fonts/truetype";
