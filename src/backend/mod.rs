//! Raster backend: decoding, pixel transforms, text, and encoding.
//!
//! # Features
//!
//! - Format sniffing and decoding for JPEG, PNG, WebP, and GIF payloads
//! - Lanczos3 resizing via SIMD-accelerated convolution
//! - Alpha compositing, rotation with background fill, cropping, padding
//! - Glyph rendering with kerning, shadows, and rotation for text overlays
//! - Re-encoding into the source container format
//!
//! The backend never sees request semantics. It reports [`RasterError`]
//! values and leaves the mapping to caller-visible errors to the transform
//! layer.

pub mod encoder;
pub mod error;
pub mod raster;
pub mod text;

pub use encoder::{EncoderFactory, OutputEncoder, SourceFormat};
pub use error::RasterError;
pub use text::{FontCatalog, FontVariant, TextStyle};
