//! Request-level error taxonomy.
//!
//! Every failure a transform entry point can report is a named kind with a
//! stable `(code, message)` pair, so HTTP-facing callers can render responses
//! without interpreting free-form strings. The message strings are part of
//! the wire contract and must not be reworded.

use std::fmt;

use crate::backend::RasterError;

/// Code/message pair returned for kinds that have no table entry.
const UNMAPPED_RESPONSE: (u16, &str) = (400, "No error has found");

/// Message returned by `Display` for kinds that have no table entry.
const UNMAPPED_MESSAGE: &str = "We encountered an internal error, please try again.";

/// Pipeline step recorded when a raster-backend primitive fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Decode,
    Resize,
    Rotate,
    RenderText,
    Composite,
    Encode,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Decode => "decode",
            Stage::Resize => "resize",
            Stage::Rotate => "rotate",
            Stage::RenderText => "render-text",
            Stage::Composite => "composite",
            Stage::Encode => "encode",
        };
        f.write_str(name)
    }
}

/// Errors reported by the transform entry points.
///
/// The unit variants form the closed response taxonomy. `Backend` wraps a
/// raster primitive failure together with the stage that raised it; like
/// `DimensionIsZero` it has no table entry, so both fall back to the generic
/// responses rather than inventing new caller-visible messages.
#[derive(Debug)]
pub enum TransformError {
    // === Request surface ===
    /// Task string could not be parsed into operations
    InvalidTaskString,
    /// Source download answered with a non-200 status
    DownloadFailed,
    /// Request carries no processing directive
    MissingProcessDirective,
    /// Source payload exceeds the accepted size
    EntityTooLarge,
    /// Source bytes are not a decodable image
    UnsupportedMediaType,

    // === Parameters ===
    /// Operation type token is not recognized
    InvalidParameter,
    /// Parameter value is syntactically malformed
    InvalidParameterFormat,
    InvalidTransparency,
    InvalidPosition,
    InvalidXMargin,
    InvalidYMargin,
    InvalidVoffset,
    InvalidText,
    InvalidTextSize,
    InvalidRotate,
    InvalidFill,
    InvalidLimit,
    InvalidMode,
    InvalidProportion,
    InvalidBorder,

    // === Watermark ===
    /// Watermark plan carries neither a usable picture nor text payload
    InvalidWatermarkProcess,
    /// Watermark picture bytes could not be decoded
    InvalidWatermarkPicture,
    /// Watermark-relative scaling left the base image unprocessable
    WatermarkCannotProcess,

    // === Dimensions ===
    /// An origin edge exceeds the configured maximum
    DimensionTooLong,
    /// An origin edge is zero
    DimensionIsZero,

    /// Raster backend primitive failed; `stage` names the pipeline step.
    Backend { stage: Stage, source: RasterError },
}

impl TransformError {
    /// Wrap a backend failure with the stage that raised it.
    pub fn backend(stage: Stage, source: RasterError) -> Self {
        TransformError::Backend { stage, source }
    }

    /// Table entry for this kind, if it has one.
    ///
    /// `DimensionIsZero` and `Backend` deliberately return `None`; callers
    /// observe the same fallback pair the original service produced for
    /// unmapped kinds.
    fn table_entry(&self) -> Option<(u16, &'static str)> {
        match self {
            TransformError::InvalidTaskString => Some((400, "Invalid task string from request.")),
            TransformError::DownloadFailed => Some((401, "Download response code is not 200")),
            TransformError::MissingProcessDirective => {
                Some((402, "Can not parameter x-oss-process."))
            }
            TransformError::InvalidParameter => {
                Some((403, "Invalid parameter: param operation type wrong"))
            }
            TransformError::InvalidParameterFormat => Some((405, "Invalid parameter format.")),
            TransformError::InvalidWatermarkProcess => Some((406, "Invalid watermark parameter.")),
            TransformError::InvalidWatermarkPicture => Some((406, "Invalid watermark picture.")),
            TransformError::DimensionTooLong => Some((407, "Picture Width or Height too long")),
            TransformError::WatermarkCannotProcess => Some((407, "Watermark can not process")),
            TransformError::EntityTooLarge => Some((413, "Picture too large")),
            TransformError::UnsupportedMediaType => Some((415, "Unsupported Media Type")),
            TransformError::InvalidTransparency => {
                Some((403, "Invalid parameter: transparency wrong."))
            }
            TransformError::InvalidPosition => Some((403, "Invalid parameter: position wrong.")),
            TransformError::InvalidXMargin => Some((403, "Invalid parameter: XMargin wrong.")),
            TransformError::InvalidYMargin => Some((403, "Invalid parameter: YMargin wrong.")),
            TransformError::InvalidVoffset => Some((403, "Invalid parameter: voffset wrong.")),
            TransformError::InvalidText => Some((403, "Invalid parameter: text wrong.")),
            TransformError::InvalidTextSize => Some((403, "Invalid parameter: text size wrong.")),
            TransformError::InvalidRotate => Some((403, "Invalid parameter: rotate wrong.")),
            TransformError::InvalidFill => Some((403, "Invalid parameter: fill wrong.")),
            TransformError::InvalidLimit => Some((403, "Invalid parameter: limit wrong.")),
            TransformError::InvalidMode => Some((403, "Invalid parameter: mode wrong.")),
            TransformError::InvalidProportion => {
                Some((403, "Invalid parameter: proportion wrong."))
            }
            TransformError::InvalidBorder => {
                Some((403, "Invalid parameter: params for image border are wrong."))
            }
            TransformError::DimensionIsZero | TransformError::Backend { .. } => None,
        }
    }

    /// The `(code, message)` pair an HTTP-facing caller should render.
    pub fn response(&self) -> (u16, &'static str) {
        self.table_entry().unwrap_or(UNMAPPED_RESPONSE)
    }

    /// The numeric response code alone.
    pub fn code(&self) -> u16 {
        self.response().0
    }
}

impl fmt::Display for TransformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Note the asymmetry with response(): an unmapped kind displays the
        // generic internal-error text, not the unmapped response message.
        match self.table_entry() {
            Some((_, message)) => f.write_str(message),
            None => f.write_str(UNMAPPED_MESSAGE),
        }
    }
}

impl std::error::Error for TransformError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TransformError::Backend { source, .. } => Some(source),
            _ => None,
        }
    }
}
