//! Raster backend failures.
//!
//! These carry the detail an operator needs in logs. The request-level
//! taxonomy wraps them without leaking any of this text to callers.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the raster primitives.
#[derive(Debug, Error)]
pub enum RasterError {
    #[error("failed to decode image: {0}")]
    Decode(String),

    #[error("failed to encode {format} output: {message}")]
    Encode {
        format: &'static str,
        message: String,
    },

    #[error("failed to resize to {width}x{height}: {message}")]
    Resize {
        width: u32,
        height: u32,
        message: String,
    },

    #[error("crop rectangle ({x},{y}) {width}x{height} exceeds image bounds")]
    CropOutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },

    #[error("invalid color value: {0}")]
    Color(String),

    #[error("font file {path:?} could not be read")]
    FontUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("font file {path:?} is not a usable font")]
    FontData { path: PathBuf },

    #[error("text rendering failed: {0}")]
    Render(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_context() {
        let err = RasterError::Resize {
            width: 800,
            height: 600,
            message: "buffer allocation failed".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "failed to resize to 800x600: buffer allocation failed"
        );

        let err = RasterError::CropOutOfBounds {
            x: 10,
            y: 20,
            width: 500,
            height: 400,
        };
        assert_eq!(
            err.to_string(),
            "crop rectangle (10,20) 500x400 exceeds image bounds"
        );
    }

    #[test]
    fn test_font_unavailable_chains_io_source() {
        use std::error::Error as _;

        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = RasterError::FontUnavailable {
            path: PathBuf::from("/fonts/wqy-zenhei.ttf"),
            source: io,
        };
        assert!(err.to_string().contains("wqy-zenhei.ttf"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RasterError>();
    }
}
