//! Error types for vellum.

use thiserror::Error;

/// Terminal state of a device. Once a device reports one of these it ignores
/// every further call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DeviceError {
    #[error("device is closed")]
    Closed,

    #[error("pop_clip without a matching clip")]
    ClipUnderflow,

    #[error("raster error: {0}")]
    Raster(String),

    #[error("ocr error: {0}")]
    Ocr(String),
}

/// Primary error type.
#[derive(Error, Debug)]
pub enum VellumError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("device error: {0}")]
    Device(#[from] DeviceError),

    #[error("ocr error: {0}")]
    Ocr(String),

    #[error("invalid raster size {width}x{height}")]
    InvalidRaster { width: u32, height: u32 },

    #[error("encode error: {0}")]
    Encode(String),
}

/// Convenience Result type alias for VellumError.
pub type Result<T> = std::result::Result<T, VellumError>;
