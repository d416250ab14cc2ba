// ============================================================
// Layer 4 — Data Pipeline Errors
// ============================================================
// Every failure the label store, transform pipeline, dataset
// and splitter can raise. None of them are retried or skipped:
// a skipped frame would silently shift label alignment, so the
// error travels up to the training loop and aborts the run.
//
// Reference: thiserror crate documentation
//            Rust Book §9 (Error Handling)

use std::path::PathBuf;
use thiserror::Error;

pub type DataResult<T> = Result<T, DataError>;

#[derive(Debug, Error)]
pub enum DataError {
    /// The record file is missing a required column or has an
    /// unparseable steering value.
    #[error("malformed record file {path}: {msg}")]
    MalformedRecord { path: PathBuf, msg: String },

    #[error("cannot read record file {path}: {source}")]
    RecordRead {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// A referenced frame is missing or cannot be decoded.
    #[error("cannot load image {path}: {source}")]
    ImageLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("sample index {index} out of range for dataset of {len} samples")]
    IndexOutOfRange { index: usize, len: usize },

    /// Crop margins leave no pixels in the frame.
    #[error(
        "crop (top={top}, bottom={bottom}, left={left}, right={right}) \
         leaves nothing of {path} ({width}x{height})"
    )]
    InvalidCrop {
        path:   PathBuf,
        top:    u32,
        bottom: u32,
        left:   u32,
        right:  u32,
        width:  u32,
        height: u32,
    },

    #[error("resize target {height}x{width} must be non-zero")]
    InvalidResize { height: u32, width: u32 },

    #[error("invalid split: {0}")]
    InvalidSplit(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
