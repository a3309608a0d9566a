use std::path::PathBuf;

use thiserror::Error;

use voxprep_encoder::EncoderError;

/// Errors returned by ONNX export and inspection.
#[derive(Debug, Error)]
pub enum OnnxError {
    #[error("export: {0}")]
    Export(#[from] EncoderError),

    #[error("create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed model: {0}")]
    Malformed(String),

    #[error("onnx: empty data")]
    EmptyData,
}
