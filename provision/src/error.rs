use std::path::PathBuf;

use thiserror::Error;

use voxprep_onnx::OnnxError;

/// Errors surfaced by a provisioning run. None are retried internally.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// Target directory cannot be created or written.
    #[error("config: create directory {path}: {source}")]
    Config {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Synthesis/serialization failure.
    #[error("export: {0}")]
    Export(OnnxError),

    /// Remote store unreachable or artifact missing.
    #[error("fetch {collection}/{name}: {reason}")]
    Fetch {
        collection: String,
        name: String,
        reason: String,
    },

    /// Rename-into-place failed: source missing, canonical path occupied
    /// by different content, or the rename itself failed.
    #[error("rename {from} -> {to}: {reason}")]
    Rename {
        from: PathBuf,
        to: PathBuf,
        reason: String,
    },
}

impl From<OnnxError> for ProvisionError {
    fn from(e: OnnxError) -> Self {
        match e {
            // Directory problems are configuration, not export, errors.
            OnnxError::CreateDir { path, source } => ProvisionError::Config { path, source },
            other => ProvisionError::Export(other),
        }
    }
}
