use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::info;

use voxprep_encoder::SpeakerEncoder;

use crate::error::OnnxError;
use crate::graph::build_model;

/// Outcome of a successful export.
#[derive(Debug, Clone)]
pub struct ExportReport {
    pub path: PathBuf,
    pub size_bytes: u64,
}

/// Serializes the encoder to an ONNX artifact at `path`.
///
/// The example input is encoded first; an example below the encoder's
/// receptive field aborts before anything touches the filesystem. The
/// artifact is written to a temp file in the destination directory and
/// renamed into place, so a failed export leaves nothing at `path`.
pub fn export_model(
    enc: &SpeakerEncoder,
    example: &[f32],
    path: &Path,
) -> Result<ExportReport, OnnxError> {
    // Shape check: the example must survive the conv/pool stack.
    enc.encode_one(example)?;

    let bytes = build_model(enc);

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir).map_err(|source| OnnxError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let write_err = |source: std::io::Error| OnnxError::Write {
        path: path.to_path_buf(),
        source,
    };
    let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(&bytes).map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;

    let size_bytes = bytes.len() as u64;
    info!(path = %path.display(), size_bytes, "exported speaker encoder");
    Ok(ExportReport {
        path: path.to_path_buf(),
        size_bytes,
    })
}
