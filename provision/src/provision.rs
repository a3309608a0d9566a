use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use voxprep_encoder::{EncoderConfig, SpeakerEncoder, SAMPLE_RATE};
use voxprep_onnx::export_model;

use crate::error::ProvisionError;
use crate::paths::{DEFAULT_ARTIFACT, DEFAULT_COLLECTION, PRETRAINED_FILENAME, SYNTH_FILENAME};
use crate::store::{ArtifactStore, HubStore};

/// Canonical example length: 4 seconds at 16kHz.
pub const EXAMPLE_SAMPLES: usize = 4 * SAMPLE_RATE;

/// One of the two provisioning paths. Both terminate with exactly one
/// artifact at the canonical path, or nothing there on failure.
#[derive(Debug, Clone)]
pub enum ProvisionRequest {
    /// Synthesize the deterministic untrained encoder and export it to
    /// [`SYNTH_FILENAME`](crate::SYNTH_FILENAME).
    Synthesize {
        config: EncoderConfig,
        example_samples: usize,
    },
    /// Fetch a trained model from the artifact store and place it at
    /// [`PRETRAINED_FILENAME`](crate::PRETRAINED_FILENAME).
    FetchPretrained { collection: String, name: String },
}

impl ProvisionRequest {
    /// Synthesis with the fixed defaults (seed 42, 4s example).
    pub fn synthesize_default() -> Self {
        Self::Synthesize {
            config: EncoderConfig::default(),
            example_samples: EXAMPLE_SAMPLES,
        }
    }

    /// Fetch from the default collection.
    pub fn fetch_default() -> Self {
        Self::FetchPretrained {
            collection: DEFAULT_COLLECTION.to_string(),
            name: DEFAULT_ARTIFACT.to_string(),
        }
    }
}

/// Confirmation reported after a successful provisioning run.
#[derive(Debug, Clone, Serialize)]
pub struct ProvisionReport {
    pub path: PathBuf,
    pub size_bytes: u64,
}

/// Runs a provisioning request against `models_dir`.
///
/// Fetches go through the Hugging Face Hub; use [`fetch_pretrained`]
/// directly to supply another [`ArtifactStore`].
pub fn provision(
    req: &ProvisionRequest,
    models_dir: &Path,
) -> Result<ProvisionReport, ProvisionError> {
    match req {
        ProvisionRequest::Synthesize {
            config,
            example_samples,
        } => synthesize(config, *example_samples, models_dir),
        ProvisionRequest::FetchPretrained { collection, name } => {
            fetch_pretrained(&HubStore::new(), collection, name, models_dir)
        }
    }
}

/// Synthesizes the seeded encoder and exports it to the canonical path.
pub fn synthesize(
    config: &EncoderConfig,
    example_samples: usize,
    models_dir: &Path,
) -> Result<ProvisionReport, ProvisionError> {
    let encoder = SpeakerEncoder::new(config);
    let example = vec![0.0f32; example_samples];
    let path = models_dir.join(SYNTH_FILENAME);

    let report = export_model(&encoder, &example, &path)?;
    warn_if_both_present(models_dir, PRETRAINED_FILENAME);
    info!(path = %report.path.display(), size_bytes = report.size_bytes, "synthesized model provisioned");
    Ok(ProvisionReport {
        path: report.path,
        size_bytes: report.size_bytes,
    })
}

/// Fetches the named artifact and places it at the canonical path.
///
/// The target directory is created if absent. When the store's natural
/// filename differs from the canonical one, the download is renamed into
/// place; the rename never silently overwrites a canonical file holding
/// different content.
pub fn fetch_pretrained(
    store: &dyn ArtifactStore,
    collection: &str,
    name: &str,
    models_dir: &Path,
) -> Result<ProvisionReport, ProvisionError> {
    std::fs::create_dir_all(models_dir).map_err(|source| ProvisionError::Config {
        path: models_dir.to_path_buf(),
        source,
    })?;

    let downloaded = store.fetch(collection, name, models_dir)?;
    let canonical = models_dir.join(PRETRAINED_FILENAME);

    if downloaded != canonical {
        rename_into_place(&downloaded, &canonical)?;
    }

    let size_bytes = std::fs::metadata(&canonical)
        .map_err(|e| ProvisionError::Rename {
            from: downloaded.clone(),
            to: canonical.clone(),
            reason: e.to_string(),
        })?
        .len();

    warn_if_both_present(models_dir, SYNTH_FILENAME);
    info!(path = %canonical.display(), size_bytes, "pretrained model provisioned");
    Ok(ProvisionReport {
        path: canonical,
        size_bytes,
    })
}

/// Renames the downloaded file onto the canonical path.
///
/// Refuses when the source is missing, and when the canonical path holds
/// content different from the download (an unrelated file would be
/// clobbered). Identical content is replaced, so re-runs succeed.
fn rename_into_place(from: &Path, to: &Path) -> Result<(), ProvisionError> {
    let rename_err = |reason: String| ProvisionError::Rename {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        reason,
    };

    if !from.exists() {
        return Err(rename_err("downloaded file missing".into()));
    }
    if to.exists() && !same_content(from, to).map_err(|e| rename_err(e.to_string()))? {
        return Err(rename_err(
            "canonical path holds different content, refusing to overwrite".into(),
        ));
    }
    std::fs::rename(from, to).map_err(|e| rename_err(e.to_string()))
}

fn same_content(a: &Path, b: &Path) -> std::io::Result<bool> {
    if std::fs::metadata(a)?.len() != std::fs::metadata(b)?.len() {
        return Ok(false);
    }
    Ok(std::fs::read(a)? == std::fs::read(b)?)
}

/// Consumer preference between the two canonical artifacts is the
/// consuming application's policy; make the ambiguity visible when it
/// arises.
fn warn_if_both_present(models_dir: &Path, other: &str) {
    let sibling = models_dir.join(other);
    if sibling.exists() {
        warn!(
            other = %sibling.display(),
            "both canonical artifacts present; consumer selection policy applies"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use voxprep_onnx::{read_model_info, Dim};

    /// In-memory store: writes fixed bytes under a natural filename, or
    /// fails without writing, or lies about the path it wrote.
    struct FakeStore {
        natural_name: String,
        bytes: Vec<u8>,
        fail: bool,
        skip_write: bool,
        calls: RefCell<usize>,
    }

    impl FakeStore {
        fn returning(natural_name: &str, bytes: &[u8]) -> Self {
            Self {
                natural_name: natural_name.to_string(),
                bytes: bytes.to_vec(),
                fail: false,
                skip_write: false,
                calls: RefCell::new(0),
            }
        }

        fn failing() -> Self {
            let mut s = Self::returning("model.onnx", b"");
            s.fail = true;
            s
        }
    }

    impl ArtifactStore for FakeStore {
        fn fetch(
            &self,
            collection: &str,
            name: &str,
            dest_dir: &Path,
        ) -> Result<PathBuf, ProvisionError> {
            *self.calls.borrow_mut() += 1;
            if self.fail {
                return Err(ProvisionError::Fetch {
                    collection: collection.to_string(),
                    name: name.to_string(),
                    reason: "store unreachable".into(),
                });
            }
            let dest = dest_dir.join(&self.natural_name);
            if !self.skip_write {
                std::fs::write(&dest, &self.bytes).unwrap();
            }
            Ok(dest)
        }
    }

    #[test]
    fn fetch_renames_natural_name_into_place() {
        let dir = tempfile::tempdir().unwrap();
        let store = FakeStore::returning("model.onnx", b"pretrained weights");

        let report = fetch_pretrained(&store, "deepghs/x", "model.onnx", dir.path()).unwrap();

        let canonical = dir.path().join(PRETRAINED_FILENAME);
        assert_eq!(report.path, canonical);
        assert_eq!(std::fs::read(&canonical).unwrap(), b"pretrained weights");
        assert_eq!(report.size_bytes, 18);
        // Natural name no longer present.
        assert!(!dir.path().join("model.onnx").exists());
        assert_eq!(*store.calls.borrow(), 1);
    }

    #[test]
    fn fetch_with_canonical_natural_name_skips_rename() {
        let dir = tempfile::tempdir().unwrap();
        let store = FakeStore::returning(PRETRAINED_FILENAME, b"already canonical");

        let report =
            fetch_pretrained(&store, "deepghs/x", PRETRAINED_FILENAME, dir.path()).unwrap();
        assert_eq!(
            std::fs::read(report.path).unwrap(),
            b"already canonical"
        );
    }

    #[test]
    fn fetch_creates_models_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("public").join("models");
        let store = FakeStore::returning("model.onnx", b"x");
        fetch_pretrained(&store, "c", "model.onnx", &nested).unwrap();
        assert!(nested.join(PRETRAINED_FILENAME).exists());
    }

    #[test]
    fn store_failure_leaves_no_canonical_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FakeStore::failing();

        let err = fetch_pretrained(&store, "deepghs/x", "model.onnx", dir.path()).unwrap_err();
        assert!(matches!(err, ProvisionError::Fetch { .. }));
        // Directory was created, canonical path was not.
        assert!(dir.path().exists());
        assert!(!dir.path().join(PRETRAINED_FILENAME).exists());
    }

    #[test]
    fn missing_download_is_rename_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FakeStore::returning("model.onnx", b"x");
        store.skip_write = true;

        let err = fetch_pretrained(&store, "c", "model.onnx", dir.path()).unwrap_err();
        assert!(matches!(err, ProvisionError::Rename { .. }));
        assert!(!dir.path().join(PRETRAINED_FILENAME).exists());
    }

    #[test]
    fn rename_refuses_unrelated_canonical_content() {
        let dir = tempfile::tempdir().unwrap();
        let canonical = dir.path().join(PRETRAINED_FILENAME);
        std::fs::write(&canonical, b"operator's own model").unwrap();

        let store = FakeStore::returning("model.onnx", b"fetched bytes");
        let err = fetch_pretrained(&store, "c", "model.onnx", dir.path()).unwrap_err();
        assert!(matches!(err, ProvisionError::Rename { .. }));
        // The unrelated file is untouched.
        assert_eq!(std::fs::read(&canonical).unwrap(), b"operator's own model");
    }

    #[test]
    fn rerun_with_identical_content_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let store = FakeStore::returning("model.onnx", b"same bytes");

        fetch_pretrained(&store, "c", "model.onnx", dir.path()).unwrap();
        let report = fetch_pretrained(&store, "c", "model.onnx", dir.path()).unwrap();
        assert_eq!(
            std::fs::read(report.path).unwrap(),
            b"same bytes"
        );
    }

    #[test]
    fn synthesize_places_canonical_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let report = synthesize(&EncoderConfig::default(), EXAMPLE_SAMPLES, dir.path()).unwrap();

        let canonical = dir.path().join(SYNTH_FILENAME);
        assert_eq!(report.path, canonical);
        let bytes = std::fs::read(&canonical).unwrap();
        assert_eq!(report.size_bytes, bytes.len() as u64);

        let info = read_model_info(&bytes).unwrap();
        assert_eq!(info.opset_version, 12);
        assert_eq!(
            info.inputs[0].dims,
            vec![
                Dim::Param("batch_size".into()),
                Dim::Param("sequence_length".into())
            ]
        );
    }

    #[test]
    fn synthesize_overwrites_on_rerun() {
        let dir = tempfile::tempdir().unwrap();
        let a = synthesize(&EncoderConfig::default(), EXAMPLE_SAMPLES, dir.path()).unwrap();
        let b = synthesize(&EncoderConfig::default(), EXAMPLE_SAMPLES, dir.path()).unwrap();
        assert_eq!(a.size_bytes, b.size_bytes);
        assert_eq!(
            std::fs::read(&a.path).unwrap(),
            std::fs::read(&b.path).unwrap()
        );
    }

    #[test]
    fn provision_dispatches_synthesize() {
        let dir = tempfile::tempdir().unwrap();
        let report = provision(&ProvisionRequest::synthesize_default(), dir.path()).unwrap();
        assert!(report.path.ends_with(SYNTH_FILENAME));
    }

    #[test]
    fn report_serializes_to_json() {
        let report = ProvisionReport {
            path: PathBuf::from("public/models/speaker_encoder.onnx"),
            size_bytes: 42,
        };
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("speaker_encoder.onnx"));
        assert!(json.contains("42"));
    }
}
