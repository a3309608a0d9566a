//! Remote artifact store access.

use std::io;
use std::path::{Path, PathBuf};

use hf_hub::api::sync::Api;
use tempfile::NamedTempFile;
use tracing::info;

use crate::error::ProvisionError;

/// Read-only fetch-by-(collection, name) capability.
///
/// Implementations download the named artifact into `dest_dir` under the
/// store's natural filename and return the downloaded path. No retries;
/// failures propagate.
pub trait ArtifactStore {
    fn fetch(&self, collection: &str, name: &str, dest_dir: &Path)
        -> Result<PathBuf, ProvisionError>;
}

/// [`ArtifactStore`] backed by the Hugging Face Hub.
///
/// The hub client downloads into its own cache; the cached file is then
/// copied into `dest_dir` through a temp file and renamed, so a failed
/// copy leaves nothing behind.
#[derive(Default)]
pub struct HubStore;

impl HubStore {
    pub fn new() -> Self {
        Self
    }
}

impl ArtifactStore for HubStore {
    fn fetch(
        &self,
        collection: &str,
        name: &str,
        dest_dir: &Path,
    ) -> Result<PathBuf, ProvisionError> {
        let fetch_err = |reason: String| ProvisionError::Fetch {
            collection: collection.to_string(),
            name: name.to_string(),
            reason,
        };

        info!(collection, name, "fetching artifact from hub");
        let api = Api::new().map_err(|e| fetch_err(e.to_string()))?;
        let repo = api.model(collection.to_string());
        let cached = repo.get(name).map_err(|e| fetch_err(e.to_string()))?;

        let dest = dest_dir.join(name);
        copy_atomic(&cached, &dest).map_err(|e| fetch_err(e.to_string()))?;
        Ok(dest)
    }
}

fn copy_atomic(from: &Path, to: &Path) -> io::Result<()> {
    let dir = to.parent().unwrap_or_else(|| Path::new("."));
    let tmp = NamedTempFile::new_in(dir)?;
    std::fs::copy(from, tmp.path())?;
    tmp.persist(to).map_err(|e| e.error)?;
    Ok(())
}
