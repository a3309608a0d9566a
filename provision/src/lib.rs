//! Model provisioning: place exactly one speaker-embedding ONNX artifact
//! at the canonical path consumers load from.
//!
//! # Provisioning paths
//!
//! Both paths share one postcondition (artifact at the canonical path,
//! nothing there on failure) and are variants of [`ProvisionRequest`]:
//!
//! 1. [`ProvisionRequest::Synthesize`]: build the deterministic untrained
//!    encoder and export it to `public/models/speaker_encoder.onnx`.
//! 2. [`ProvisionRequest::FetchPretrained`]: download a trained model
//!    from the artifact store and place it at
//!    `public/models/pyannote_embedding.onnx`.
//!
//! Provisioning is an offline, operator-triggered step: single-threaded,
//! run-to-completion, no retries. Concurrent runs against the same
//! canonical path are assumed not to happen; placement is last-writer-wins
//! via atomic rename.
//!
//! Which of the two canonical artifacts a consumer should prefer when
//! both exist is the consuming application's policy; provisioning logs a
//! warning when it leaves both behind.

mod error;
mod paths;
mod provision;
mod store;

pub use error::ProvisionError;
pub use paths::{
    DEFAULT_ARTIFACT, DEFAULT_COLLECTION, MODELS_DIR, PRETRAINED_FILENAME, SYNTH_FILENAME,
};
pub use provision::{
    fetch_pretrained, provision, synthesize, ProvisionReport, ProvisionRequest, EXAMPLE_SAMPLES,
};
pub use store::{ArtifactStore, HubStore};
