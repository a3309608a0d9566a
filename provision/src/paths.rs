//! Canonical artifact locations and store defaults.
//!
//! Consumers load whichever canonical file is present; choosing between
//! the two when both exist is the consuming application's policy.

/// Directory downstream inference code reads models from.
pub const MODELS_DIR: &str = "public/models";

/// Canonical filename of the synthesized random-projection encoder.
pub const SYNTH_FILENAME: &str = "speaker_encoder.onnx";

/// Canonical filename of the fetched pretrained model.
pub const PRETRAINED_FILENAME: &str = "pyannote_embedding.onnx";

/// Default artifact collection (Hugging Face repo id).
pub const DEFAULT_COLLECTION: &str = "deepghs/pyannote-embedding-onnx";

/// Default artifact name within the collection.
pub const DEFAULT_ARTIFACT: &str = "model.onnx";
