//! Deterministic speaker-encoder architecture.
//!
//! # Architecture
//!
//! [`SpeakerEncoder::encode`] maps a batch of raw 16kHz waveforms to
//! L2-normalized embedding vectors through three conv stages and a
//! projection:
//!
//! ```text
//! (batch, samples)
//!   -> Conv1d 1->32, k=80, s=4, p=38 -> BatchNorm -> ReLU -> MaxPool 4
//!   -> Conv1d 32->64, k=3, s=1, p=1  -> BatchNorm -> ReLU -> MaxPool 4
//!   -> Conv1d 64->128, k=3, s=1, p=1 -> BatchNorm -> ReLU -> global avg pool
//!   -> Linear 128->128 -> L2 normalize
//! (batch, 128)
//! ```
//!
//! The global average pool collapses the time axis, so any input at or
//! above the 64-sample receptive field produces a 128-dim embedding.
//!
//! # Determinism
//!
//! No training occurs; the model is a fixed random projection. All weights
//! draw from a single seeded [`InitContext`] stream in a fixed layer order,
//! so two constructions with the same seed are bit-identical.

mod encoder;
mod error;
mod init;
mod layers;

pub use encoder::{
    l2_normalize, EncoderConfig, SpeakerEncoder, EMBEDDING_DIM, MIN_INPUT_SAMPLES, SAMPLE_RATE,
};
pub use error::EncoderError;
pub use init::{InitContext, DEFAULT_SEED};
pub use layers::{BatchNorm1d, Conv1d, Linear};
