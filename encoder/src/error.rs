use thiserror::Error;

/// Errors returned by encoder operations.
#[derive(Debug, Error)]
pub enum EncoderError {
    #[error("input too short: need at least {min_samples} samples, got {got_samples}")]
    InputTooShort {
        min_samples: usize,
        got_samples: usize,
    },

    #[error("empty batch")]
    EmptyBatch,
}
