use tracing::debug;

use crate::error::EncoderError;
use crate::init::{InitContext, DEFAULT_SEED};
use crate::layers::{global_avg_pool, max_pool1d, relu, BatchNorm1d, Conv1d, Linear};

/// Embedding dimensionality of the encoder output.
pub const EMBEDDING_DIM: usize = 128;

/// Expected input sample rate in Hz.
pub const SAMPLE_RATE: usize = 16000;

/// Minimum waveform length that survives the conv/pool stack with at
/// least one time step left for the global pool.
pub const MIN_INPUT_SAMPLES: usize = 64;

/// Pool window (and stride) of both max-pool stages.
const POOL_WINDOW: usize = 4;

/// Configures [`SpeakerEncoder`] construction.
#[derive(Debug, Clone)]
pub struct EncoderConfig {
    /// Output embedding dimension (default: 128).
    pub embedding_dim: usize,
    /// Seed for deterministic weight initialization (default: 42).
    pub seed: u64,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            embedding_dim: EMBEDDING_DIM,
            seed: DEFAULT_SEED,
        }
    }
}

/// Fixed random-projection speaker encoder.
///
/// Maps raw 16kHz waveforms to L2-normalized embeddings. The model is
/// untrained; its weights are a reproducible function of the seed, so the
/// encoder stands in for a trained embedding model wherever only the
/// shape contract matters.
///
/// Batch normalization always runs in evaluation mode (running
/// statistics); there is no training path.
pub struct SpeakerEncoder {
    pub conv1: Conv1d,
    pub bn1: BatchNorm1d,
    pub conv2: Conv1d,
    pub bn2: BatchNorm1d,
    pub conv3: Conv1d,
    pub bn3: BatchNorm1d,
    pub fc: Linear,
    embedding_dim: usize,
}

impl SpeakerEncoder {
    /// Constructs the encoder with a context seeded from the config.
    pub fn new(cfg: &EncoderConfig) -> Self {
        let mut ctx = InitContext::seeded(cfg.seed);
        Self::with_init(cfg, &mut ctx)
    }

    /// Constructs the encoder, drawing all weights from `ctx`.
    ///
    /// Draw order is part of the determinism contract: conv1 weight,
    /// conv1 bias, conv2 weight, conv2 bias, conv3 weight, conv3 bias,
    /// fc weight, fc bias. Changing it changes every artifact byte.
    pub fn with_init(cfg: &EncoderConfig, ctx: &mut InitContext) -> Self {
        let conv1 = Conv1d::init(1, 32, 80, 4, 38, ctx);
        let conv2 = Conv1d::init(32, 64, 3, 1, 1, ctx);
        let conv3 = Conv1d::init(64, 128, 3, 1, 1, ctx);
        let fc = Linear::init(128, cfg.embedding_dim, ctx);
        debug!(embedding_dim = cfg.embedding_dim, seed = cfg.seed, "speaker encoder constructed");
        Self {
            conv1,
            bn1: BatchNorm1d::identity(32),
            conv2,
            bn2: BatchNorm1d::identity(64),
            conv3,
            bn3: BatchNorm1d::identity(128),
            fc,
            embedding_dim: cfg.embedding_dim,
        }
    }

    /// Returns the dimensionality of the embedding vectors.
    pub fn dimension(&self) -> usize {
        self.embedding_dim
    }

    /// Time steps remaining after the conv/pool stack for an input of
    /// the given length; 0 means the input is below the receptive field.
    fn time_len(&self, input_len: usize) -> usize {
        let l1 = self.conv1.output_len(input_len);
        let p1 = l1 / POOL_WINDOW;
        let l2 = self.conv2.output_len(p1);
        let p2 = l2 / POOL_WINDOW;
        self.conv3.output_len(p2)
    }

    /// Encodes a batch of waveforms into unit-norm embeddings.
    ///
    /// Every waveform must be at least [`MIN_INPUT_SAMPLES`] long; batch
    /// size and waveform lengths are otherwise unconstrained and may vary
    /// within the batch.
    pub fn encode(&self, batch: &[Vec<f32>]) -> Result<Vec<Vec<f32>>, EncoderError> {
        if batch.is_empty() {
            return Err(EncoderError::EmptyBatch);
        }
        batch.iter().map(|w| self.encode_one(w)).collect()
    }

    /// Encodes a single waveform.
    ///
    /// An exactly-zero embedding row stays the zero vector after
    /// normalization (see [`l2_normalize`]); it never becomes NaN.
    pub fn encode_one(&self, waveform: &[f32]) -> Result<Vec<f32>, EncoderError> {
        if self.time_len(waveform.len()) == 0 {
            return Err(EncoderError::InputTooShort {
                min_samples: MIN_INPUT_SAMPLES,
                got_samples: waveform.len(),
            });
        }

        // Stage 1: wide analysis window over raw samples.
        let mut x = self.conv1.forward(waveform, waveform.len());
        let mut len = self.conv1.output_len(waveform.len());
        self.bn1.forward(&mut x, len);
        relu(&mut x);
        let (mut x, mut l) = max_pool1d(&x, 32, len, POOL_WINDOW);

        // Stage 2.
        x = self.conv2.forward(&x, l);
        len = self.conv2.output_len(l);
        self.bn2.forward(&mut x, len);
        relu(&mut x);
        (x, l) = max_pool1d(&x, 64, len, POOL_WINDOW);

        // Stage 3: collapse the time axis.
        x = self.conv3.forward(&x, l);
        len = self.conv3.output_len(l);
        self.bn3.forward(&mut x, len);
        relu(&mut x);
        let pooled = global_avg_pool(&x, 128, len);

        let mut emb = self.fc.forward(&pooled);
        l2_normalize(&mut emb);
        Ok(emb)
    }
}

/// L2-normalizes a vector to unit length in place.
///
/// An exactly-zero vector is left unchanged rather than divided by zero.
/// Uses f64 intermediate precision.
pub fn l2_normalize(v: &mut [f32]) {
    let mut norm: f64 = 0.0;
    for &x in v.iter() {
        norm += (x as f64) * (x as f64);
    }
    norm = norm.sqrt();
    if norm > 0.0 {
        let scale = (1.0 / norm) as f32;
        for x in v.iter_mut() {
            *x *= scale;
        }
    }
}
