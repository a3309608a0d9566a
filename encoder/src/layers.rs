//! Numeric layers of the encoder stack.
//!
//! Feature maps are flat `f32` buffers in channel-major layout:
//! channel `c` occupies `[c * len .. (c + 1) * len]`. Accumulation runs
//! in f64, matching the precision discipline of the fbank pipeline.

use crate::init::InitContext;

/// 1-D convolution with zero padding.
pub struct Conv1d {
    pub in_channels: usize,
    pub out_channels: usize,
    pub kernel: usize,
    pub stride: usize,
    pub padding: usize,
    /// `[out_channels * in_channels * kernel]`, row-major.
    pub weight: Vec<f32>,
    pub bias: Vec<f32>,
}

impl Conv1d {
    /// Initializes weight and bias from the context: first the weight
    /// tensor, then the bias, both `U(-1/sqrt(fan_in), 1/sqrt(fan_in))`
    /// with `fan_in = in_channels * kernel`.
    pub fn init(
        in_channels: usize,
        out_channels: usize,
        kernel: usize,
        stride: usize,
        padding: usize,
        ctx: &mut InitContext,
    ) -> Self {
        let fan_in = in_channels * kernel;
        let weight = ctx.uniform_fan_in(out_channels * in_channels * kernel, fan_in);
        let bias = ctx.uniform_fan_in(out_channels, fan_in);
        Self {
            in_channels,
            out_channels,
            kernel,
            stride,
            padding,
            weight,
            bias,
        }
    }

    /// Output length for the given input length; 0 if the padded input
    /// is shorter than the kernel.
    pub fn output_len(&self, input_len: usize) -> usize {
        let padded = input_len + 2 * self.padding;
        if padded < self.kernel {
            return 0;
        }
        (padded - self.kernel) / self.stride + 1
    }

    /// Applies the convolution to `[in_channels * len]` input, returning
    /// `[out_channels * output_len]`.
    pub fn forward(&self, input: &[f32], len: usize) -> Vec<f32> {
        let out_len = self.output_len(len);
        let mut out = vec![0.0f32; self.out_channels * out_len];

        for co in 0..self.out_channels {
            for t in 0..out_len {
                let mut acc = self.bias[co] as f64;
                for ci in 0..self.in_channels {
                    let w_base = (co * self.in_channels + ci) * self.kernel;
                    let x_base = ci * len;
                    for k in 0..self.kernel {
                        // Position in the unpadded input; skip the zero pad.
                        let pos = (t * self.stride + k) as isize - self.padding as isize;
                        if pos >= 0 && (pos as usize) < len {
                            acc += self.weight[w_base + k] as f64
                                * input[x_base + pos as usize] as f64;
                        }
                    }
                }
                out[co * out_len + t] = acc as f32;
            }
        }
        out
    }
}

/// 1-D batch normalization over channels.
///
/// Always applies running statistics (evaluation mode); this system has
/// no training mode. Untrained parameters are the identity transform:
/// scale 1, shift 0, mean 0, variance 1.
pub struct BatchNorm1d {
    pub channels: usize,
    pub scale: Vec<f32>,
    pub shift: Vec<f32>,
    pub running_mean: Vec<f32>,
    pub running_var: Vec<f32>,
    pub epsilon: f32,
}

impl BatchNorm1d {
    pub fn identity(channels: usize) -> Self {
        Self {
            channels,
            scale: vec![1.0; channels],
            shift: vec![0.0; channels],
            running_mean: vec![0.0; channels],
            running_var: vec![1.0; channels],
            epsilon: 1e-5,
        }
    }

    /// Normalizes `[channels * len]` in place using running statistics.
    pub fn forward(&self, x: &mut [f32], len: usize) {
        for c in 0..self.channels {
            let inv_std = 1.0 / ((self.running_var[c] as f64 + self.epsilon as f64).sqrt());
            let mean = self.running_mean[c] as f64;
            let scale = self.scale[c] as f64;
            let shift = self.shift[c] as f64;
            for v in &mut x[c * len..(c + 1) * len] {
                *v = ((*v as f64 - mean) * inv_std * scale + shift) as f32;
            }
        }
    }
}

/// Fully-connected projection.
pub struct Linear {
    pub in_features: usize,
    pub out_features: usize,
    /// `[out_features * in_features]`, row-major.
    pub weight: Vec<f32>,
    pub bias: Vec<f32>,
}

impl Linear {
    /// Weight tensor first, then bias, both `U(-1/sqrt(in_features), ..)`.
    pub fn init(in_features: usize, out_features: usize, ctx: &mut InitContext) -> Self {
        let weight = ctx.uniform_fan_in(out_features * in_features, in_features);
        let bias = ctx.uniform_fan_in(out_features, in_features);
        Self {
            in_features,
            out_features,
            weight,
            bias,
        }
    }

    pub fn forward(&self, x: &[f32]) -> Vec<f32> {
        let mut out = vec![0.0f32; self.out_features];
        for (j, o) in out.iter_mut().enumerate() {
            let mut acc = self.bias[j] as f64;
            let row = &self.weight[j * self.in_features..(j + 1) * self.in_features];
            for (w, v) in row.iter().zip(x.iter()) {
                acc += *w as f64 * *v as f64;
            }
            *o = acc as f32;
        }
        out
    }
}

/// ReLU in place.
pub fn relu(x: &mut [f32]) {
    for v in x.iter_mut() {
        if *v < 0.0 {
            *v = 0.0;
        }
    }
}

/// Non-overlapping max pool (window == stride, no padding) over
/// `[channels * len]`. Returns the pooled buffer and the new length.
pub fn max_pool1d(x: &[f32], channels: usize, len: usize, window: usize) -> (Vec<f32>, usize) {
    let out_len = len / window;
    let mut out = vec![0.0f32; channels * out_len];
    for c in 0..channels {
        for t in 0..out_len {
            let seg = &x[c * len + t * window..c * len + (t + 1) * window];
            let mut m = seg[0];
            for &v in &seg[1..] {
                if v > m {
                    m = v;
                }
            }
            out[c * out_len + t] = m;
        }
    }
    (out, out_len)
}

/// Mean over the time axis, collapsing `[channels * len]` to `[channels]`.
pub fn global_avg_pool(x: &[f32], channels: usize, len: usize) -> Vec<f32> {
    let mut out = vec![0.0f32; channels];
    for (c, o) in out.iter_mut().enumerate() {
        let mut acc = 0.0f64;
        for &v in &x[c * len..(c + 1) * len] {
            acc += v as f64;
        }
        *o = (acc / len as f64) as f32;
    }
    out
}
