//! ONNX serialization of the speaker encoder.
//!
//! The exported artifact pins opset 12 / IR version 7 and declares two
//! tensors:
//!
//! ```text
//! input:  float [batch_size, sequence_length]   (both dims dynamic)
//! output: float [batch_size, 128]               (batch dim dynamic)
//! ```
//!
//! The graph covers a fixed node vocabulary (Conv, BatchNormalization,
//! Relu, MaxPool, GlobalAveragePool, Squeeze, Unsqueeze, Gemm, ReduceL2,
//! Clip, Div), so the protobuf encoding is written directly against the
//! wire format rather than through generated bindings.
//!
//! [`read_model_info`] parses the metadata back out of an artifact, which
//! lets tests and operators verify shape declarations without loading an
//! inference runtime.

mod error;
mod export;
mod graph;
mod reader;
mod wire;

pub use error::OnnxError;
pub use export::{export_model, ExportReport};
pub use graph::{build_model, OPSET_VERSION};
pub use reader::{read_model_info, Dim, ModelInfo, TensorInfo};
