//! Minimal ONNX metadata reader.
//!
//! Parses just enough of a serialized `ModelProto` to verify the
//! export/shape contract: IR and opset versions, producer, and the
//! declared graph inputs/outputs with their dynamic-axis markers.
//! Unknown fields are skipped, so artifacts produced by other exporters
//! (e.g. a fetched pretrained model) can be inspected too.

use crate::error::OnnxError;
use crate::wire::{ProtoReader, WireValue};

/// One declared dimension of a graph tensor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dim {
    /// Fixed size known at export time.
    Fixed(i64),
    /// Dynamic axis, named by its dim param (e.g. "batch_size").
    Param(String),
}

/// Declared graph input or output tensor.
#[derive(Debug, Clone)]
pub struct TensorInfo {
    pub name: String,
    /// TensorProto.DataType (1 = float).
    pub elem_type: i64,
    pub dims: Vec<Dim>,
}

/// Metadata of a serialized ONNX model.
#[derive(Debug, Clone)]
pub struct ModelInfo {
    pub ir_version: i64,
    pub opset_version: i64,
    pub producer_name: String,
    pub graph_name: String,
    pub inputs: Vec<TensorInfo>,
    pub outputs: Vec<TensorInfo>,
    pub node_count: usize,
    pub initializer_count: usize,
}

/// Parses model metadata from serialized `ModelProto` bytes.
pub fn read_model_info(bytes: &[u8]) -> Result<ModelInfo, OnnxError> {
    if bytes.is_empty() {
        return Err(OnnxError::EmptyData);
    }

    let mut info = ModelInfo {
        ir_version: 0,
        opset_version: 0,
        producer_name: String::new(),
        graph_name: String::new(),
        inputs: Vec::new(),
        outputs: Vec::new(),
        node_count: 0,
        initializer_count: 0,
    };

    let mut r = ProtoReader::new(bytes);
    let mut saw_graph = false;
    while let Some((field, value)) = r.next_field()? {
        match (field, value) {
            (1, WireValue::Varint(v)) => info.ir_version = v as i64,
            (2, WireValue::Bytes(b)) => info.producer_name = utf8(b)?,
            (7, WireValue::Bytes(b)) => {
                read_graph(b, &mut info)?;
                saw_graph = true;
            }
            (8, WireValue::Bytes(b)) => {
                // Default-domain opset wins; models here carry one entry.
                let (domain, version) = read_opset(b)?;
                if domain.is_empty() {
                    info.opset_version = version;
                }
            }
            _ => {}
        }
    }

    if !saw_graph {
        return Err(OnnxError::Malformed("model has no graph".into()));
    }
    Ok(info)
}

fn read_opset(bytes: &[u8]) -> Result<(String, i64), OnnxError> {
    let mut domain = String::new();
    let mut version = 0i64;
    let mut r = ProtoReader::new(bytes);
    while let Some((field, value)) = r.next_field()? {
        match (field, value) {
            (1, WireValue::Bytes(b)) => domain = utf8(b)?,
            (2, WireValue::Varint(v)) => version = v as i64,
            _ => {}
        }
    }
    Ok((domain, version))
}

fn read_graph(bytes: &[u8], info: &mut ModelInfo) -> Result<(), OnnxError> {
    let mut r = ProtoReader::new(bytes);
    while let Some((field, value)) = r.next_field()? {
        match (field, value) {
            (1, WireValue::Bytes(_)) => info.node_count += 1,
            (2, WireValue::Bytes(b)) => info.graph_name = utf8(b)?,
            (5, WireValue::Bytes(_)) => info.initializer_count += 1,
            (11, WireValue::Bytes(b)) => info.inputs.push(read_value_info(b)?),
            (12, WireValue::Bytes(b)) => info.outputs.push(read_value_info(b)?),
            _ => {}
        }
    }
    Ok(())
}

fn read_value_info(bytes: &[u8]) -> Result<TensorInfo, OnnxError> {
    let mut out = TensorInfo {
        name: String::new(),
        elem_type: 0,
        dims: Vec::new(),
    };
    let mut r = ProtoReader::new(bytes);
    while let Some((field, value)) = r.next_field()? {
        match (field, value) {
            (1, WireValue::Bytes(b)) => out.name = utf8(b)?,
            (2, WireValue::Bytes(type_proto)) => {
                let mut tr = ProtoReader::new(type_proto);
                while let Some((field, value)) = tr.next_field()? {
                    if let (1, WireValue::Bytes(tensor_type)) = (field, value) {
                        read_tensor_type(tensor_type, &mut out)?;
                    }
                }
            }
            _ => {}
        }
    }
    Ok(out)
}

fn read_tensor_type(bytes: &[u8], out: &mut TensorInfo) -> Result<(), OnnxError> {
    let mut r = ProtoReader::new(bytes);
    while let Some((field, value)) = r.next_field()? {
        match (field, value) {
            (1, WireValue::Varint(v)) => out.elem_type = v as i64,
            (2, WireValue::Bytes(shape)) => {
                let mut sr = ProtoReader::new(shape);
                while let Some((field, value)) = sr.next_field()? {
                    if let (1, WireValue::Bytes(dim)) = (field, value) {
                        out.dims.push(read_dim(dim)?);
                    }
                }
            }
            _ => {}
        }
    }
    Ok(())
}

fn read_dim(bytes: &[u8]) -> Result<Dim, OnnxError> {
    let mut r = ProtoReader::new(bytes);
    let mut dim = Dim::Fixed(0);
    while let Some((field, value)) = r.next_field()? {
        match (field, value) {
            (1, WireValue::Varint(v)) => dim = Dim::Fixed(v as i64),
            (2, WireValue::Bytes(b)) => dim = Dim::Param(utf8(b)?),
            _ => {}
        }
    }
    Ok(dim)
}

fn utf8(b: &[u8]) -> Result<String, OnnxError> {
    String::from_utf8(b.to_vec()).map_err(|_| OnnxError::Malformed("invalid utf-8 string".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::build_model;
    use voxprep_encoder::{EncoderConfig, SpeakerEncoder};

    #[test]
    fn reads_back_exported_metadata() {
        let bytes = build_model(&SpeakerEncoder::new(&EncoderConfig::default()));
        let info = read_model_info(&bytes).unwrap();

        assert_eq!(info.ir_version, 7);
        assert_eq!(info.opset_version, 12);
        assert_eq!(info.producer_name, "voxprep");
        assert_eq!(info.graph_name, "speaker_encoder");

        assert_eq!(info.inputs.len(), 1);
        let input = &info.inputs[0];
        assert_eq!(input.name, "input");
        assert_eq!(input.elem_type, 1);
        assert_eq!(
            input.dims,
            vec![
                Dim::Param("batch_size".into()),
                Dim::Param("sequence_length".into())
            ]
        );

        assert_eq!(info.outputs.len(), 1);
        let output = &info.outputs[0];
        assert_eq!(output.name, "output");
        assert_eq!(output.dims, vec![Dim::Param("batch_size".into()), Dim::Fixed(128)]);

        // 3 convs + 3 bns + 3 relus + 3 pools + unsqueeze/squeeze + gemm
        // + reducel2/clip/div = 18 nodes.
        assert_eq!(info.node_count, 18);
        // 4 per bn * 3 + 2 per conv * 3 + fc pair + norm floor = 21.
        assert_eq!(info.initializer_count, 21);
    }

    #[test]
    fn empty_data_rejected() {
        assert!(matches!(read_model_info(&[]), Err(OnnxError::EmptyData)));
    }

    #[test]
    fn graphless_model_rejected() {
        // Just an ir_version field, no graph.
        let bytes = [0x08, 0x07];
        assert!(read_model_info(&bytes).is_err());
    }

    #[test]
    fn truncated_model_rejected() {
        let mut bytes = build_model(&SpeakerEncoder::new(&EncoderConfig::default()));
        bytes.truncate(bytes.len() / 2);
        assert!(read_model_info(&bytes).is_err());
    }
}
