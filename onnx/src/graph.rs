//! Builds the ONNX `ModelProto` for a [`SpeakerEncoder`].
//!
//! Graph layout mirrors the encoder's forward pass. The final L2
//! normalization is ReduceL2 -> Clip -> Div with a 1e-12 floor on the
//! norm, so a zero embedding row divides by the floor and stays the zero
//! vector — the same policy the Rust forward pass pins.

use voxprep_encoder::{BatchNorm1d, Conv1d, SpeakerEncoder};

use crate::wire::ProtoWriter;

/// Operator set pinned for broad runtime compatibility.
pub const OPSET_VERSION: i64 = 12;

/// IR version paired with opset 12.
const IR_VERSION: i64 = 7;

/// TensorProto.DataType FLOAT.
const ELEM_FLOAT: i64 = 1;

/// Floor applied to the embedding norm before division.
const NORM_FLOOR: f32 = 1e-12;

enum DimDecl<'a> {
    Fixed(i64),
    Param(&'a str),
}

/// Serializes the encoder into ONNX `ModelProto` bytes.
pub fn build_model(enc: &SpeakerEncoder) -> Vec<u8> {
    let mut m = ProtoWriter::new();
    m.int64(1, IR_VERSION);
    m.string(2, "voxprep");
    m.string(3, env!("CARGO_PKG_VERSION"));
    m.message(7, |g| graph(g, enc));
    m.message(8, |op| {
        op.string(1, "");
        op.int64(2, OPSET_VERSION);
    });
    m.into_bytes()
}

fn graph(g: &mut ProtoWriter, enc: &SpeakerEncoder) {
    // Nodes, in execution order.
    node(g, "Unsqueeze", "add_channel", &["input"], &["x0"], |n| {
        attr_ints(n, "axes", &[1]);
    });

    conv_node(g, "conv1", &enc.conv1, "x0", "x1");
    bn_node(g, "bn1", &enc.bn1, "x1", "x2");
    node(g, "Relu", "relu1", &["x2"], &["x3"], |_| {});
    node(g, "MaxPool", "pool1", &["x3"], &["x4"], |n| {
        attr_ints(n, "kernel_shape", &[4]);
        attr_ints(n, "strides", &[4]);
    });

    conv_node(g, "conv2", &enc.conv2, "x4", "x5");
    bn_node(g, "bn2", &enc.bn2, "x5", "x6");
    node(g, "Relu", "relu2", &["x6"], &["x7"], |_| {});
    node(g, "MaxPool", "pool2", &["x7"], &["x8"], |n| {
        attr_ints(n, "kernel_shape", &[4]);
        attr_ints(n, "strides", &[4]);
    });

    conv_node(g, "conv3", &enc.conv3, "x8", "x9");
    bn_node(g, "bn3", &enc.bn3, "x9", "x10");
    node(g, "Relu", "relu3", &["x10"], &["x11"], |_| {});
    node(g, "GlobalAveragePool", "pool3", &["x11"], &["x12"], |_| {});
    node(g, "Squeeze", "drop_time", &["x12"], &["x13"], |n| {
        attr_ints(n, "axes", &[2]);
    });

    node(g, "Gemm", "fc", &["x13", "fc.weight", "fc.bias"], &["x14"], |n| {
        attr_int(n, "transB", 1);
    });

    node(g, "ReduceL2", "norm", &["x14"], &["x15"], |n| {
        attr_ints(n, "axes", &[1]);
        attr_int(n, "keepdims", 1);
    });
    node(g, "Clip", "norm_floor", &["x15", "norm.floor"], &["x16"], |_| {});
    node(g, "Div", "normalize", &["x14", "x16"], &["output"], |_| {});

    g.string(2, "speaker_encoder");

    // Initializers.
    conv_init(g, "conv1", &enc.conv1);
    bn_init(g, "bn1", &enc.bn1);
    conv_init(g, "conv2", &enc.conv2);
    bn_init(g, "bn2", &enc.bn2);
    conv_init(g, "conv3", &enc.conv3);
    bn_init(g, "bn3", &enc.bn3);
    init_f32(
        g,
        "fc.weight",
        &[enc.fc.out_features as i64, enc.fc.in_features as i64],
        &enc.fc.weight,
    );
    init_f32(g, "fc.bias", &[enc.fc.out_features as i64], &enc.fc.bias);
    init_f32(g, "norm.floor", &[], &[NORM_FLOOR]);

    // Declared graph boundary, dynamic batch and sequence dims.
    value_info(
        g,
        11,
        "input",
        &[DimDecl::Param("batch_size"), DimDecl::Param("sequence_length")],
    );
    value_info(
        g,
        12,
        "output",
        &[
            DimDecl::Param("batch_size"),
            DimDecl::Fixed(enc.dimension() as i64),
        ],
    );
}

fn conv_node(g: &mut ProtoWriter, name: &str, conv: &Conv1d, input: &str, output: &str) {
    let weight = format!("{name}.weight");
    let bias = format!("{name}.bias");
    node(g, "Conv", name, &[input, &weight, &bias], &[output], |n| {
        attr_ints(n, "kernel_shape", &[conv.kernel as i64]);
        attr_ints(n, "strides", &[conv.stride as i64]);
        attr_ints(n, "pads", &[conv.padding as i64, conv.padding as i64]);
    });
}

fn bn_node(g: &mut ProtoWriter, name: &str, bn: &BatchNorm1d, input: &str, output: &str) {
    let inputs = [
        input.to_string(),
        format!("{name}.scale"),
        format!("{name}.shift"),
        format!("{name}.mean"),
        format!("{name}.var"),
    ];
    let input_refs: Vec<&str> = inputs.iter().map(|s| s.as_str()).collect();
    node(g, "BatchNormalization", name, &input_refs, &[output], |n| {
        attr_float(n, "epsilon", bn.epsilon);
    });
}

fn conv_init(g: &mut ProtoWriter, name: &str, conv: &Conv1d) {
    init_f32(
        g,
        &format!("{name}.weight"),
        &[
            conv.out_channels as i64,
            conv.in_channels as i64,
            conv.kernel as i64,
        ],
        &conv.weight,
    );
    init_f32(g, &format!("{name}.bias"), &[conv.out_channels as i64], &conv.bias);
}

fn bn_init(g: &mut ProtoWriter, name: &str, bn: &BatchNorm1d) {
    let c = bn.channels as i64;
    init_f32(g, &format!("{name}.scale"), &[c], &bn.scale);
    init_f32(g, &format!("{name}.shift"), &[c], &bn.shift);
    init_f32(g, &format!("{name}.mean"), &[c], &bn.running_mean);
    init_f32(g, &format!("{name}.var"), &[c], &bn.running_var);
}

fn node(
    g: &mut ProtoWriter,
    op_type: &str,
    name: &str,
    inputs: &[&str],
    outputs: &[&str],
    attrs: impl FnOnce(&mut ProtoWriter),
) {
    g.message(1, |n| {
        for i in inputs {
            n.string(1, i);
        }
        for o in outputs {
            n.string(2, o);
        }
        n.string(3, name);
        n.string(4, op_type);
        attrs(n);
    });
}

// AttributeProto.AttributeType values.
const ATTR_FLOAT: i64 = 1;
const ATTR_INT: i64 = 2;
const ATTR_INTS: i64 = 7;

fn attr_int(n: &mut ProtoWriter, name: &str, v: i64) {
    n.message(5, |a| {
        a.string(1, name);
        a.int64(3, v);
        a.int64(20, ATTR_INT);
    });
}

fn attr_float(n: &mut ProtoWriter, name: &str, v: f32) {
    n.message(5, |a| {
        a.string(1, name);
        a.float32(2, v);
        a.int64(20, ATTR_FLOAT);
    });
}

fn attr_ints(n: &mut ProtoWriter, name: &str, vals: &[i64]) {
    n.message(5, |a| {
        a.string(1, name);
        for &v in vals {
            a.int64(8, v);
        }
        a.int64(20, ATTR_INTS);
    });
}

/// Float tensor initializer with raw little-endian payload.
fn init_f32(g: &mut ProtoWriter, name: &str, dims: &[i64], data: &[f32]) {
    g.message(5, |t| {
        for &d in dims {
            t.int64(1, d);
        }
        t.int64(2, ELEM_FLOAT);
        t.string(8, name);
        let mut raw = Vec::with_capacity(data.len() * 4);
        for v in data {
            raw.extend_from_slice(&v.to_le_bytes());
        }
        t.bytes(9, &raw);
    });
}

fn value_info(g: &mut ProtoWriter, field: u32, name: &str, dims: &[DimDecl<'_>]) {
    g.message(field, |vi| {
        vi.string(1, name);
        vi.message(2, |ty| {
            ty.message(1, |tt| {
                tt.int64(1, ELEM_FLOAT);
                tt.message(2, |shape| {
                    for d in dims {
                        shape.message(1, |dim| match d {
                            DimDecl::Fixed(v) => dim.int64(1, *v),
                            DimDecl::Param(p) => dim.string(2, p),
                        });
                    }
                });
            });
        });
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use voxprep_encoder::EncoderConfig;

    #[test]
    fn build_is_deterministic() {
        let a = build_model(&SpeakerEncoder::new(&EncoderConfig::default()));
        let b = build_model(&SpeakerEncoder::new(&EncoderConfig::default()));
        assert_eq!(a, b);
    }

    #[test]
    fn weights_dominate_size() {
        // conv1 32*1*80 + conv2 64*32*3 + conv3 128*64*3 + fc 128*128
        // plus biases and bn params: ~49k floats, ~196kB of raw data.
        let bytes = build_model(&SpeakerEncoder::new(&EncoderConfig::default()));
        assert!(bytes.len() > 190_000, "model too small: {}", bytes.len());
        assert!(bytes.len() < 250_000, "model too large: {}", bytes.len());
    }
}
