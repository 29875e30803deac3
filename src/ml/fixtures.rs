//! Small ONNX graphs written to disk so the tract backend can be exercised
//! without a trained checkpoint.

use std::path::{Path, PathBuf};

use prost::Message;
use tract_onnx::pb::{
    tensor_proto::DataType, type_proto, GraphProto, ModelProto, NodeProto, OperatorSetIdProto,
    TensorProto, TypeProto, ValueInfoProto,
};

/// `GlobalAveragePool -> Flatten -> Gemm`.
///
/// Logit `j` is `sum_c mean(channel c) * weights[c][j] + bias[j]`, so the
/// graph accepts any `[1, 3, H, W]` input and has `bias.len()` outputs.
pub(crate) fn pooled_linear(dir: &Path, weights: [&[f32]; 3], bias: &[f32]) -> PathBuf {
    let n = bias.len();
    assert!(weights.iter().all(|row| row.len() == n));

    let graph = GraphProto {
        name: "pooled_linear".to_string(),
        node: vec![
            node("GlobalAveragePool", &["input"], "pooled"),
            node("Flatten", &["pooled"], "features"),
            node("Gemm", &["features", "weight", "bias"], "logits"),
        ],
        initializer: vec![
            float_tensor("weight", &[3, n as i64], weights.concat()),
            float_tensor("bias", &[n as i64], bias.to_vec()),
        ],
        input: vec![float_value("input")],
        output: vec![float_value("logits")],
        ..Default::default()
    };
    let model = ModelProto {
        ir_version: 7,
        opset_import: vec![OperatorSetIdProto {
            domain: String::new(),
            version: 13,
        }],
        producer_name: "agrisense-tests".to_string(),
        graph: Some(graph),
        ..Default::default()
    };

    let path = dir.join("pooled_linear.onnx");
    std::fs::write(&path, model.encode_to_vec()).unwrap();
    path
}

fn node(op: &str, inputs: &[&str], output: &str) -> NodeProto {
    NodeProto {
        op_type: op.to_string(),
        name: output.to_string(),
        input: inputs.iter().map(|s| s.to_string()).collect(),
        output: vec![output.to_string()],
        ..Default::default()
    }
}

fn float_tensor(name: &str, dims: &[i64], data: Vec<f32>) -> TensorProto {
    TensorProto {
        name: name.to_string(),
        dims: dims.to_vec(),
        data_type: DataType::Float as i32,
        float_data: data,
        ..Default::default()
    }
}

fn float_value(name: &str) -> ValueInfoProto {
    ValueInfoProto {
        name: name.to_string(),
        r#type: Some(TypeProto {
            value: Some(type_proto::Value::TensorType(type_proto::Tensor {
                elem_type: DataType::Float as i32,
                shape: None,
            })),
            ..Default::default()
        }),
        ..Default::default()
    }
}
