use super::{
    Attribute, AttributeValue, Dim, FLOAT, Graph, Node, OnnxModel, OpsetImport, Tensor, ValueInfo,
    proto::ProtobufWriter,
};

// AttributeProto.AttributeType
const ATTR_FLOAT: i32 = 1;
const ATTR_INT: i32 = 2;

impl OnnxModel {
    /// Encodes the model as an `onnx.ModelProto`.
    ///
    /// Fields are written in field number order and nothing time dependent is included, so the
    /// same model always encodes to the same bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = ProtobufWriter::new();

        w.int64(1, self.ir_version);
        w.string(2, &self.producer_name);
        w.string(3, &self.producer_version);
        w.message(7, |m| write_graph(m, &self.graph));
        for opset in &self.opset_imports {
            w.message(8, |m| write_opset(m, opset));
        }

        w.into_bytes()
    }
}

fn write_opset(w: &mut ProtobufWriter, opset: &OpsetImport) {
    w.string(1, &opset.domain);
    w.int64(2, opset.version);
}

fn write_graph(w: &mut ProtobufWriter, graph: &Graph) {
    for node in &graph.nodes {
        w.message(1, |m| write_node(m, node));
    }
    w.string(2, &graph.name);
    for tensor in &graph.initializers {
        w.message(5, |m| write_tensor(m, tensor));
    }
    for input in &graph.inputs {
        w.message(11, |m| write_value_info(m, input));
    }
    for output in &graph.outputs {
        w.message(12, |m| write_value_info(m, output));
    }
}

fn write_node(w: &mut ProtobufWriter, node: &Node) {
    for input in &node.inputs {
        w.bytes(1, input.as_bytes());
    }
    for output in &node.outputs {
        w.bytes(2, output.as_bytes());
    }
    w.string(3, &node.name);
    w.string(4, &node.op_type);
    for attr in &node.attributes {
        w.message(5, |m| write_attribute(m, attr));
    }
}

fn write_attribute(w: &mut ProtobufWriter, attr: &Attribute) {
    w.string(1, &attr.name);
    match attr.value {
        AttributeValue::Float(v) => {
            w.float(2, v);
            w.int32(20, ATTR_FLOAT);
        }
        AttributeValue::Int(v) => {
            w.int64(3, v);
            w.int32(20, ATTR_INT);
        }
    }
}

fn write_tensor(w: &mut ProtobufWriter, tensor: &Tensor) {
    for &dim in &tensor.dims {
        w.int64(1, dim);
    }
    w.int32(2, FLOAT);
    w.string(8, &tensor.name);

    let raw: Vec<u8> = tensor.data.iter().flat_map(|v| v.to_le_bytes()).collect();
    w.bytes(9, &raw);
}

fn write_value_info(w: &mut ProtobufWriter, info: &ValueInfo) {
    w.string(1, &info.name);
    // TypeProto { tensor_type: TypeProto.Tensor { elem_type, shape } }
    w.message(2, |ty| {
        ty.message(1, |tensor| {
            tensor.int32(1, info.elem_type);
            tensor.message(2, |shape| {
                for dim in &info.shape {
                    shape.message(1, |d| match dim {
                        Dim::Value(v) => d.int64(1, *v),
                        Dim::Param(p) => d.string(2, p),
                    });
                }
            });
        });
    });
}
