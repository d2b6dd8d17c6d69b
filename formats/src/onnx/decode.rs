use super::{
    Attribute, AttributeValue, Dim, FLOAT, Graph, Node, OnnxModel, OpsetImport, Tensor, ValueInfo,
    proto::{FIXED32, LEN, ProtobufReader, VARINT},
};
use crate::{FormatErr, Result, le_f32s};

impl OnnxModel {
    /// Decodes an `onnx.ModelProto`.
    ///
    /// Unknown fields are skipped. Tensors must be `FLOAT`, given either as `raw_data` or as
    /// `float_data`.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut r = ProtobufReader::new(data);
        let mut model = OnnxModel {
            ir_version: 0,
            producer_name: String::new(),
            producer_version: String::new(),
            opset_imports: Vec::new(),
            graph: Graph::default(),
        };

        while r.has_more() {
            match r.read_tag()? {
                (1, VARINT) => model.ir_version = r.read_varint()? as i64,
                (2, LEN) => model.producer_name = r.read_string()?,
                (3, LEN) => model.producer_version = r.read_string()?,
                (7, LEN) => model.graph = read_graph(r.read_bytes()?)?,
                (8, LEN) => model.opset_imports.push(read_opset(r.read_bytes()?)?),
                (_, wire_type) => r.skip(wire_type)?,
            }
        }

        Ok(model)
    }
}

fn read_opset(data: &[u8]) -> Result<OpsetImport> {
    let mut r = ProtobufReader::new(data);
    let mut opset = OpsetImport {
        domain: String::new(),
        version: 0,
    };

    while r.has_more() {
        match r.read_tag()? {
            (1, LEN) => opset.domain = r.read_string()?,
            (2, VARINT) => opset.version = r.read_varint()? as i64,
            (_, wire_type) => r.skip(wire_type)?,
        }
    }

    Ok(opset)
}

fn read_graph(data: &[u8]) -> Result<Graph> {
    let mut r = ProtobufReader::new(data);
    let mut graph = Graph::default();

    while r.has_more() {
        match r.read_tag()? {
            (1, LEN) => graph.nodes.push(read_node(r.read_bytes()?)?),
            (2, LEN) => graph.name = r.read_string()?,
            (5, LEN) => graph.initializers.push(read_tensor(r.read_bytes()?)?),
            (11, LEN) => graph.inputs.push(read_value_info(r.read_bytes()?)?),
            (12, LEN) => graph.outputs.push(read_value_info(r.read_bytes()?)?),
            (_, wire_type) => r.skip(wire_type)?,
        }
    }

    Ok(graph)
}

fn read_node(data: &[u8]) -> Result<Node> {
    let mut r = ProtobufReader::new(data);
    let mut node = Node::default();

    while r.has_more() {
        match r.read_tag()? {
            (1, LEN) => node.inputs.push(r.read_string()?),
            (2, LEN) => node.outputs.push(r.read_string()?),
            (3, LEN) => node.name = r.read_string()?,
            (4, LEN) => node.op_type = r.read_string()?,
            (5, LEN) => {
                if let Some(attr) = read_attribute(r.read_bytes()?)? {
                    node.attributes.push(attr);
                }
            }
            (_, wire_type) => r.skip(wire_type)?,
        }
    }

    Ok(node)
}

/// Returns `None` for attribute kinds other than a single float or int.
fn read_attribute(data: &[u8]) -> Result<Option<Attribute>> {
    let mut r = ProtobufReader::new(data);
    let mut name = String::new();
    let mut value = None;

    while r.has_more() {
        match r.read_tag()? {
            (1, LEN) => name = r.read_string()?,
            (2, FIXED32) => value = Some(AttributeValue::Float(r.read_f32()?)),
            (3, VARINT) => value = Some(AttributeValue::Int(r.read_varint()? as i64)),
            (_, wire_type) => r.skip(wire_type)?,
        }
    }

    Ok(value.map(|value| Attribute { name, value }))
}

fn read_tensor(data: &[u8]) -> Result<Tensor> {
    let mut r = ProtobufReader::new(data);
    let mut tensor = Tensor::default();
    let mut data_type = FLOAT;
    let mut raw: Option<&[u8]> = None;

    while r.has_more() {
        match r.read_tag()? {
            (1, VARINT) => tensor.dims.push(r.read_varint()? as i64),
            (1, LEN) => {
                let mut packed = ProtobufReader::new(r.read_bytes()?);
                while packed.has_more() {
                    tensor.dims.push(packed.read_varint()? as i64);
                }
            }
            (2, VARINT) => data_type = r.read_varint()? as i32,
            (4, LEN) => tensor.data.extend(packed_floats(r.read_bytes()?, &tensor.name)?),
            (4, FIXED32) => tensor.data.push(r.read_f32()?),
            (8, LEN) => tensor.name = r.read_string()?,
            (9, LEN) => raw = Some(r.read_bytes()?),
            (_, wire_type) => r.skip(wire_type)?,
        }
    }

    if data_type != FLOAT {
        return Err(FormatErr::Protobuf(format!(
            "tensor {} has data type {data_type}, only FLOAT is supported",
            tensor.name
        )));
    }

    if let Some(raw) = raw {
        tensor.data = packed_floats(raw, &tensor.name)?;
    }

    let expected = tensor
        .dims
        .iter()
        .try_fold(1usize, |acc, &d| {
            usize::try_from(d).ok().and_then(|d| acc.checked_mul(d))
        })
        .ok_or_else(|| {
            FormatErr::Protobuf(format!(
                "tensor {} has invalid dims {:?}",
                tensor.name, tensor.dims
            ))
        })?;

    if expected != tensor.data.len() {
        return Err(FormatErr::Protobuf(format!(
            "tensor {} has {} values but its dims {:?} call for {expected}",
            tensor.name,
            tensor.data.len(),
            tensor.dims
        )));
    }

    Ok(tensor)
}

fn read_value_info(data: &[u8]) -> Result<ValueInfo> {
    let mut r = ProtobufReader::new(data);
    let mut info = ValueInfo {
        name: String::new(),
        elem_type: 0,
        shape: Vec::new(),
    };

    while r.has_more() {
        match r.read_tag()? {
            (1, LEN) => info.name = r.read_string()?,
            (2, LEN) => read_type(r.read_bytes()?, &mut info)?,
            (_, wire_type) => r.skip(wire_type)?,
        }
    }

    Ok(info)
}

fn read_type(data: &[u8], info: &mut ValueInfo) -> Result<()> {
    let mut r = ProtobufReader::new(data);

    while r.has_more() {
        match r.read_tag()? {
            (1, LEN) => {
                let mut tensor = ProtobufReader::new(r.read_bytes()?);
                while tensor.has_more() {
                    match tensor.read_tag()? {
                        (1, VARINT) => info.elem_type = tensor.read_varint()? as i32,
                        (2, LEN) => info.shape = read_shape(tensor.read_bytes()?)?,
                        (_, wire_type) => tensor.skip(wire_type)?,
                    }
                }
            }
            (_, wire_type) => r.skip(wire_type)?,
        }
    }

    Ok(())
}

fn read_shape(data: &[u8]) -> Result<Vec<Dim>> {
    let mut r = ProtobufReader::new(data);
    let mut dims = Vec::new();

    while r.has_more() {
        match r.read_tag()? {
            (1, LEN) => {
                let mut d = ProtobufReader::new(r.read_bytes()?);
                let mut dim = Dim::Param(String::new());
                while d.has_more() {
                    match d.read_tag()? {
                        (1, VARINT) => dim = Dim::Value(d.read_varint()? as i64),
                        (2, LEN) => dim = Dim::Param(d.read_string()?),
                        (_, wire_type) => d.skip(wire_type)?,
                    }
                }
                dims.push(dim);
            }
            (_, wire_type) => r.skip(wire_type)?,
        }
    }

    Ok(dims)
}

fn packed_floats(bytes: &[u8], tensor: &str) -> Result<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(FormatErr::Protobuf(format!(
            "data of tensor {tensor} is not a whole number of floats"
        )));
    }

    Ok(le_f32s(bytes))
}
