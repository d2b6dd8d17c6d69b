//! ONNX models: the in-memory graph, its protobuf encoding and the export of a `Sequential`.
//!
//! Only the subset of `onnx.proto` needed to describe small feed-forward networks is modeled:
//! float tensors stored as `raw_data`, `float`/`int` attributes and tensor-typed graph inputs and
//! outputs whose dimensions may be symbolic.

mod decode;
mod encode;
mod eval;
mod export;
mod fold;
mod proto;

use std::{fs, path::Path};

pub use eval::{evaluate, run_node};
pub use export::{ExportOptions, export, export_to_file};
pub use fold::fold_constants;

use crate::Result;

/// The IR version matching opset 11.
pub const IR_VERSION: i64 = 6;

/// The opset the fixtures target.
pub const DEFAULT_OPSET: i64 = 11;

/// `TensorProto.DataType.FLOAT`.
pub const FLOAT: i32 = 1;

#[derive(Debug, Clone, PartialEq)]
pub struct OnnxModel {
    pub ir_version: i64,
    pub producer_name: String,
    pub producer_version: String,
    pub opset_imports: Vec<OpsetImport>,
    pub graph: Graph,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OpsetImport {
    pub domain: String,
    pub version: i64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Graph {
    pub name: String,
    pub nodes: Vec<Node>,
    pub initializers: Vec<Tensor>,
    pub inputs: Vec<ValueInfo>,
    pub outputs: Vec<ValueInfo>,
}

impl Graph {
    pub fn initializer(&self, name: &str) -> Option<&Tensor> {
        self.initializers.iter().find(|t| t.name == name)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Node {
    pub name: String,
    pub op_type: String,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
    pub attributes: Vec<Attribute>,
}

impl Node {
    fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| &a.value)
    }

    pub fn int_attr(&self, name: &str) -> Option<i64> {
        match self.attribute(name)? {
            AttributeValue::Int(v) => Some(*v),
            AttributeValue::Float(_) => None,
        }
    }

    pub fn float_attr(&self, name: &str) -> Option<f32> {
        match self.attribute(name)? {
            AttributeValue::Float(v) => Some(*v),
            AttributeValue::Int(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub value: AttributeValue,
}

impl Attribute {
    pub fn int(name: &str, v: i64) -> Self {
        Self {
            name: name.to_string(),
            value: AttributeValue::Int(v),
        }
    }

    pub fn float(name: &str, v: f32) -> Self {
        Self {
            name: name.to_string(),
            value: AttributeValue::Float(v),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AttributeValue {
    Float(f32),
    Int(i64),
}

/// A named float tensor, row-major.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tensor {
    pub name: String,
    pub dims: Vec<i64>,
    pub data: Vec<f32>,
}

/// The declared type of a graph input or output.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueInfo {
    pub name: String,
    pub elem_type: i32,
    pub shape: Vec<Dim>,
}

/// A tensor dimension, either fixed or named and left free for the runtime to bind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dim {
    Value(i64),
    Param(String),
}

impl OnnxModel {
    /// Writes the encoded model to `path`, replacing any previous file.
    ///
    /// # Returns
    /// The amount of bytes written.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<usize> {
        let bytes = self.to_bytes();
        fs::write(path, &bytes)?;
        Ok(bytes.len())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = fs::read(path)?;
        Self::from_bytes(&bytes)
    }
}
