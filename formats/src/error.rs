use std::{
    error::Error,
    fmt::{self, Display},
    io,
};

use machine_learning::MlErr;
use ndarray::ShapeError;

/// The result type used across the file formats module.
pub type Result<T> = std::result::Result<T, FormatErr>;

/// Failures while encoding, decoding or exporting fixture files.
#[derive(Debug)]
pub enum FormatErr {
    Io(io::Error),
    Protobuf(String),
    Npy(String),
    SafeTensors(String),
    Shape(ShapeError),
    Unavailable(&'static str),
    UnsupportedOp(String),
    UnsupportedOpset(i64),
    MissingTensor(String),
    InvalidModel(String),
    NotInEvalMode,
    Ml(MlErr),
}

impl Display for FormatErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatErr::Io(e) => write!(f, "io error: {e}"),
            FormatErr::Protobuf(msg) => write!(f, "malformed protobuf: {msg}"),
            FormatErr::Npy(msg) => write!(f, "malformed npy: {msg}"),
            FormatErr::SafeTensors(msg) => write!(f, "safetensors error: {msg}"),
            FormatErr::Shape(e) => write!(f, "shape error: {e}"),
            FormatErr::Unavailable(what) => {
                write!(f, "{what} support was not compiled into this build")
            }
            FormatErr::UnsupportedOp(op) => write!(f, "unsupported operator: {op}"),
            FormatErr::UnsupportedOpset(v) => write!(f, "unsupported opset version: {v}"),
            FormatErr::MissingTensor(name) => write!(f, "tensor {name} is not defined"),
            FormatErr::InvalidModel(msg) => write!(f, "invalid model: {msg}"),
            FormatErr::NotInEvalMode => {
                write!(f, "the model must be switched to inference mode before exporting")
            }
            FormatErr::Ml(e) => write!(f, "{e}"),
        }
    }
}

impl Error for FormatErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            FormatErr::Io(e) => Some(e),
            FormatErr::Shape(e) => Some(e),
            FormatErr::Ml(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for FormatErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<ShapeError> for FormatErr {
    fn from(value: ShapeError) -> Self {
        Self::Shape(value)
    }
}

impl From<MlErr> for FormatErr {
    fn from(value: MlErr) -> Self {
        Self::Ml(value)
    }
}
