//! The fixture files and the operations producing them.

mod classifier;
mod inputs;
mod linear;

pub use classifier::{CLASSIFIER_ONNX, classifier_model, produce_classifier};
pub use inputs::{BATCH_INPUT, CLASSIFIER_INPUT, LINEAR_INPUT, produce_inputs, test_inputs};
pub use linear::{LINEAR_ONNX, LINEAR_SAFETENSORS, linear_model, produce_linear};

/// Every file a complete run leaves in the output directory, in the order they are reported.
pub const EXPECTED_FILES: [&str; 6] = [
    LINEAR_ONNX,
    LINEAR_SAFETENSORS,
    CLASSIFIER_ONNX,
    LINEAR_INPUT,
    CLASSIFIER_INPUT,
    BATCH_INPUT,
];
