use std::path::Path;

use log::{debug, info};
use machine_learning::arch::{
    Mode, Sequential,
    activations::ActFn,
    layers::{Dense, Layer, Softmax},
};

use super::{
    Attribute, DEFAULT_OPSET, Dim, FLOAT, Graph, IR_VERSION, Node, OnnxModel, OpsetImport,
    Tensor, ValueInfo, fold_constants,
};
use crate::{FormatErr, Result};

/// The oldest opset whose `Gemm`, `Relu` and `Softmax` match what gets exported.
const MIN_OPSET: i64 = 7;

/// How a model is turned into an ONNX graph.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub opset_version: i64,
    pub constant_folding: bool,
    pub input_name: String,
    pub output_name: String,
    /// Name of the symbolic leading dimension of the input and output, `None` pins it to 1.
    pub dynamic_batch: Option<String>,
    pub graph_name: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            opset_version: DEFAULT_OPSET,
            constant_folding: true,
            input_name: "input".into(),
            output_name: "output".into(),
            dynamic_batch: Some("batch_size".into()),
            graph_name: "main_graph".into(),
        }
    }
}

/// A computation to emit, before its output tensor gets a name.
struct Step {
    name: String,
    op_type: &'static str,
    extra_inputs: Vec<String>,
    attributes: Vec<Attribute>,
}

/// Builds the ONNX graph of a model in inference mode.
///
/// Dense layers become `Gemm` nodes reading `<layer>.weight` / `<layer>.bias` initializers,
/// followed by the node of their activation. Softmax layers become `Softmax` over axis 1.
///
/// # Arguments
/// * `model` - The model to export.
/// * `options` - Naming, opset and optimization options.
///
/// # Returns
/// The model's ONNX representation or an error if it can't be expressed.
pub fn export(model: &Sequential, options: &ExportOptions) -> Result<OnnxModel> {
    if model.mode() != Mode::Eval {
        return Err(FormatErr::NotInEvalMode);
    }
    if options.opset_version < MIN_OPSET {
        return Err(FormatErr::UnsupportedOpset(options.opset_version));
    }

    let (Some(first), Some(last)) = (model.layers().first(), model.layers().last()) else {
        return Err(FormatErr::InvalidModel("the model has no layers".into()));
    };

    let input_dim = match first {
        Layer::Dense(dense) => dense.dim().0,
        Layer::Softmax(softmax) => softmax.dim(),
    };

    let mut steps = Vec::new();
    let mut initializers = Vec::new();

    for (i, layer) in model.layers().iter().enumerate() {
        match layer {
            Layer::Dense(dense) => {
                dense_steps(dense, &mut steps);
                initializers.extend(dense_initializers(dense));
            }
            Layer::Softmax(_) => steps.push(Step {
                name: format!("/softmax_{i}/Softmax"),
                op_type: "Softmax",
                extra_inputs: vec![],
                attributes: vec![Attribute::int("axis", Softmax::AXIS as i64)],
            }),
        }
    }

    let nsteps = steps.len();
    let mut current = options.input_name.clone();
    let nodes = steps
        .into_iter()
        .enumerate()
        .map(|(i, step)| {
            let output = if i + 1 == nsteps {
                options.output_name.clone()
            } else {
                format!("{}_output_0", step.name)
            };

            let mut inputs = vec![std::mem::replace(&mut current, output.clone())];
            inputs.extend(step.extra_inputs);

            Node {
                name: step.name,
                op_type: step.op_type.to_string(),
                inputs,
                outputs: vec![output],
                attributes: step.attributes,
            }
        })
        .collect();

    let batch = match &options.dynamic_batch {
        Some(name) => Dim::Param(name.clone()),
        None => Dim::Value(1),
    };

    let mut graph = Graph {
        name: options.graph_name.clone(),
        nodes,
        initializers,
        inputs: vec![ValueInfo {
            name: options.input_name.clone(),
            elem_type: FLOAT,
            shape: vec![batch.clone(), Dim::Value(input_dim as i64)],
        }],
        outputs: vec![ValueInfo {
            name: options.output_name.clone(),
            elem_type: FLOAT,
            shape: vec![batch, Dim::Value(last.output_dim() as i64)],
        }],
    };

    if options.constant_folding {
        let folded = fold_constants(&mut graph)?;
        debug!("constant folding removed {folded} node(s)");
    }

    Ok(OnnxModel {
        ir_version: IR_VERSION,
        producer_name: env!("CARGO_PKG_NAME").into(),
        producer_version: env!("CARGO_PKG_VERSION").into(),
        opset_imports: vec![OpsetImport {
            domain: String::new(),
            version: options.opset_version,
        }],
        graph,
    })
}

/// Exports a model and writes it to `path`.
///
/// # Returns
/// The amount of bytes written.
pub fn export_to_file<P: AsRef<Path>>(
    model: &Sequential,
    options: &ExportOptions,
    path: P,
) -> Result<usize> {
    let onnx = export(model, options)?;
    let written = onnx.save(&path)?;

    info!(
        "wrote {} ({} nodes, {} initializers, {written} bytes)",
        path.as_ref().display(),
        onnx.graph.nodes.len(),
        onnx.graph.initializers.len()
    );
    Ok(written)
}

fn dense_steps(dense: &Dense, steps: &mut Vec<Step>) {
    let name = dense.name();

    steps.push(Step {
        name: format!("/{name}/Gemm"),
        op_type: "Gemm",
        extra_inputs: vec![format!("{name}.weight"), format!("{name}.bias")],
        attributes: vec![
            Attribute::float("alpha", 1.),
            Attribute::float("beta", 1.),
            Attribute::int("transB", 1),
        ],
    });

    if let Some(ActFn::Relu(_)) = dense.act_fn() {
        steps.push(Step {
            name: format!("/{name}/Relu"),
            op_type: "Relu",
            extra_inputs: vec![],
            attributes: vec![],
        });
    }
}

fn dense_initializers(dense: &Dense) -> [Tensor; 2] {
    let (n_in, n_out) = dense.dim();

    [
        Tensor {
            name: format!("{}.weight", dense.name()),
            dims: vec![n_out as i64, n_in as i64],
            data: dense.weight().iter().copied().collect(),
        },
        Tensor {
            name: format!("{}.bias", dense.name()),
            dims: vec![n_out as i64],
            data: dense.bias().to_vec(),
        },
    ]
}
