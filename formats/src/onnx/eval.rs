use std::collections::{BTreeMap, HashMap};

use log::trace;
use machine_learning::arch::layers::softmax_rows;
use ndarray::{ArrayD, ArrayView2, ArrayViewD, Ix2, IxDyn};

use super::{Graph, Node, Tensor};
use crate::{FormatErr, Result};

/// Runs the graph on the given named inputs.
///
/// Nodes are executed in the order they are stored, which is how the exporter emits them.
///
/// # Arguments
/// * `graph` - The graph to run.
/// * `inputs` - The values for the graph inputs, by name.
///
/// # Returns
/// The graph outputs by name, or an error if a node refers to an undefined tensor or uses an
/// operator this evaluator does not know.
pub fn evaluate(
    graph: &Graph,
    inputs: &[(&str, ArrayD<f32>)],
) -> Result<BTreeMap<String, ArrayD<f32>>> {
    let mut values: HashMap<&str, ArrayD<f32>> = HashMap::new();

    for tensor in &graph.initializers {
        values.insert(&tensor.name, to_array(tensor)?);
    }
    for (name, value) in inputs {
        values.insert(name, value.clone());
    }

    for node in &graph.nodes {
        let y = {
            let args = node
                .inputs
                .iter()
                .map(|name| {
                    values
                        .get(name.as_str())
                        .map(|v| v.view())
                        .ok_or_else(|| FormatErr::MissingTensor(name.clone()))
                })
                .collect::<Result<Vec<_>>>()?;

            run_node(node, &args)?
        };
        trace!("{} -> {:?}", node.name, y.shape());

        let Some(output) = node.outputs.first() else {
            return Err(FormatErr::InvalidModel(format!(
                "node {} has no outputs",
                node.name
            )));
        };
        values.insert(output, y);
    }

    graph
        .outputs
        .iter()
        .map(|info| {
            values
                .remove(info.name.as_str())
                .map(|v| (info.name.clone(), v))
                .ok_or_else(|| FormatErr::MissingTensor(info.name.clone()))
        })
        .collect()
}

/// Computes a single node.
pub fn run_node(node: &Node, args: &[ArrayViewD<f32>]) -> Result<ArrayD<f32>> {
    let arg = |i: usize| {
        args.get(i).ok_or_else(|| {
            FormatErr::InvalidModel(format!("{} expects at least {} inputs", node.op_type, i + 1))
        })
    };

    match node.op_type.as_str() {
        "Gemm" => gemm(node, arg(0)?, arg(1)?, args.get(2)),
        "Relu" => Ok(arg(0)?.mapv(|v| v.max(0.))),
        "Sigmoid" => Ok(arg(0)?.mapv(|v| 1. / (1. + (-v).exp()))),
        "Softmax" => softmax(node, arg(0)?),
        other => Err(FormatErr::UnsupportedOp(other.to_string())),
    }
}

fn gemm(
    node: &Node,
    a: &ArrayViewD<f32>,
    b: &ArrayViewD<f32>,
    c: Option<&ArrayViewD<f32>>,
) -> Result<ArrayD<f32>> {
    let alpha = node.float_attr("alpha").unwrap_or(1.);
    let beta = node.float_attr("beta").unwrap_or(1.);

    let mut a = to_2d(a)?;
    let mut b = to_2d(b)?;
    if node.int_attr("transA").unwrap_or(0) != 0 {
        a = a.reversed_axes();
    }
    if node.int_attr("transB").unwrap_or(0) != 0 {
        b = b.reversed_axes();
    }

    if a.ncols() != b.nrows() {
        return Err(FormatErr::InvalidModel(format!(
            "{}: cannot multiply {:?} by {:?}",
            node.name,
            a.shape(),
            b.shape()
        )));
    }

    let mut y = (a.dot(&b) * alpha).into_dyn();

    if let Some(c) = c {
        let Some(c) = c.broadcast(y.shape()) else {
            return Err(FormatErr::InvalidModel(format!(
                "{}: bias of shape {:?} does not broadcast to {:?}",
                node.name,
                c.shape(),
                y.shape()
            )));
        };
        y.zip_mut_with(&c, |y, &c| *y += beta * c);
    }

    Ok(y)
}

/// Softmax as defined up to opset 12: the input is flattened to 2D around `axis` and normalized
/// row by row.
fn softmax(node: &Node, x: &ArrayViewD<f32>) -> Result<ArrayD<f32>> {
    let ndim = x.ndim() as i64;
    let mut axis = node.int_attr("axis").unwrap_or(1);
    if axis < 0 {
        axis += ndim;
    }
    if !(0..=ndim).contains(&axis) {
        return Err(FormatErr::InvalidModel(format!(
            "{}: axis {axis} out of range for {ndim} dimensions",
            node.name
        )));
    }

    let (outer, inner) = x.shape().split_at(axis as usize);
    let rows: usize = outer.iter().product();
    let cols: usize = inner.iter().product();

    let flat = x.to_shape((rows, cols))?;
    let y = softmax_rows(flat.view());
    Ok(y.into_shape_with_order(IxDyn(x.shape()))?)
}

fn to_2d<'a>(x: &ArrayViewD<'a, f32>) -> Result<ArrayView2<'a, f32>> {
    Ok(x.clone().into_dimensionality::<Ix2>()?)
}

pub(super) fn to_array(tensor: &Tensor) -> Result<ArrayD<f32>> {
    let shape = tensor
        .dims
        .iter()
        .map(|&d| usize::try_from(d))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|_| {
            FormatErr::InvalidModel(format!("tensor {} has a negative dimension", tensor.name))
        })?;

    Ok(ArrayD::from_shape_vec(IxDyn(&shape), tensor.data.clone())?)
}

/// Builds an initializer out of a computed value.
pub(super) fn to_tensor(name: &str, value: ArrayD<f32>) -> Tensor {
    Tensor {
        name: name.to_string(),
        dims: value.shape().iter().map(|&d| d as i64).collect(),
        data: value.iter().copied().collect(),
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{array, arr2};

    use super::*;
    use crate::onnx::Attribute;

    fn node(op_type: &str, attributes: Vec<Attribute>) -> Node {
        Node {
            name: op_type.to_lowercase(),
            op_type: op_type.to_string(),
            inputs: vec!["x".into(), "w".into(), "b".into()],
            outputs: vec!["y".into()],
            attributes,
        }
    }

    #[test]
    fn gemm_with_transposed_weights() {
        let gemm = node("Gemm", vec![Attribute::int("transB", 1)]);
        let x = arr2(&[[1., 2.]]).into_dyn();
        let w = arr2(&[[0.5, 0.5]]).into_dyn();
        let b = array![0.1].into_dyn();

        let y = run_node(&gemm, &[x.view(), w.view(), b.view()]).unwrap();
        assert_eq!(y.shape(), [1, 1]);
        assert!((y[[0, 0]] - 1.6).abs() < 1e-6);
    }

    #[test]
    fn gemm_alpha_beta() {
        let gemm = node(
            "Gemm",
            vec![Attribute::float("alpha", 2.), Attribute::float("beta", 0.5)],
        );
        let x = arr2(&[[1., 1.]]).into_dyn();
        let w = arr2(&[[1.], [2.]]).into_dyn();
        let b = array![4.].into_dyn();

        let y = run_node(&gemm, &[x.view(), w.view(), b.view()]).unwrap();
        assert_eq!(y[[0, 0]], 8.);
    }

    #[test]
    fn gemm_shape_mismatch() {
        let gemm = node("Gemm", vec![]);
        let x = arr2(&[[1., 2., 3.]]).into_dyn();
        let w = arr2(&[[1.], [2.]]).into_dyn();

        assert!(run_node(&gemm, &[x.view(), w.view()]).is_err());
    }

    #[test]
    fn softmax_default_axis() {
        let softmax = node("Softmax", vec![]);
        let x = arr2(&[[0., 0.], [1., 1.]]).into_dyn();

        let y = run_node(&softmax, &[x.view()]).unwrap();
        assert_eq!(y, arr2(&[[0.5, 0.5], [0.5, 0.5]]).into_dyn());
    }

    #[test]
    fn unknown_operator() {
        let conv = node("Conv", vec![]);
        let x = arr2(&[[1.]]).into_dyn();

        assert!(matches!(
            run_node(&conv, &[x.view()]),
            Err(FormatErr::UnsupportedOp(op)) if op == "Conv"
        ));
    }

    #[test]
    fn missing_input() {
        let graph = Graph {
            nodes: vec![node("Relu", vec![])],
            ..Default::default()
        };

        assert!(matches!(
            evaluate(&graph, &[]),
            Err(FormatErr::MissingTensor(name)) if name == "x"
        ));
    }
}
