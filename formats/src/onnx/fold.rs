use log::debug;

use super::{
    Graph,
    eval::{run_node, to_array, to_tensor},
};
use crate::Result;

/// Replaces every node whose inputs are all initializers by the initializer it computes.
///
/// Nodes producing a graph output are kept so that outputs stay bound to a node.
///
/// # Returns
/// The amount of nodes folded.
pub fn fold_constants(graph: &mut Graph) -> Result<usize> {
    let mut folded = 0;

    while let Some(i) = graph.nodes.iter().position(|node| {
        !node.inputs.is_empty()
            && node.outputs.len() == 1
            && node.inputs.iter().all(|n| graph.initializer(n).is_some())
            && !graph.outputs.iter().any(|o| o.name == node.outputs[0])
    }) {
        let node = graph.nodes.remove(i);

        let args = node
            .inputs
            .iter()
            .filter_map(|name| graph.initializer(name))
            .map(to_array)
            .collect::<Result<Vec<_>>>()?;
        let views: Vec<_> = args.iter().map(|a| a.view()).collect();

        let value = run_node(&node, &views)?;
        debug!("folded {} ({}) into a constant", node.name, node.op_type);

        graph.initializers.push(to_tensor(&node.outputs[0], value));
        folded += 1;
    }

    Ok(folded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::onnx::{Dim, FLOAT, Node, Tensor, ValueInfo};

    fn value_info(name: &str) -> ValueInfo {
        ValueInfo {
            name: name.into(),
            elem_type: FLOAT,
            shape: vec![Dim::Param("batch_size".into()), Dim::Value(2)],
        }
    }

    #[test]
    fn folds_constant_subgraph() {
        let mut graph = Graph {
            nodes: vec![
                Node {
                    name: "relu_w".into(),
                    op_type: "Relu".into(),
                    inputs: vec!["w".into()],
                    outputs: vec!["w_pos".into()],
                    ..Default::default()
                },
                Node {
                    name: "relu_x".into(),
                    op_type: "Relu".into(),
                    inputs: vec!["x".into()],
                    outputs: vec!["y".into()],
                    ..Default::default()
                },
            ],
            initializers: vec![Tensor {
                name: "w".into(),
                dims: vec![2],
                data: vec![-1., 3.],
            }],
            inputs: vec![value_info("x")],
            outputs: vec![value_info("y")],
            ..Default::default()
        };

        assert_eq!(fold_constants(&mut graph).unwrap(), 1);
        assert_eq!(graph.nodes.len(), 1);
        assert_eq!(graph.nodes[0].name, "relu_x");
        assert_eq!(graph.initializer("w_pos").unwrap().data, [0., 3.]);
    }

    #[test]
    fn keeps_nodes_bound_to_outputs() {
        let mut graph = Graph {
            nodes: vec![Node {
                name: "relu".into(),
                op_type: "Relu".into(),
                inputs: vec!["w".into()],
                outputs: vec!["y".into()],
                ..Default::default()
            }],
            initializers: vec![Tensor {
                name: "w".into(),
                dims: vec![1],
                data: vec![1.],
            }],
            outputs: vec![value_info("y")],
            ..Default::default()
        };

        assert_eq!(fold_constants(&mut graph).unwrap(), 0);
        assert_eq!(graph.nodes.len(), 1);
    }
}
