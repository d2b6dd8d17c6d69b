use std::collections::BTreeMap;

use log::debug;
use ndarray::{Array2, ArrayView2};

use super::layers::Layer;
use crate::{MlErr, Result, initialization::ParamGen};

/// Named parameter tensors: `<layer>.weight` / `<layer>.bias` mapped to their values (row-major)
/// and shape.
pub type StateDict = BTreeMap<String, (Vec<f32>, Vec<usize>)>;

/// Whether a model is being trained or used for inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Train,
    Eval,
}

/// A sequential model: information flows forward through its layers in order.
#[derive(Clone, Debug)]
pub struct Sequential {
    layers: Vec<Layer>,
    mode: Mode,
}

impl Sequential {
    /// Creates a new `Sequential` in training mode.
    ///
    /// # Arguments
    /// * `layers` - The layers the sequential is composed of.
    ///
    /// # Returns
    /// A new `Sequential` instance.
    pub fn new<I>(layers: I) -> Self
    where
        I: IntoIterator<Item = Layer>,
    {
        Self {
            layers: layers.into_iter().collect(),
            mode: Mode::Train,
        }
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Returns the amount of parameters in the model.
    pub fn size(&self) -> usize {
        self.layers.iter().map(Layer::size).sum()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Switches the model to inference mode.
    pub fn eval(&mut self) -> &mut Self {
        self.mode = Mode::Eval;
        self
    }

    /// Switches the model back to training mode.
    pub fn train(&mut self) -> &mut Self {
        self.mode = Mode::Train;
        self
    }

    /// Overwrites every parameter of the model, layer by layer.
    ///
    /// # Arguments
    /// * `param_gen` - The generator to draw the parameters from.
    ///
    /// # Returns
    /// An error if the generator gets exhausted before the model is full.
    pub fn init(&mut self, param_gen: &mut dyn ParamGen) -> Result<()> {
        for layer in self.layers.iter_mut() {
            if let Layer::Dense(dense) = layer {
                dense.init(param_gen)?;
            }
        }

        debug!("initialized {} parameters", self.size());
        Ok(())
    }

    /// Makes a forward pass through the network.
    ///
    /// # Arguments
    /// * `x` - The input data, one sample per row.
    ///
    /// # Returns
    /// The prediction for the given input or an error if occurred.
    pub fn forward(&self, x: ArrayView2<f32>) -> Result<Array2<f32>> {
        let Some((first, rest)) = self.layers.split_first() else {
            return Err(MlErr::SizeMismatch {
                what: "layers",
                got: 0,
                expected: 1,
            });
        };

        let mut y = first.forward(x)?;
        for layer in rest {
            y = layer.forward(y.view())?;
        }

        Ok(y)
    }

    /// Collects the model's parameters by name.
    pub fn state_dict(&self) -> StateDict {
        let mut state = StateDict::new();

        for layer in &self.layers {
            let Layer::Dense(dense) = layer else {
                continue;
            };

            let weight = dense.weight();
            let bias = dense.bias();

            state.insert(
                format!("{}.weight", dense.name()),
                (weight.iter().copied().collect(), weight.shape().to_vec()),
            );
            state.insert(
                format!("{}.bias", dense.name()),
                (bias.to_vec(), bias.shape().to_vec()),
            );
        }

        state
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;
    use crate::{
        arch::activations::ActFn,
        initialization::{ChainedParamGen, ConstParamGen, ParamGen},
    };

    fn two_layers() -> Sequential {
        Sequential::new([
            Layer::dense("fc1", (2, 3), Some(ActFn::relu())),
            Layer::dense("fc2", (3, 2), None),
            Layer::softmax(2),
        ])
    }

    #[test]
    fn starts_in_train_mode() {
        let mut model = two_layers();
        assert_eq!(model.mode(), Mode::Train);

        model.eval();
        assert_eq!(model.mode(), Mode::Eval);

        model.train();
        assert_eq!(model.mode(), Mode::Train);
    }

    #[test]
    fn size_counts_dense_params() {
        assert_eq!(two_layers().size(), 3 * 3 + 4 * 2);
    }

    #[test]
    fn state_dict_names_and_shapes() {
        let state = two_layers().state_dict();
        let names: Vec<_> = state.keys().map(String::as_str).collect();

        assert_eq!(names, ["fc1.bias", "fc1.weight", "fc2.bias", "fc2.weight"]);
        assert_eq!(state["fc1.weight"].1, [3, 2]);
        assert_eq!(state["fc2.bias"].1, [2]);
    }

    #[test]
    fn init_layer_by_layer() {
        let mut model = Sequential::new([
            Layer::dense("a", (1, 1), None),
            Layer::dense("b", (1, 1), None),
        ]);
        let param_gens: Vec<Box<dyn ParamGen>> = vec![
            Box::new(ConstParamGen::new(2., 1)),
            Box::new(ConstParamGen::new(1., 1)),
            Box::new(ConstParamGen::new(3., 1)),
            Box::new(ConstParamGen::new(0., 1)),
        ];
        let mut param_gen = ChainedParamGen::new(param_gens);
        model.init(&mut param_gen).unwrap();

        let state = model.state_dict();
        assert_eq!(state["a.weight"].0, [2.]);
        assert_eq!(state["a.bias"].0, [1.]);
        assert_eq!(state["b.weight"].0, [3.]);

        let y = model.forward(array![[1.], [-1.]].view()).unwrap();
        assert_eq!(y, array![[9.], [-3.]]);
    }

    #[test]
    fn empty_model_fails() {
        let model = Sequential::new(Vec::<Layer>::new());
        assert!(model.forward(array![[1.]].view()).is_err());
    }
}
