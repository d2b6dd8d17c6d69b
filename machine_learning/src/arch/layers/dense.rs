use ndarray::{linalg, prelude::*};

use crate::{MlErr, Result, arch::activations::ActFn, initialization::ParamGen};

/// A fully connected layer computing `x · Wᵀ + b`, optionally followed by an activation.
///
/// The weights are stored as an `(out, in)` matrix, the layout inference engines expect for
/// `<name>.weight` tensors.
#[derive(Clone, Debug)]
pub struct Dense {
    name: String,
    dim: (usize, usize),
    act_fn: Option<ActFn>,
    weight: Array2<f32>,
    bias: Array1<f32>,
}

impl Dense {
    /// Creates a new `Dense` layer with every parameter set to zero.
    ///
    /// # Arguments
    /// * `name` - The prefix used to name this layer's parameters.
    /// * `dim` - The `(input, output)` dimensions.
    /// * `act_fn` - An optional element-wise activation.
    ///
    /// # Returns
    /// A new `Dense` instance.
    pub fn new(name: impl Into<String>, dim: (usize, usize), act_fn: Option<ActFn>) -> Self {
        Self {
            name: name.into(),
            dim,
            act_fn,
            weight: Array2::zeros((dim.1, dim.0)),
            bias: Array1::zeros(dim.1),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the `(input, output)` dimensions.
    pub fn dim(&self) -> (usize, usize) {
        self.dim
    }

    pub fn act_fn(&self) -> Option<&ActFn> {
        self.act_fn.as_ref()
    }

    /// Returns the size of this layer.
    ///
    /// # Returns
    /// The amount of parameters this layer has.
    pub fn size(&self) -> usize {
        (self.dim.0 + 1) * self.dim.1
    }

    pub fn weight(&self) -> ArrayView2<'_, f32> {
        self.weight.view()
    }

    pub fn bias(&self) -> ArrayView1<'_, f32> {
        self.bias.view()
    }

    /// Overwrites the parameters of this layer, weights first and biases last.
    ///
    /// # Arguments
    /// * `param_gen` - The generator to draw the new parameters from.
    ///
    /// # Returns
    /// An error if the generator runs out of values before the layer is full.
    pub fn init(&mut self, param_gen: &mut dyn ParamGen) -> Result<()> {
        let (n_in, n_out) = self.dim;

        let weight = self.draw(param_gen, n_in * n_out)?;
        let bias = self.draw(param_gen, n_out)?;

        self.weight = Array2::from_shape_vec((n_out, n_in), weight).map_err(|_| {
            MlErr::SizeMismatch {
                what: "dense weights",
                got: self.weight.len(),
                expected: n_in * n_out,
            }
        })?;
        self.bias = Array1::from(bias);
        Ok(())
    }

    /// Makes a forward pass through the layer.
    ///
    /// # Arguments
    /// * `x` - A batch of inputs, one sample per row.
    ///
    /// # Returns
    /// The layer's output or an error if `x` has the wrong width.
    pub fn forward(&self, x: ArrayView2<f32>) -> Result<Array2<f32>> {
        if x.ncols() != self.dim.0 {
            return Err(MlErr::SizeMismatch {
                what: "dense layer input",
                got: x.ncols(),
                expected: self.dim.0,
            });
        }

        let mut z = Array2::zeros((x.nrows(), self.dim.1));
        linalg::general_mat_mul(1.0, &x, &self.weight.t(), 0.0, &mut z);
        z += &self.bias;

        if let Some(act_fn) = &self.act_fn {
            z.mapv_inplace(|z| act_fn.f(z));
        }

        Ok(z)
    }

    fn draw(&self, param_gen: &mut dyn ParamGen, n: usize) -> Result<Vec<f32>> {
        let mut values = Vec::with_capacity(n);

        while values.len() < n {
            let Some(sample) = param_gen.sample(n - values.len()) else {
                return Err(MlErr::ParamGenExhausted {
                    layer: self.name.clone(),
                    got: values.len(),
                    expected: n,
                });
            };

            values.extend(sample);
        }

        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::initialization::ConstParamGen;

    #[test]
    fn starts_zeroed() {
        let dense = Dense::new("fc", (3, 2), None);

        assert_eq!(dense.size(), 8);
        assert_eq!(dense.weight().dim(), (2, 3));
        assert!(dense.weight().iter().all(|&w| w == 0.));
        assert_eq!(dense.bias().len(), 2);
    }

    #[test]
    fn affine_forward() {
        let mut dense = Dense::new("linear", (2, 1), None);
        dense.init(&mut ConstParamGen::new(0.5, 3)).unwrap();

        let y = dense.forward(array![[1., 2.], [0., 0.]].view()).unwrap();
        assert_eq!(y, array![[2.], [0.5]]);
    }

    #[test]
    fn relu_forward() {
        let mut dense = Dense::new("fc", (1, 2), Some(ActFn::relu()));
        dense.init(&mut ConstParamGen::new(1., 4)).unwrap();

        let y = dense.forward(array![[-3.], [1.]].view()).unwrap();
        assert_eq!(y, array![[0., 0.], [2., 2.]]);
    }

    #[test]
    fn wrong_input_width() {
        let dense = Dense::new("fc", (4, 8), None);
        let err = dense.forward(Array2::zeros((1, 3)).view()).unwrap_err();

        assert!(matches!(
            err,
            MlErr::SizeMismatch {
                got: 3,
                expected: 4,
                ..
            }
        ));
    }

    #[test]
    fn exhausted_generator() {
        let mut dense = Dense::new("fc", (2, 2), None);
        let err = dense.init(&mut ConstParamGen::new(1., 5)).unwrap_err();

        assert!(matches!(
            err,
            MlErr::ParamGenExhausted {
                got: 1,
                expected: 2,
                ..
            }
        ));
    }
}
