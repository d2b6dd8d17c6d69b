use ndarray::{Array2, ArrayView2};

use crate::{MlErr, Result};

/// Normalizes each row of its input into a probability distribution.
#[derive(Clone, Debug)]
pub struct Softmax {
    dim: usize,
}

impl Softmax {
    /// The axis the distribution is computed over.
    pub const AXIS: usize = 1;

    pub fn new(dim: usize) -> Self {
        Self { dim }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn forward(&self, x: ArrayView2<f32>) -> Result<Array2<f32>> {
        if x.ncols() != self.dim {
            return Err(MlErr::SizeMismatch {
                what: "softmax input",
                got: x.ncols(),
                expected: self.dim,
            });
        }

        Ok(softmax_rows(x))
    }
}

/// Row-wise softmax, shifted by each row's maximum to keep `exp` from overflowing.
pub fn softmax_rows(x: ArrayView2<f32>) -> Array2<f32> {
    let mut a = x.to_owned();

    for mut row in a.rows_mut() {
        let max = row.fold(f32::NEG_INFINITY, |m, &v| m.max(v));
        row.mapv_inplace(|v| (v - max).exp());
        let sum = row.sum();
        row.mapv_inplace(|v| v / sum);
    }

    a
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn rows_sum_to_one() {
        let softmax = Softmax::new(3);
        let y = softmax
            .forward(array![[1., 2., 3.], [1000., 1000., 1000.]].view())
            .unwrap();

        for row in y.rows() {
            assert!((row.sum() - 1.).abs() < 1e-6);
        }
        assert!(y[[0, 2]] > y[[0, 1]] && y[[0, 1]] > y[[0, 0]]);
        assert!((y[[1, 0]] - 1. / 3.).abs() < 1e-6);
    }

    #[test]
    fn wrong_width() {
        let softmax = Softmax::new(3);
        assert!(softmax.forward(array![[1., 2.]].view()).is_err());
    }
}
