use ndarray::{Array2, ArrayView2};

use super::{Dense, Softmax};
use crate::{Result, arch::activations::ActFn};

#[derive(Clone, Debug)]
pub enum Layer {
    Dense(Dense),
    Softmax(Softmax),
}

impl Layer {
    pub fn dense(name: impl Into<String>, dim: (usize, usize), act_fn: Option<ActFn>) -> Self {
        Self::Dense(Dense::new(name, dim, act_fn))
    }

    pub fn softmax(dim: usize) -> Self {
        Self::Softmax(Softmax::new(dim))
    }

    /// Returns the amount of trainable parameters of this layer.
    pub fn size(&self) -> usize {
        match self {
            Self::Dense(l) => l.size(),
            Self::Softmax(_) => 0,
        }
    }

    /// Returns the width of the output of this layer.
    pub fn output_dim(&self) -> usize {
        match self {
            Self::Dense(l) => l.dim().1,
            Self::Softmax(l) => l.dim(),
        }
    }

    pub fn forward(&self, x: ArrayView2<f32>) -> Result<Array2<f32>> {
        match self {
            Self::Dense(l) => l.forward(x),
            Self::Softmax(l) => l.forward(x),
        }
    }
}
