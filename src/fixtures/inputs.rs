use formats::npy;
use ndarray::{Array2, array};
use ndarray_rand::{RandomExt, rand_distr::StandardNormal};
use rand::Rng;

use crate::{GeneratorConfig, Result};

pub const LINEAR_INPUT: &str = "linear_input.npy";
pub const CLASSIFIER_INPUT: &str = "classifier_input.npy";
pub const BATCH_INPUT: &str = "batch_input.npy";

/// The arrays inference engines are fed in their tests, by file name.
///
/// The first two are fixed, the batch is drawn from a standard normal distribution.
pub fn test_inputs<R: Rng>(rng: &mut R) -> [(&'static str, Array2<f32>); 3] {
    [
        (LINEAR_INPUT, array![[1.0, 2.0]]),
        (CLASSIFIER_INPUT, array![[0.5, -0.3, 1.2, -0.8]]),
        (BATCH_INPUT, Array2::random_using((4, 2), StandardNormal, rng)),
    ]
}

/// Writes every test input as a `.npy` file.
pub fn produce_inputs(config: &GeneratorConfig) -> Result<()> {
    println!();
    println!("Creating test data files...");

    let rng = config.rng();
    for (file_name, array) in test_inputs(&mut *rng.borrow_mut()) {
        npy::write_npy(config.path(file_name), &array)?;
        println!("Created test data: {file_name} (shape: {:?})", array.shape());
    }

    Ok(())
}
