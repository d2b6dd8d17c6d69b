use formats::{onnx, weights};
use log::{info, warn};
use machine_learning::{
    arch::{Sequential, layers::Layer},
    initialization::{ChainedParamGen, ConstParamGen, ParamGen},
};
use ndarray::Array2;
use ndarray_rand::{RandomExt, rand_distr::StandardNormal};

use crate::{GeneratorConfig, Result};

pub const LINEAR_ONNX: &str = "simple_linear.onnx";
pub const LINEAR_SAFETENSORS: &str = "simple_linear.safetensors";

const WEIGHT: f32 = 0.5;
const BIAS: f32 = 0.1;

/// Builds the 2 -> 1 linear model with every weight set to 0.5 and the bias to 0.1, ready for
/// inference.
pub fn linear_model() -> Result<Sequential> {
    let param_gens: Vec<Box<dyn ParamGen>> = vec![
        Box::new(ConstParamGen::new(WEIGHT, 2)),
        Box::new(ConstParamGen::new(BIAS, 1)),
    ];

    let mut model = Sequential::new([Layer::dense("linear", (2, 1), None)]);
    model.init(&mut ChainedParamGen::new(param_gens))?;
    model.eval();
    Ok(model)
}

/// Writes `simple_linear.onnx` and, when this build supports it, `simple_linear.safetensors`.
///
/// A random input is run through the model first and printed along with its output, as a sanity
/// check of the exported parameters. It is not persisted.
///
/// # Arguments
/// * `config` - The output directory, seed and export options.
///
/// # Returns
/// An error if the model can't be built or one of the files can't be written.
pub fn produce_linear(config: &GeneratorConfig) -> Result<()> {
    println!("Creating simple linear model...");

    let model = linear_model()?;
    let rng = config.rng();
    let input = Array2::random_using((1, 2), StandardNormal, &mut *rng.borrow_mut());
    let output = model.forward(input.view())?;

    let path = config.path(LINEAR_ONNX);
    onnx::export_to_file(&model, &config.export, &path)?;
    println!("Created ONNX model: {}", path.display());

    if weights::is_available() {
        let path = config.path(LINEAR_SAFETENSORS);
        weights::save_state_dict(&model.state_dict(), &path)?;
        info!("saved {} parameters to {}", model.size(), path.display());
        println!("Created SafeTensors model: {}", path.display());
    } else {
        warn!("built without safetensors support");
        println!("SafeTensors not available, skipping SafeTensors export");
        println!("  Rebuild with `--features safetensors` to enable it");
    }

    println!("Test input: {input}");
    println!("Test output: {output}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use machine_learning::arch::Mode;
    use ndarray::arr2;

    use super::*;

    #[test]
    fn fixed_parameters() {
        let model = linear_model().unwrap();
        let state = model.state_dict();

        assert_eq!(model.mode(), Mode::Eval);
        assert_eq!(state["linear.weight"], (vec![0.5, 0.5], vec![1, 2]));
        assert_eq!(state["linear.bias"], (vec![0.1], vec![1]));
    }

    #[test]
    fn forward() {
        let model = linear_model().unwrap();
        let y = model.forward(arr2(&[[1., 2.]]).view()).unwrap();

        assert!((y[[0, 0]] - 1.6).abs() < 1e-6);
    }
}
