use std::{cell::RefCell, rc::Rc};

use formats::onnx;
use machine_learning::{
    arch::{Sequential, activations::ActFn, layers::Layer},
    initialization::{ChainedParamGen, ParamGen, RandParamGen},
};
use ndarray::Array2;
use ndarray_rand::{RandomExt, rand_distr::StandardNormal};
use rand::Rng;

use crate::{GeneratorConfig, Result};

pub const CLASSIFIER_ONNX: &str = "simple_classifier.onnx";

/// Builds the 4 -> 8 -> ReLU -> 3 -> Softmax classifier, ready for inference.
///
/// Every dense layer draws its weights and biases uniformly from `[-1/sqrt(fan_in),
/// 1/sqrt(fan_in))`.
///
/// # Arguments
/// * `rng` - The random number generator every layer draws its parameters from.
pub fn classifier_model<R: Rng + 'static>(rng: Rc<RefCell<R>>) -> Result<Sequential> {
    let mut model = Sequential::new([
        Layer::dense("fc1", (4, 8), Some(ActFn::relu())),
        Layer::dense("fc2", (8, 3), None),
        Layer::softmax(3),
    ]);

    let mut param_gens: Vec<Box<dyn ParamGen>> = Vec::new();
    for layer in model.layers() {
        if let Layer::Dense(dense) = layer {
            let param_gen = RandParamGen::fan_in_uniform(rng.clone(), dense.size(), dense.dim().0)?;
            param_gens.push(Box::new(param_gen));
        }
    }

    model.init(&mut ChainedParamGen::new(param_gens))?;
    model.eval();
    Ok(model)
}

/// Writes `simple_classifier.onnx`, after printing the class probabilities of a random input.
pub fn produce_classifier(config: &GeneratorConfig) -> Result<()> {
    println!();
    println!("Creating simple classifier...");

    let rng = config.rng();
    let model = classifier_model(rng.clone())?;

    let input = Array2::random_using((1, 4), StandardNormal, &mut *rng.borrow_mut());
    let output = model.forward(input.view())?;

    let path = config.path(CLASSIFIER_ONNX);
    onnx::export_to_file(&model, &config.export, &path)?;
    println!("Created ONNX classifier: {}", path.display());

    println!("Test input shape: {:?}", input.shape());
    println!("Test output shape: {:?}", output.shape());
    println!("Output probabilities: {output}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn rng(seed: u64) -> Rc<RefCell<StdRng>> {
        Rc::new(RefCell::new(StdRng::seed_from_u64(seed)))
    }

    #[test]
    fn parameters_within_fan_in_bounds() {
        let state = classifier_model(rng(1)).unwrap().state_dict();

        let (fc1, shape) = &state["fc1.weight"];
        assert_eq!(shape, &[8, 4]);
        assert!(fc1.iter().all(|v| v.abs() <= 0.5));

        let (fc2, shape) = &state["fc2.bias"];
        assert_eq!(shape, &[3]);
        assert!(fc2.iter().all(|v| v.abs() <= 1. / 8f32.sqrt()));
    }

    #[test]
    fn outputs_probabilities() {
        let model = classifier_model(rng(2)).unwrap();
        let x = Array2::random_using((5, 4), StandardNormal, &mut StdRng::seed_from_u64(3));
        let y = model.forward(x.view()).unwrap();

        assert_eq!(y.shape(), [5, 3]);
        for row in y.rows() {
            assert!((row.sum() - 1.).abs() < 1e-5);
            assert!(row.iter().all(|&p| p >= 0.));
        }
    }

    #[test]
    fn seed_fixes_parameters() {
        let a = classifier_model(rng(9)).unwrap().state_dict();
        let b = classifier_model(rng(9)).unwrap().state_dict();

        assert_eq!(a, b);
    }
}
