use std::fs;

use formats::{
    detect::FileFormat,
    npy,
    onnx::{self, Dim, OnnxModel},
};
use inference_fixtures::{GeneratorConfig, fixtures};
use ndarray::{arr2, array};

fn generate(config: &GeneratorConfig) -> inference_fixtures::Summary {
    inference_fixtures::run(config).unwrap()
}

#[cfg(feature = "safetensors")]
#[test]
fn writes_every_fixture() {
    let dir = tempfile::tempdir().unwrap();
    let summary = generate(&GeneratorConfig::new(dir.path()));

    assert!(summary.all_created());
    for name in fixtures::EXPECTED_FILES {
        assert!(fs::metadata(dir.path().join(name)).unwrap().len() > 0, "{name} is empty");
    }
    assert!(!summary.to_string().contains("not created"));

    let formats: Vec<_> = summary.entries().iter().map(|e| e.format).collect();
    assert_eq!(
        formats,
        [
            Some(FileFormat::Onnx),
            Some(FileFormat::SafeTensors),
            Some(FileFormat::Onnx),
            Some(FileFormat::Npy),
            Some(FileFormat::Npy),
            Some(FileFormat::Npy),
        ]
    );
}

#[cfg(feature = "safetensors")]
#[test]
fn rerun_recreates_deleted_files() {
    let dir = tempfile::tempdir().unwrap();
    let config = GeneratorConfig::new(dir.path());

    generate(&config);
    for name in fixtures::EXPECTED_FILES {
        fs::remove_file(dir.path().join(name)).unwrap();
    }

    let summary = generate(&config);
    assert!(summary.all_created());
    assert!(summary.entries().iter().all(|e| e.size.unwrap_or(0) > 0));
}

#[cfg(feature = "safetensors")]
#[test]
fn linear_fixtures_are_reproducible() {
    let (a, b) = (tempfile::tempdir().unwrap(), tempfile::tempdir().unwrap());
    generate(&GeneratorConfig::new(a.path()));
    generate(&GeneratorConfig::new(b.path()));

    for name in [fixtures::LINEAR_ONNX, fixtures::LINEAR_SAFETENSORS] {
        assert_eq!(
            fs::read(a.path().join(name)).unwrap(),
            fs::read(b.path().join(name)).unwrap(),
            "{name} differs between runs"
        );
    }
}

#[cfg(not(feature = "safetensors"))]
#[test]
fn runs_without_safetensors() {
    let dir = tempfile::tempdir().unwrap();
    let summary = generate(&GeneratorConfig::new(dir.path()));

    assert!(!summary.all_created());
    assert!(!dir.path().join(fixtures::LINEAR_SAFETENSORS).exists());
    assert_eq!(summary.to_string().matches("(not created)").count(), 1);
}

#[test]
fn input_arrays_hold_expected_values() {
    let dir = tempfile::tempdir().unwrap();
    generate(&GeneratorConfig::new(dir.path()));

    let linear = npy::read_npy(dir.path().join(fixtures::LINEAR_INPUT)).unwrap();
    let classifier = npy::read_npy(dir.path().join(fixtures::CLASSIFIER_INPUT)).unwrap();
    let batch = npy::read_npy(dir.path().join(fixtures::BATCH_INPUT)).unwrap();

    assert_eq!(linear, array![[1.0f32, 2.0]].into_dyn());
    assert_eq!(classifier, array![[0.5f32, -0.3, 1.2, -0.8]].into_dyn());
    assert_eq!(batch.shape(), [4, 2]);
}

#[test]
fn linear_onnx_computes_expected_output() {
    let dir = tempfile::tempdir().unwrap();
    generate(&GeneratorConfig::new(dir.path()));

    let model = OnnxModel::load(dir.path().join(fixtures::LINEAR_ONNX)).unwrap();
    let x = arr2(&[[1.0f32, 2.0]]).into_dyn();
    let y = onnx::evaluate(&model.graph, &[("input", x)]).unwrap();

    assert!((y["output"][[0, 0]] - 1.6).abs() < 1e-6);
}

#[test]
fn classifier_onnx_is_valid() {
    let dir = tempfile::tempdir().unwrap();
    generate(&GeneratorConfig::new(dir.path()));

    let model = OnnxModel::load(dir.path().join(fixtures::CLASSIFIER_ONNX)).unwrap();
    assert_eq!(model.opset_imports[0].version, 11);

    let batch = Dim::Param("batch_size".into());
    assert_eq!(model.graph.inputs[0].shape, [batch.clone(), Dim::Value(4)]);
    assert_eq!(model.graph.outputs[0].shape, [batch, Dim::Value(3)]);

    let input = npy::read_npy(dir.path().join(fixtures::BATCH_INPUT)).unwrap();
    let classifier_input = npy::read_npy(dir.path().join(fixtures::CLASSIFIER_INPUT)).unwrap();
    let y = onnx::evaluate(&model.graph, &[("input", classifier_input)]).unwrap();

    assert_eq!(input.shape(), [4, 2]);
    assert_eq!(y["output"].shape(), [1, 3]);
    assert!((y["output"].sum() - 1.).abs() < 1e-5);
}

#[test]
fn seeded_runs_are_identical() {
    let (a, b) = (tempfile::tempdir().unwrap(), tempfile::tempdir().unwrap());
    generate(&GeneratorConfig::new(a.path()).with_seed(7));
    generate(&GeneratorConfig::new(b.path()).with_seed(7));

    for name in [fixtures::CLASSIFIER_ONNX, fixtures::BATCH_INPUT] {
        assert_eq!(
            fs::read(a.path().join(name)).unwrap(),
            fs::read(b.path().join(name)).unwrap(),
            "{name} differs between seeded runs"
        );
    }
}

#[test]
fn unseeded_classifiers_are_all_valid() {
    let (a, b) = (tempfile::tempdir().unwrap(), tempfile::tempdir().unwrap());
    generate(&GeneratorConfig::new(a.path()));
    generate(&GeneratorConfig::new(b.path()));

    // the parameters may differ between runs, the graph layout may not
    let a = OnnxModel::load(a.path().join(fixtures::CLASSIFIER_ONNX)).unwrap();
    let b = OnnxModel::load(b.path().join(fixtures::CLASSIFIER_ONNX)).unwrap();

    assert_eq!(a.graph.nodes, b.graph.nodes);
    assert_eq!(a.graph.inputs, b.graph.inputs);
    let names = |m: &OnnxModel| -> Vec<String> {
        m.graph.initializers.iter().map(|t| t.name.clone()).collect()
    };
    assert_eq!(names(&a), names(&b));
}

#[test]
fn fails_when_output_dir_is_a_file() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("taken");
    fs::write(&file, b"").unwrap();

    assert!(inference_fixtures::run(&GeneratorConfig::new(&file)).is_err());
}
