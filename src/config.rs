use std::{
    cell::RefCell,
    path::{Path, PathBuf},
    rc::Rc,
};

use formats::onnx::ExportOptions;
use rand::{SeedableRng, rngs::StdRng};

/// Where and how the fixtures get generated.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// The directory every fixture is written to.
    pub out_dir: PathBuf,
    /// Seeds every random draw when set, otherwise each run draws from the OS entropy source.
    pub seed: Option<u64>,
    pub export: ExportOptions,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from("."),
            seed: None,
            export: ExportOptions::default(),
        }
    }
}

impl GeneratorConfig {
    /// Creates a config writing to `out_dir` with the default export options.
    pub fn new<P: AsRef<Path>>(out_dir: P) -> Self {
        Self {
            out_dir: out_dir.as_ref().to_path_buf(),
            ..Default::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Returns the path of a fixture file inside the output directory.
    pub fn path(&self, file_name: &str) -> PathBuf {
        self.out_dir.join(file_name)
    }

    /// Creates a fresh random number generator, shareable between parameter generators.
    ///
    /// Every call with a seed yields the same sequence, so each fixture is reproducible on its
    /// own regardless of which other fixtures were generated before it.
    pub fn rng(&self) -> Rc<RefCell<StdRng>> {
        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        Rc::new(RefCell::new(rng))
    }
}
