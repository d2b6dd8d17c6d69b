//! Generates the model and input fixtures used by the inference engine test suites.
//!
//! A run writes a fixed-parameter linear model (ONNX and safetensors), a randomly initialized
//! classifier (ONNX) and three `.npy` input arrays, then reports what ended up on disk.

pub mod config;
pub mod error;
pub mod fixtures;
mod summary;

use std::fs;

use log::info;

pub use config::GeneratorConfig;
pub use error::{FixtureErr, Result};
pub use summary::{Entry, Summary};

/// Produces every fixture in order, stopping at the first failure.
///
/// Files written before a failure are left in place.
///
/// # Arguments
/// * `config` - The output directory, seed and export options.
///
/// # Returns
/// The manifest of the output directory once every fixture was written.
pub fn run(config: &GeneratorConfig) -> Result<Summary> {
    fs::create_dir_all(&config.out_dir)?;
    info!("writing fixtures to {}", config.out_dir.display());

    fixtures::produce_linear(config)?;
    fixtures::produce_classifier(config)?;
    fixtures::produce_inputs(config)?;

    Ok(Summary::collect(config))
}
