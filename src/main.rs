use std::process::ExitCode;

use anyhow::{Context, Result};
use inference_fixtures::GeneratorConfig;

fn main() -> ExitCode {
    env_logger::init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error creating models: {e:#}");
            eprintln!("Make sure the working directory is writable");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    println!("Creating Test Models for Inference Engines");
    println!("==============================================");
    println!(
        "{} version: {}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );

    let config = GeneratorConfig::default();
    let summary = inference_fixtures::run(&config).context("failed to generate the fixtures")?;

    println!();
    print!("{summary}");
    println!();
    println!("Test models created successfully!");
    println!("You can now run the inference engine tests with these models.");
    Ok(())
}
