//! List models command

use std::path::PathBuf;

use anyhow::Result;

use crate::config::{Backend, ModelConfig, ServingConfig};

/// List configured models
pub async fn list(config: Option<PathBuf>, verbose: bool) -> Result<()> {
    let source = config
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "built-in defaults".to_string());
    let config = ServingConfig::load_or_default(config.as_deref())?;

    println!("Models in {}:\n", source);

    for model in &config.models {
        if verbose {
            print_model_details(model);
        } else {
            println!("  {} ({})", model.id, model.backend);
        }
    }

    Ok(())
}

fn print_model_details(model: &ModelConfig) {
    println!("  {}", model.id);
    println!("    Name: {}", model.name);
    if !model.version.is_empty() {
        println!("    Version: {}", model.version);
    }
    println!("    Backend: {}", model.backend);
    println!("    Input size: {}", model.input_size);

    if model.backend == Backend::Onnx {
        println!("    Path: {}", model.path.display());
        println!("    Tensors: {} -> {}", model.input_name, model.output_name);
        match std::fs::metadata(&model.path) {
            Ok(metadata) => {
                let size_kb = metadata.len() as f64 / 1024.0;
                if size_kb > 1024.0 {
                    println!("    Size: {:.2} MB", size_kb / 1024.0);
                } else {
                    println!("    Size: {:.2} KB", size_kb);
                }
            }
            Err(_) => println!("    Size: (artifact missing)"),
        }
    }

    println!();
}
