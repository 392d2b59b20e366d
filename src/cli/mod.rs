//! CLI commands

mod list;
mod predict;
mod serve;

pub use list::list;
pub use predict::predict;
pub use serve::serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// irisd - inference server for tabular models
#[derive(Parser)]
#[command(name = "irisd")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the inference server
    Serve {
        /// Serving config (YAML or JSON). Defaults to the iris model.
        #[arg(long, short, env = "IRISD_CONFIG")]
        config: Option<PathBuf>,

        /// Host to bind to (overrides the config)
        #[arg(long, env = "IRISD_HOST")]
        host: Option<String>,

        /// Port to listen on (overrides the config)
        #[arg(long, env = "PORT")]
        port: Option<u16>,

        /// Serve every model with the stub backend
        #[arg(long)]
        stub: bool,
    },

    /// Run a single prediction locally and print the response
    Predict {
        /// Model id
        #[arg(long, short)]
        model: String,

        /// Comma-separated feature values, e.g. 5.1,3.5,1.4,0.2
        #[arg(
            long,
            short,
            required = true,
            value_delimiter = ',',
            allow_hyphen_values = true
        )]
        features: Vec<f64>,

        /// Serving config (YAML or JSON)
        #[arg(long, short, env = "IRISD_CONFIG")]
        config: Option<PathBuf>,

        /// Use the stub backend
        #[arg(long)]
        stub: bool,
    },

    /// List configured models
    List {
        /// Serving config (YAML or JSON)
        #[arg(long, short, env = "IRISD_CONFIG")]
        config: Option<PathBuf>,

        /// Show detailed information
        #[arg(long, short)]
        verbose: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_predict_args() {
        let cli = Cli::try_parse_from([
            "irisd",
            "predict",
            "--model",
            "iris_v1",
            "--features",
            "5.0,3.0,1.0,0.2",
            "--stub",
        ])
        .unwrap();
        match cli.command {
            Commands::Predict {
                model,
                features,
                stub,
                ..
            } => {
                assert_eq!(model, "iris_v1");
                assert_eq!(features, vec![5.0, 3.0, 1.0, 0.2]);
                assert!(stub);
            }
            _ => panic!("expected predict command"),
        }
    }
}
