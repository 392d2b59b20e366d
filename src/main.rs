use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use irisd::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "irisd=info,tower_http=info".into());
    let registry = tracing_subscriber::registry().with(filter);
    if cli.json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    match cli.command {
        Commands::Serve {
            config,
            host,
            port,
            stub,
        } => {
            irisd::cli::serve(config, host, port, stub).await?;
        }
        Commands::Predict {
            model,
            features,
            config,
            stub,
        } => {
            irisd::cli::predict(model, features, config, stub).await?;
        }
        Commands::List { config, verbose } => {
            irisd::cli::list(config, verbose).await?;
        }
    }

    Ok(())
}
