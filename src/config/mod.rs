//! Configuration system for irisd
//!
//! A serving config lists the models to load at startup and the HTTP server
//! settings. It can be written in YAML or JSON; every field has a default, and
//! an absent file means "serve the reference iris model".

mod model;
mod server;

pub use model::{Backend, ModelConfig};
pub use server::ServerConfig;

use std::collections::HashSet;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};

/// Top-level irisd configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServingConfig {
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Models registered at startup
    #[serde(default = "default_models")]
    pub models: Vec<ModelConfig>,
}

fn default_models() -> Vec<ModelConfig> {
    vec![ModelConfig::iris()]
}

impl Default for ServingConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            models: default_models(),
        }
    }
}

impl ServingConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from a JSON file
    pub fn from_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Load a config file, picking the format from its extension, and validate it
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let config = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml(path),
            Some("json") => Self::from_json(path),
            other => Err(anyhow!(
                "unsupported config format: {}",
                other.unwrap_or("<none>")
            )),
        }
        .with_context(|| format!("failed to load config from {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Load `path` if given, otherwise fall back to the default config
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Reject configs that cannot produce a working registry
    pub fn validate(&self) -> Result<()> {
        if self.models.is_empty() {
            bail!("no models configured");
        }

        let mut seen = HashSet::new();
        for model in &self.models {
            if model.id.is_empty() {
                bail!("model id cannot be empty");
            }
            if !seen.insert(model.id.as_str()) {
                bail!("duplicate model id in config: {}", model.id);
            }
            if model.input_size == 0 {
                bail!("model '{}': input_size must be positive", model.id);
            }
            if model.backend == Backend::Onnx
                && (model.input_name.is_empty() || model.output_name.is_empty())
            {
                bail!("model '{}': input_name and output_name cannot be empty", model.id);
            }
        }
        Ok(())
    }

    /// Switch every model to the stub backend
    pub fn use_stub_backend(&mut self) {
        for model in &mut self.models {
            model.backend = Backend::Stub;
        }
    }

    /// Look up a configured model
    pub fn model(&self, id: &str) -> Option<&ModelConfig> {
        self.models.iter().find(|m| m.id == id)
    }
}
