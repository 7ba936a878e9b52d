use crate::error::{EmbedderError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Embedding provider capability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedProviderKind {
    /// Local ONNX transformer model
    Local,
    /// Remote embeddings API
    Remote,
    /// Deterministic content-hash vectors (no model required)
    Hash,
}

/// Embedder configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedConfig {
    /// Provider selection
    pub provider: EmbedProviderKind,

    /// Model identifier (local model directory name, or remote model name)
    pub model: String,

    /// Chunks per provider request
    pub batch_size: usize,

    /// Prefer the quantized model artifact (local provider)
    pub quantized: bool,

    /// Output vector dimension
    pub dimension: usize,

    /// Root directory holding local model assets
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_dir: Option<PathBuf>,

    /// Remote API endpoint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Remote API bearer token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self {
            provider: EmbedProviderKind::Hash,
            model: "bge-small".to_string(),
            batch_size: 32,
            quantized: false,
            dimension: 256,
            model_dir: None,
            endpoint: None,
            api_key: None,
        }
    }
}

impl EmbedConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(EmbedderError::InvalidConfig(
                "batch_size must be > 0".to_string(),
            ));
        }
        if self.dimension == 0 {
            return Err(EmbedderError::InvalidConfig(
                "dimension must be > 0".to_string(),
            ));
        }
        match self.provider {
            EmbedProviderKind::Local => {
                if self.model_dir.is_none() {
                    return Err(EmbedderError::InvalidConfig(
                        "local provider requires model_dir".to_string(),
                    ));
                }
            }
            EmbedProviderKind::Remote => {
                if self.endpoint.is_none() {
                    return Err(EmbedderError::InvalidConfig(
                        "remote provider requires endpoint".to_string(),
                    ));
                }
            }
            EmbedProviderKind::Hash => {}
        }
        Ok(())
    }
}
