use crate::error::{ChunkerError, Result};
use serde::{Deserialize, Serialize};

/// Configuration for symbol chunking
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ChunkerConfig {
    /// Maximum lines per chunk (hard limit; the last chunk may be shorter)
    pub max_lines: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self { max_lines: 200 }
    }
}

impl ChunkerConfig {
    #[must_use]
    pub const fn with_max_lines(max_lines: usize) -> Self {
        Self { max_lines }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_lines == 0 {
            return Err(ChunkerError::InvalidConfig(
                "max_lines must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = ChunkerConfig::default();
        assert_eq!(config.max_lines, 200);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_max_lines_is_rejected() {
        assert!(ChunkerConfig::with_max_lines(0).validate().is_err());
        assert!(ChunkerConfig::with_max_lines(1).validate().is_ok());
    }
}
