//! Configuration management for ensdex.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{CoreError, Result};

/// Default number of label hashes sent to the preimage service per call
pub const DEFAULT_PREIMAGE_BATCH_SIZE: usize = 500;

/// Default number of owner lookups in flight during a listing
pub const DEFAULT_OWNER_LOOKUP_CONCURRENCY: usize = 32;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// First block scanned for ownership events. `None` uses the
    /// registry's deployment block as reported by the ledger.
    pub start_block: Option<u64>,
    pub preimage_batch_size: usize,
    pub owner_lookup_concurrency: usize,
    /// JSON array of label strings known without the preimage service
    pub known_labels_path: Option<PathBuf>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self::default_config()
    }
}

impl RegistryConfig {
    #[cfg(feature = "toml")]
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!(path = %path.display(), "Loaded registry configuration");
        Ok(config)
    }

    #[cfg(feature = "toml")]
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn default_config() -> Self {
        Self {
            start_block: None,
            preimage_batch_size: DEFAULT_PREIMAGE_BATCH_SIZE,
            owner_lookup_concurrency: DEFAULT_OWNER_LOOKUP_CONCURRENCY,
            known_labels_path: None,
        }
    }

    /// Override the scan start block.
    pub fn with_start_block(mut self, block: u64) -> Self {
        self.start_block = Some(block);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.preimage_batch_size == 0 {
            return Err(CoreError::Config(
                "preimage_batch_size must be at least 1".to_string(),
            ));
        }
        if self.owner_lookup_concurrency == 0 {
            return Err(CoreError::Config(
                "owner_lookup_concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn known_labels_path(&self) -> Option<&Path> {
        self.known_labels_path.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = RegistryConfig::default_config();
        assert!(config.validate().is_ok());
        assert_eq!(config.start_block, None);
    }

    #[test]
    fn test_zero_limits_rejected() {
        let mut config = RegistryConfig::default_config();
        config.preimage_batch_size = 0;
        assert!(matches!(config.validate(), Err(CoreError::Config(_))));

        let mut config = RegistryConfig::default_config();
        config.owner_lookup_concurrency = 0;
        assert!(config.validate().is_err());
    }

    #[cfg(feature = "toml")]
    #[test]
    fn test_partial_toml_fills_defaults() {
        let config = RegistryConfig::from_toml_str("start_block = 3327417\n").unwrap();
        assert_eq!(config.start_block, Some(3327417));
        assert_eq!(config.preimage_batch_size, DEFAULT_PREIMAGE_BATCH_SIZE);
    }

    #[cfg(feature = "toml")]
    #[test]
    fn test_toml_validation_applies() {
        assert!(RegistryConfig::from_toml_str("owner_lookup_concurrency = 0\n").is_err());
    }

    #[cfg(feature = "toml")]
    #[test]
    fn test_from_file() {
        let path = std::env::temp_dir().join(format!("ensdex-config-{}.toml", std::process::id()));
        std::fs::write(
            &path,
            "preimage_batch_size = 10\nknown_labels_path = \"labels.json\"\n",
        )
        .unwrap();
        let config = RegistryConfig::from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(config.preimage_batch_size, 10);
        assert_eq!(config.known_labels_path(), Some(Path::new("labels.json")));
    }
}
