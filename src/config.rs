//! Workflow configuration loaded from TOML. Every field has a default so an
//! empty file is a valid configuration.
use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(default, rename_all = "snake_case")]
pub struct WorkflowConfig {
    pub storage: StorageConfig,
    pub load: LoadConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "snake_case")]
pub struct StorageConfig {
    /// Prefix of every document key, e.g. `sist_od`.
    pub key_prefix: String,
    /// Sled database directory. In-memory storage when absent.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(default, rename_all = "snake_case")]
pub struct LoadConfig {
    pub on_malformed: MalformedPolicy,
}

/// What loading does with a record that fails validation.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MalformedPolicy {
    /// Fail the whole load.
    #[default]
    Reject,
    /// Leave the record out of reads and carry it through writes untouched.
    Skip,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            key_prefix: "sist_".to_string(),
            path: None,
        }
    }
}

impl WorkflowConfig {
    pub fn from_toml_str(raw: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(raw).context("invalid workflow config")?;
        if config.storage.key_prefix.is_empty() {
            anyhow::bail!("storage.key_prefix must not be empty");
        }
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_toml_str(&raw)
    }
}
