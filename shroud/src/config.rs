// Copyright (c) 2024 Shroud Foundation

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::consensus::ValidationConfig;
use crate::mempool::MempoolConfig;
use crate::transaction::TxLimits;

/// Main configuration for Shroud
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub validation: ValidationSection,
    #[serde(default)]
    pub mempool: MempoolConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Ledger directory; `<data dir>/ledger` when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// LMDB map size in MiB
    pub map_size_mb: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            path: None,
            map_size_mb: 1024,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationSection {
    pub max_inputs: usize,
    pub max_outputs: usize,
    pub max_future_drift_secs: u64,

    /// Hex-encoded ed25519 public keys allowed to sign blocks
    pub authorities: Vec<String>,
}

impl Default for ValidationSection {
    fn default() -> Self {
        let defaults = ValidationConfig::default();
        Self {
            max_inputs: defaults.limits.max_inputs,
            max_outputs: defaults.limits.max_outputs,
            max_future_drift_secs: defaults.max_future_drift_secs,
            authorities: Vec::new(),
        }
    }
}

impl ValidationSection {
    pub fn limits(&self) -> TxLimits {
        TxLimits {
            max_inputs: self.max_inputs,
            max_outputs: self.max_outputs,
        }
    }

    /// Decode the authority keys into a [`ValidationConfig`].
    pub fn to_validation_config(&self) -> Result<ValidationConfig> {
        let authorities = self
            .authorities
            .iter()
            .map(|key| parse_authority(key))
            .collect::<Result<Vec<_>>>()?;

        Ok(ValidationConfig {
            limits: self.limits(),
            max_future_drift_secs: self.max_future_drift_secs,
            authorities,
        })
    }
}

fn parse_authority(key: &str) -> Result<[u8; 32]> {
    let bytes = hex::decode(key).with_context(|| format!("Invalid authority key {}", key))?;
    match <[u8; 32]>::try_from(bytes.as_slice()) {
        Ok(key) => Ok(key),
        Err(_) => bail!("Authority key {} is {} bytes, expected 32", key, bytes.len()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load config from a file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Save config to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, contents)
            .with_context(|| format!("Failed to write config to {}", path.display()))
    }

    /// Check if config file exists
    pub fn exists(path: &Path) -> bool {
        path.exists()
    }

    /// Ledger directory for a config loaded from `config_path`
    pub fn ledger_path(&self, config_path: &Path) -> PathBuf {
        match &self.ledger.path {
            Some(path) => path.clone(),
            None => ledger_db_path_from_config(config_path),
        }
    }

    pub fn map_size_bytes(&self) -> usize {
        self.ledger.map_size_mb.saturating_mul(1024 * 1024)
    }
}

/// Get the default data directory path
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("shroud")
}

/// Get the default config file path
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("shroud")
        .join("config.toml")
}

/// Get the ledger database path from config file path
pub fn ledger_db_path_from_config(config_path: &Path) -> PathBuf {
    if config_path == default_config_path() {
        return default_data_dir().join("ledger");
    }
    config_path
        .parent()
        .unwrap_or(config_path)
        .join("ledger")
}
