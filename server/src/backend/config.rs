//! # Configuration
//!
//! Runtime settings live in `config.yaml` inside the data directory. The file
//! is created with defaults on first start; a missing key falls back to its
//! default. Two environment variables take precedence over the file:
//!
//! - `ALLOWANCE_LEDGER_DATA_DIR` - data directory
//! - `ALLOWANCE_LEDGER_BIND` - listen address of the REST server
//!
//! ```yaml
//! bind_address: 127.0.0.1:3000
//! default_daily_allowance: '1'
//! storage: file
//! git_versioning: true
//! utc_offset_minutes: null
//! ```

use anyhow::{anyhow, Context, Result};
use chrono::FixedOffset;
use log::{info, warn};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "config.yaml";
pub const DATA_DIR_ENV: &str = "ALLOWANCE_LEDGER_DATA_DIR";
pub const BIND_ENV: &str = "ALLOWANCE_LEDGER_BIND";

/// Which [`LedgerStore`](crate::backend::storage::LedgerStore) backend to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageKind {
    File,
    Sqlite,
    Memory,
}

/// Settings persisted in `config.yaml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Never read from the file; always the directory the file was loaded from
    #[serde(skip)]
    pub data_directory: PathBuf,
    pub bind_address: String,
    /// Allowance written into a freshly initialized account
    pub default_daily_allowance: Decimal,
    pub storage: StorageKind,
    /// Commit every change of the file store to git
    pub git_versioning: bool,
    /// Fixed zone for day boundaries; the machine's local zone when unset
    pub utc_offset_minutes: Option<i32>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            data_directory: PathBuf::new(),
            bind_address: "127.0.0.1:3000".to_string(),
            default_daily_allowance: Decimal::ONE,
            storage: StorageKind::File,
            git_versioning: true,
            utc_offset_minutes: None,
        }
    }
}

impl LedgerConfig {
    /// Data directory from the environment, or `~/Documents/Daily Allowance`
    pub fn default_data_directory() -> Result<PathBuf> {
        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            return Ok(PathBuf::from(dir));
        }
        let documents = dirs::document_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| anyhow!("Could not determine a home or documents directory"))?;
        Ok(documents.join("Daily Allowance"))
    }

    /// Load the configuration of the default data directory and apply
    /// environment overrides
    pub fn load() -> Result<Self> {
        let mut config = Self::load_or_create(Self::default_data_directory()?)?;
        if let Ok(bind) = std::env::var(BIND_ENV) {
            info!("Bind address overridden by {}: {}", BIND_ENV, bind);
            config.bind_address = bind;
        }
        Ok(config)
    }

    /// Read `config.yaml` from `data_directory`, writing defaults when absent
    pub fn load_or_create<P: AsRef<Path>>(data_directory: P) -> Result<Self> {
        let data_directory = data_directory.as_ref().to_path_buf();
        fs::create_dir_all(&data_directory)
            .with_context(|| format!("Failed to create data directory {}", data_directory.display()))?;
        let path = data_directory.join(CONFIG_FILE);

        let mut config = if path.exists() {
            let content = fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                warn!("{} is empty, using defaults", path.display());
                Self::default()
            } else {
                serde_yaml::from_str(&content)
                    .with_context(|| format!("Failed to parse {}", path.display()))?
            }
        } else {
            let config = Self::default();
            fs::write(&path, serde_yaml::to_string(&config)?)?;
            info!("Created default configuration at {}", path.display());
            config
        };
        config.data_directory = data_directory;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.default_daily_allowance <= Decimal::ZERO {
            return Err(anyhow!(
                "default_daily_allowance must be positive, got {}",
                self.default_daily_allowance
            ));
        }
        self.utc_offset()?;
        Ok(())
    }

    /// Fixed zone for the clock, if one is configured
    pub fn utc_offset(&self) -> Result<Option<FixedOffset>> {
        self.utc_offset_minutes
            .map(|minutes| {
                FixedOffset::east_opt(minutes * 60)
                    .ok_or_else(|| anyhow!("utc_offset_minutes out of range: {}", minutes))
            })
            .transpose()
    }
}
