//! # Account Repository
//!
//! Stores the singleton account record in `account.yaml` inside the data
//! directory:
//!
//! ```yaml
//! current_balance: '200'
//! daily_allowance: '100'
//! last_processed_date: 2024-01-04
//! ```
//!
//! Writes go through a temp file and a rename.

use anyhow::{Context, Result};
use log::debug;
use std::fs;

use super::connection::CsvConnection;
use crate::backend::domain::models::AccountState;

#[derive(Clone)]
pub struct AccountRepository {
    connection: CsvConnection,
}

impl AccountRepository {
    pub fn new(connection: CsvConnection) -> Self {
        Self { connection }
    }

    /// Load the account; `None` before the first write
    pub fn load(&self) -> Result<Option<AccountState>> {
        let yaml_path = self.connection.account_file_path();
        if !yaml_path.exists() {
            debug!("No account file at {}", yaml_path.display());
            return Ok(None);
        }

        let yaml_content = fs::read_to_string(&yaml_path)?;
        let account: AccountState = serde_yaml::from_str(&yaml_content)
            .with_context(|| format!("Malformed account file {}", yaml_path.display()))?;
        Ok(Some(account))
    }

    pub fn save(&self, account: &AccountState) -> Result<()> {
        let yaml_path = self.connection.account_file_path();
        let yaml_content = serde_yaml::to_string(account)?;
        self.connection.write_atomically(&yaml_path, yaml_content.as_bytes())?;
        debug!("Saved account to {}", yaml_path.display());
        Ok(())
    }
}
