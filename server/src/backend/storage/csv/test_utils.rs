//! Test utilities for the file store.
//!
//! [`TestEnvironment`] owns a temporary data directory that is removed when
//! the environment is dropped, even if the test panics.

use anyhow::Result;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use super::connection::CsvConnection;
use super::ledger_store::CsvLedgerStore;

pub struct TestEnvironment {
    /// Kept alive until drop
    _temp_dir: TempDir,
    pub connection: CsvConnection,
    pub base_path: PathBuf,
}

impl TestEnvironment {
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::with_prefix("allowance-ledger-")?;
        let base_path = temp_dir.path().to_path_buf();
        let connection = CsvConnection::new(&base_path)?;
        Ok(Self {
            _temp_dir: temp_dir,
            connection,
            base_path,
        })
    }

    pub fn base_directory(&self) -> &Path {
        &self.base_path
    }

    /// A file store over this environment's directory
    pub fn store(&self) -> CsvLedgerStore {
        CsvLedgerStore::new(self.connection.clone())
    }
}

impl Drop for TestEnvironment {
    fn drop(&mut self) {
        if std::env::var("ALLOWANCE_LEDGER_DEBUG_TESTS").is_ok() {
            println!("Cleaning up test environment: {:?}", self.base_path);
        }
    }
}
