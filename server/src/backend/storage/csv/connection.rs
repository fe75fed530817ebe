use anyhow::{Context, Result};
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};

/// Account fields, as YAML
pub const ACCOUNT_FILE: &str = "account.yaml";
/// One row per ledger entry
pub const ENTRIES_FILE: &str = "entries.csv";
/// One row per indexed day
pub const CLOSING_BALANCES_FILE: &str = "closing_balances.csv";

pub const ENTRIES_HEADER: &str = "id,day,type,amount,note,timestamp\n";
pub const CLOSING_BALANCES_HEADER: &str = "day,balance\n";

/// CsvConnection manages the data directory and the paths of the ledger files
#[derive(Clone, Debug)]
pub struct CsvConnection {
    data_directory: PathBuf,
}

impl CsvConnection {
    /// Open a data directory, creating it if it doesn't exist
    pub fn new<P: AsRef<Path>>(data_directory: P) -> Result<Self> {
        let data_directory = data_directory.as_ref().to_path_buf();
        if !data_directory.exists() {
            fs::create_dir_all(&data_directory)
                .with_context(|| format!("Failed to create data directory {}", data_directory.display()))?;
            info!("Created data directory: {}", data_directory.display());
        }
        Ok(Self { data_directory })
    }

    pub fn data_directory(&self) -> &Path {
        &self.data_directory
    }

    pub fn account_file_path(&self) -> PathBuf {
        self.data_directory.join(ACCOUNT_FILE)
    }

    pub fn entries_file_path(&self) -> PathBuf {
        self.data_directory.join(ENTRIES_FILE)
    }

    pub fn closing_balances_file_path(&self) -> PathBuf {
        self.data_directory.join(CLOSING_BALANCES_FILE)
    }

    /// Create a CSV file containing only its header if it doesn't exist yet
    pub fn ensure_csv_file_exists(&self, path: &Path, header: &str) -> Result<()> {
        if !path.exists() {
            fs::write(path, header)?;
            debug!("Created CSV file: {}", path.display());
        }
        Ok(())
    }

    /// Replace `path` with `contents` using a temp file and a rename, so a
    /// crash leaves either the old or the new file, never half of one
    pub fn write_atomically(&self, path: &Path, contents: &[u8]) -> Result<()> {
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("ledger");
        let temp_path = path.with_file_name(format!("{}.tmp", file_name));
        fs::write(&temp_path, contents)
            .with_context(|| format!("Failed to write {}", temp_path.display()))?;
        fs::rename(&temp_path, path)
            .with_context(|| format!("Failed to replace {}", path.display()))?;
        Ok(())
    }
}
