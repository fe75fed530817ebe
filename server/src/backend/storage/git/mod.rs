//! # Git Versioning Module
//!
//! Optional history of the data directory. When enabled, the file store turns
//! the data directory into a local git repository and commits the ledger
//! files after every change, so any earlier state of the ledger can be
//! recovered with plain git.
//!
//! Git operations never fail a ledger operation: errors are logged and the
//! change stays on disk uncommitted until the next successful commit picks
//! it up.

use anyhow::{anyhow, Result};
use git2::{Oid, Repository, Signature};
use log::{debug, error, info, warn};
use std::fs;
use std::path::Path;

/// Patterns kept out of the history
const GITIGNORE: &str = "*.tmp\nconfig.yaml\n";

/// Git manager for the data directory repository
#[derive(Clone, Debug)]
pub struct GitManager {
    author_name: String,
    author_email: String,
}

impl GitManager {
    pub fn new() -> Self {
        Self {
            author_name: "Allowance Ledger".to_string(),
            author_email: "ledger@allowance.local".to_string(),
        }
    }

    /// Initialize a repository with an ignore file for temp files
    pub async fn init_repo<P: AsRef<Path>>(&self, repo_path: P) -> Result<()> {
        let repo_path = repo_path.as_ref();
        if !repo_path.exists() {
            fs::create_dir_all(repo_path)?;
        }

        match Repository::init(repo_path) {
            Ok(_repo) => {
                fs::write(repo_path.join(".gitignore"), GITIGNORE)?;
                info!("Initialized git repository at: {:?}", repo_path);
                Ok(())
            }
            Err(e) => {
                error!("Failed to initialize git repository at {:?}: {}", repo_path, e);
                Err(anyhow!("Failed to initialize git repository: {}", e))
            }
        }
    }

    pub async fn ensure_repo_exists<P: AsRef<Path>>(&self, repo_path: P) -> Result<()> {
        let repo_path = repo_path.as_ref();
        if self.is_git_repository(repo_path) {
            Ok(())
        } else {
            debug!("Git repository does not exist, initializing at: {:?}", repo_path);
            self.init_repo(repo_path).await
        }
    }

    /// Stage the given files (relative to the repository root); files that
    /// don't exist are staged as removed
    pub async fn stage_files<P: AsRef<Path>>(&self, repo_path: P, files: &[&str]) -> Result<()> {
        let repo = Repository::open(repo_path.as_ref())?;
        let mut index = repo.index()?;
        for file in files.iter().copied().chain(std::iter::once(".gitignore")) {
            if repo_path.as_ref().join(file).exists() {
                index.add_path(Path::new(file))?;
            } else if index.get_path(Path::new(file), 0).is_some() {
                index.remove_path(Path::new(file))?;
            }
        }
        index.write()?;
        Ok(())
    }

    /// True when the staged tree differs from HEAD (or nothing is committed yet)
    pub async fn has_staged_changes<P: AsRef<Path>>(&self, repo_path: P) -> Result<bool> {
        let repo = Repository::open(repo_path.as_ref())?;
        let mut index = repo.index()?;
        let tree_id = index.write_tree()?;
        let changed = match repo.head().ok().and_then(|head| head.target()) {
            Some(head) => repo.find_commit(head)?.tree_id() != tree_id,
            None => !index.is_empty(),
        };
        Ok(changed)
    }

    /// Commit whatever is staged
    pub async fn commit<P: AsRef<Path>>(&self, repo_path: P, message: &str) -> Result<Oid> {
        let repo_path = repo_path.as_ref();
        let repo = Repository::open(repo_path)?;
        let signature = Signature::now(&self.author_name, &self.author_email)?;

        let mut index = repo.index()?;
        let tree_id = index.write_tree()?;
        let tree = repo.find_tree(tree_id)?;

        let parent_commits = match repo.head().ok().and_then(|head| head.target()) {
            Some(target) => vec![repo.find_commit(target)?],
            None => vec![],
        };

        let commit_id = repo.commit(
            Some("HEAD"),
            &signature,
            &signature,
            message,
            &tree,
            &parent_commits.iter().collect::<Vec<_>>(),
        )?;
        debug!("Created commit {} in {:?}: {}", commit_id, repo_path, message);
        Ok(commit_id)
    }

    /// Stage and commit `files` with a standard message. Never fails: git
    /// problems are logged and the ledger operation carries on.
    pub async fn commit_ledger_change<P: AsRef<Path>>(&self, repo_path: P, files: &[&str], description: &str) {
        let repo_path = repo_path.as_ref();

        if let Err(e) = self.ensure_repo_exists(repo_path).await {
            warn!("Failed to ensure git repository exists at {:?}: {}", repo_path, e);
            return;
        }
        if let Err(e) = self.stage_files(repo_path, files).await {
            warn!("Failed to stage {:?} in {:?}: {}", files, repo_path, e);
            return;
        }
        match self.has_staged_changes(repo_path).await {
            Ok(true) => {}
            Ok(false) => {
                debug!("No ledger changes to commit in {:?}", repo_path);
                return;
            }
            Err(e) => {
                warn!("Failed to check repository status at {:?}: {}", repo_path, e);
                return;
            }
        }

        let message = format!("Update {}: {}", files.join(", "), description);
        if let Err(e) = self.commit(repo_path, &message).await {
            warn!("Failed to commit ledger change in {:?}: {}", repo_path, e);
        }
    }

    pub fn is_git_repository<P: AsRef<Path>>(&self, repo_path: P) -> bool {
        repo_path.as_ref().join(".git").exists()
    }
}

impl Default for GitManager {
    fn default() -> Self {
        Self::new()
    }
}
