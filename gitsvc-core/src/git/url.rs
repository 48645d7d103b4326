//! Remote URL parsing

use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Parsed remote repository URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoUrl {
    /// URL as given, passed to the transport unchanged
    pub clone_url: String,
    /// Repository name, used as the local directory name
    pub name: String,
}

impl RepoUrl {
    /// Parse a remote URL
    ///
    /// Supports:
    /// - `https://host/owner/repo(.git)`
    /// - `ssh://git@host/owner/repo.git`
    /// - `git@host:owner/repo.git`
    /// - `file:///path/to/repo` and plain local paths
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(Error::Config(
                "Please provide a URL to the git repository".to_string(),
            ));
        }

        let path = if input.contains("://") {
            let url = url::Url::parse(input)
                .map_err(|e| Error::Config(format!("Invalid repository URL {}: {}", input, e)))?;
            url.path().to_string()
        } else if let Some((_, path)) = input.split_once(':').filter(|_| is_scp_like(input)) {
            // git@host:owner/repo.git
            path.to_string()
        } else {
            input.to_string()
        };

        let name = path
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or("")
            .trim_end_matches(".git")
            .to_string();

        if name.is_empty() || name == "." || name == ".." {
            return Err(Error::Config(format!(
                "Unable to determine the repository name from the URL: {}",
                input
            )));
        }

        Ok(Self {
            clone_url: input.to_string(),
            name,
        })
    }

    /// Local working copy location under `repo_dir`
    pub fn local_path(&self, repo_dir: &Path) -> PathBuf {
        repo_dir.join(&self.name)
    }
}

/// `user@host:path` without a scheme, as opposed to a local path
fn is_scp_like(input: &str) -> bool {
    match input.split_once(':') {
        Some((host, _)) => !host.is_empty() && !host.contains('/'),
        None => false,
    }
}
