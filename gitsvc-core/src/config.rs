//! Configuration management for gitsvc
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (GITSVC_*)
//! 3. Config file (~/.config/gitsvc/config.toml)
//! 4. Default values
//!
//! The auth token is a secret and lives in [`crate::Secrets`] instead.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::git::RepoUrl;
use crate::{Error, Result};

/// Remote repository settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// URL of the repository to mirror
    pub url: Option<String>,

    /// Private key for SSH remotes (defaults to ~/.ssh/id_rsa when present)
    pub ssh_key: Option<PathBuf>,
}

/// Local storage settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory the repository is cloned into
    pub repo_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            repo_dir: PathBuf::from("./repos"),
        }
    }
}

/// HTTP server settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to listen on
    pub listen: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub url: Option<String>,
    pub ssh_key: Option<PathBuf>,
    pub repo_dir: Option<PathBuf>,
    pub listen: Option<String>,
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub remote: RemoteConfig,
    pub storage: StorageConfig,
    pub server: ServerConfig,
}

impl Config {
    /// Load configuration from the default config file location
    ///
    /// Returns default config if file doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();

        if let Some(path) = config_path {
            if path.exists() {
                return Self::load_from_file(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(Error::Io)?;
        toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Get the default config file path
    ///
    /// Returns `~/.config/gitsvc/config.toml` on Unix
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("gitsvc").join("config.toml"))
    }

    /// Apply environment variable overrides
    ///
    /// Supported variables:
    /// - GITSVC_URL: Repository URL
    /// - GITSVC_SSH_KEY: SSH private key path
    /// - GITSVC_REPO_DIR: Clone directory
    /// - GITSVC_LISTEN: Listen address
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var("GITSVC_URL") {
            self.remote.url = Some(url);
        }

        if let Ok(ssh_key) = std::env::var("GITSVC_SSH_KEY") {
            self.remote.ssh_key = Some(PathBuf::from(ssh_key));
        }

        if let Ok(repo_dir) = std::env::var("GITSVC_REPO_DIR") {
            self.storage.repo_dir = PathBuf::from(repo_dir);
        }

        if let Ok(listen) = std::env::var("GITSVC_LISTEN") {
            self.server.listen = listen;
        }

        self
    }

    /// Apply CLI flag overrides
    pub fn with_cli_overrides(mut self, overrides: CliOverrides) -> Self {
        if let Some(url) = overrides.url {
            self.remote.url = Some(url);
        }

        if let Some(ssh_key) = overrides.ssh_key {
            self.remote.ssh_key = Some(ssh_key);
        }

        if let Some(repo_dir) = overrides.repo_dir {
            self.storage.repo_dir = repo_dir;
        }

        if let Some(listen) = overrides.listen {
            self.server.listen = listen;
        }

        self
    }

    /// Load configuration with all overrides applied
    ///
    /// Priority: CLI > env > config file > defaults. An explicit `config_path`
    /// must exist.
    pub fn load_with_overrides(config_path: Option<&Path>, overrides: CliOverrides) -> Result<Self> {
        let base = match config_path {
            Some(path) => Self::load_from_file(path)?,
            None => Self::load()?,
        };

        Ok(base.with_env_overrides().with_cli_overrides(overrides))
    }

    /// The repository to mirror; required
    pub fn repo_url(&self) -> Result<RepoUrl> {
        match self.remote.url.as_deref() {
            Some(url) if !url.trim().is_empty() => RepoUrl::parse(url),
            _ => Err(Error::Config(
                "Please provide a URL to the git repository".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.remote.url.is_none());
        assert_eq!(config.storage.repo_dir, PathBuf::from("./repos"));
        assert_eq!(config.server.listen, "0.0.0.0:8080");
    }

    #[test]
    fn test_cli_overrides() {
        let config = Config::default().with_cli_overrides(CliOverrides {
            url: Some("https://github.com/owner/repo.git".to_string()),
            repo_dir: Some(PathBuf::from("/var/lib/gitsvc")),
            ..Default::default()
        });

        assert_eq!(config.remote.url.as_deref(), Some("https://github.com/owner/repo.git"));
        assert_eq!(config.storage.repo_dir, PathBuf::from("/var/lib/gitsvc"));
        assert_eq!(config.server.listen, "0.0.0.0:8080");
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
[remote]
url = "git@github.com:owner/settings.git"
ssh_key = "/home/svc/.ssh/deploy"

[storage]
repo_dir = "/srv/repos"

[server]
listen = "127.0.0.1:9000"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.remote.ssh_key, Some(PathBuf::from("/home/svc/.ssh/deploy")));
        assert_eq!(config.storage.repo_dir, PathBuf::from("/srv/repos"));
        assert_eq!(config.server.listen, "127.0.0.1:9000");
        assert_eq!(config.repo_url().unwrap().name, "settings");
    }

    #[test]
    fn test_partial_toml() {
        let toml = r#"
[remote]
url = "https://example.com/a/b"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        // storage and server should use defaults
        assert_eq!(config.storage.repo_dir, PathBuf::from("./repos"));
        assert_eq!(config.server.listen, "0.0.0.0:8080");
    }

    #[test]
    fn test_missing_url() {
        assert!(matches!(Config::default().repo_url(), Err(Error::Config(_))));
    }

    #[test]
    fn test_explicit_config_file_must_exist() {
        let result = Config::load_with_overrides(
            Some(Path::new("/nonexistent/gitsvc.toml")),
            CliOverrides::default(),
        );
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
