//! Secrets management for gitsvc
//!
//! The remote auth token is kept out of the main config file. The secrets file
//! is located at `~/.config/gitsvc/secrets.toml` and must have restrictive
//! permissions (0600 on Unix).
//!
//! Token priority:
//! 1. `--token` flag
//! 2. Environment variable (GITSVC_TOKEN)
//! 3. Secrets file (~/.config/gitsvc/secrets.toml)

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{Error, Result};

/// Environment variable holding the remote token
pub const TOKEN_ENV: &str = "GITSVC_TOKEN";

/// Secrets structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Secrets {
    /// Remote repository secrets
    pub remote: RemoteSecrets,
}

/// Secrets for the mirrored remote
#[derive(Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RemoteSecrets {
    /// Access token used as the HTTP basic-auth password
    pub token: Option<String>,
}

impl std::fmt::Debug for RemoteSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteSecrets")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Secrets {
    /// Load secrets from the default location
    ///
    /// Returns default (empty) secrets if file doesn't exist
    pub fn load() -> Result<Self> {
        let secrets_path = Self::default_secrets_path();

        if let Some(path) = secrets_path {
            if path.exists() {
                return Self::load_from_file(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load secrets from a specific file with permission checking
    pub fn load_from_file(path: &Path) -> Result<Self> {
        // Check file permissions on Unix
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            let metadata = std::fs::metadata(path).map_err(Error::Io)?;
            let mode = metadata.permissions().mode();

            // Check if file is readable by group or others (mode & 0o077)
            if mode & 0o077 != 0 {
                return Err(Error::Config(format!(
                    "Secrets file {} has insecure permissions {:o}. \
                     Please run: chmod 600 {}",
                    path.display(),
                    mode & 0o777,
                    path.display()
                )));
            }

            debug!(path = %path.display(), mode = format!("{:o}", mode & 0o777), "Secrets file permissions OK");
        }

        let contents = std::fs::read_to_string(path).map_err(Error::Io)?;
        let mut secrets: Secrets = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse secrets: {}", e)))?;

        // Trim whitespace from token
        if let Some(ref mut token) = secrets.remote.token {
            *token = token.trim().to_string();
        }

        Ok(secrets)
    }

    /// Get the default secrets file path
    ///
    /// Returns `~/.config/gitsvc/secrets.toml` on Unix
    pub fn default_secrets_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("gitsvc").join("secrets.toml"))
    }

    /// Resolve the remote token
    ///
    /// Priority: `flag` > GITSVC_TOKEN env var > secrets file
    pub fn token(&self, flag: Option<&str>) -> Option<String> {
        let env = std::env::var(TOKEN_ENV).ok();
        self.token_from(flag, env.as_deref())
    }

    fn token_from(&self, flag: Option<&str>, env: Option<&str>) -> Option<String> {
        if let Some(token) = flag.map(str::trim).filter(|t| !t.is_empty()) {
            debug!("Using token from --token");
            return Some(token.to_string());
        }

        if let Some(token) = env.map(str::trim).filter(|t| !t.is_empty()) {
            debug!("Using token from {} environment variable", TOKEN_ENV);
            return Some(token.to_string());
        }

        if let Some(ref token) = self.remote.token {
            if !token.is_empty() {
                debug!("Using token from secrets file");
                return Some(token.clone());
            }
        }

        None
    }

    /// Create a template secrets file at the default location
    ///
    /// Creates parent directories if needed and sets secure permissions
    pub fn create_template() -> Result<PathBuf> {
        let path = Self::default_secrets_path()
            .ok_or_else(|| Error::Config("Could not determine secrets path".to_string()))?;
        Self::create_template_at(&path)?;
        Ok(path)
    }

    fn create_template_at(path: &Path) -> Result<()> {
        // Create parent directory
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(Error::Io)?;
        }

        // Don't overwrite existing file
        if path.exists() {
            return Err(Error::Config(format!(
                "Secrets file already exists at {}",
                path.display()
            )));
        }

        let template = r#"# gitsvc secrets
# This file contains sensitive credentials - do not share or commit to version control
#
# IMPORTANT: This file must have restrictive permissions (chmod 600)

[remote]
# Access token for HTTPS remotes, sent as the basic-auth password
token = ""
"#;

        std::fs::write(path, template).map_err(Error::Io)?;

        // Set restrictive permissions on Unix
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(path, perms).map_err(Error::Io)?;
        }

        warn!(path = %path.display(), "Created secrets template - please edit and add your token");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    fn with_file_token(token: &str) -> Secrets {
        Secrets {
            remote: RemoteSecrets {
                token: Some(token.to_string()),
            },
        }
    }

    #[test]
    fn test_default_secrets() {
        let secrets = Secrets::default();
        assert!(secrets.remote.token.is_none());
        assert_eq!(secrets.token_from(None, None), None);
    }

    #[test]
    fn test_parse_secrets() {
        let toml = r#"
[remote]
token = "glpat-xxxxxxxxxxxx"
"#;
        let secrets: Secrets = toml::from_str(toml).unwrap();
        assert_eq!(secrets.remote.token, Some("glpat-xxxxxxxxxxxx".to_string()));
    }

    #[test]
    fn test_token_priority() {
        let secrets = with_file_token("from_file");
        assert_eq!(secrets.token_from(Some("flag"), Some("env")).as_deref(), Some("flag"));
        assert_eq!(secrets.token_from(None, Some("env")).as_deref(), Some("env"));
        assert_eq!(secrets.token_from(Some(""), Some("  ")).as_deref(), Some("from_file"));
    }

    #[test]
    fn test_debug_redacts_token() {
        let secrets = with_file_token("very-secret");
        assert!(!format!("{:?}", secrets).contains("very-secret"));
    }

    #[cfg(unix)]
    #[test]
    fn test_insecure_permissions_rejected() {
        use std::os::unix::fs::PermissionsExt;

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[remote]\ntoken = \"test\"").unwrap();

        // Set world-readable permissions
        let perms = std::fs::Permissions::from_mode(0o644);
        std::fs::set_permissions(file.path(), perms).unwrap();

        let result = Secrets::load_from_file(file.path());
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("insecure permissions"));
    }

    #[cfg(unix)]
    #[test]
    fn test_secure_permissions_accepted() {
        use std::os::unix::fs::PermissionsExt;

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[remote]\ntoken = \"  tok_test \"").unwrap();

        // Set owner-only permissions
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(file.path(), perms).unwrap();

        let secrets = Secrets::load_from_file(file.path()).unwrap();
        assert_eq!(secrets.remote.token, Some("tok_test".to_string()));
    }

    #[test]
    fn test_template_not_overwritten() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("gitsvc").join("secrets.toml");

        Secrets::create_template_at(&path).unwrap();
        assert!(path.exists());
        assert!(Secrets::create_template_at(&path).is_err());

        #[cfg(unix)]
        {
            let secrets = Secrets::load_from_file(&path).unwrap();
            assert_eq!(secrets.token_from(None, None), None);
        }
    }
}
