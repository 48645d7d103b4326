//! Credential selection for remote operations

use std::path::{Path, PathBuf};

use git2::{Cred, CredentialType, FetchOptions, RemoteCallbacks};
use tracing::{debug, trace};

use crate::{Error, Result};

/// Username sent with token auth. The server only checks the password.
const TOKEN_USERNAME: &str = "token";

/// Username used for SSH when the URL does not carry one
const DEFAULT_SSH_USERNAME: &str = "git";

/// libgit2 keeps asking for credentials while the server rejects them
const MAX_AUTH_ATTEMPTS: usize = 3;

/// The single authentication method used for every remote operation
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// No authentication (public remotes only)
    None,
    /// HTTP basic auth with the token as password
    Token(String),
    /// SSH public-key auth with the private key at this path
    SshKey(PathBuf),
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credential::None => f.write_str("None"),
            Credential::Token(_) => f.write_str("Token(<redacted>)"),
            Credential::SshKey(path) => f.debug_tuple("SshKey").field(path).finish(),
        }
    }
}

/// Get the conventional per-user SSH key location
///
/// Returns `~/.ssh/id_rsa`
pub fn default_ssh_key_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".ssh").join("id_rsa"))
}

impl Credential {
    /// Pick the credential for this process
    ///
    /// Priority:
    /// 1. Token
    /// 2. Explicit SSH key path
    /// 3. Default SSH key, if it exists on disk
    /// 4. No authentication
    pub fn select(token: Option<&str>, ssh_key: Option<&Path>, default_key: Option<&Path>) -> Self {
        if let Some(token) = token.filter(|t| !t.is_empty()) {
            debug!("Using token authentication");
            return Credential::Token(token.to_string());
        }

        if let Some(path) = ssh_key.filter(|p| !p.as_os_str().is_empty()) {
            debug!(path = %path.display(), "Using SSH key authentication");
            return Credential::SshKey(path.to_path_buf());
        }

        if let Some(path) = default_key.filter(|p| p.exists()) {
            debug!(path = %path.display(), "Using default SSH key");
            return Credential::SshKey(path.to_path_buf());
        }

        debug!("No authentication configured");
        Credential::None
    }

    /// Short description for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Credential::None => "none",
            Credential::Token(_) => "token",
            Credential::SshKey(_) => "ssh-key",
        }
    }

    /// Check that the credential is usable before talking to the remote
    ///
    /// An SSH key must be readable, PEM-armored, and unencrypted. PuTTY
    /// `.ppk` files and passphrase-protected PEM keys are rejected here.
    /// An OpenSSH-format key only records its cipher inside the base64
    /// body, so a passphrase on one of those surfaces when the transport
    /// first uses it.
    pub fn check(&self) -> Result<()> {
        let Credential::SshKey(path) = self else {
            return Ok(());
        };

        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::AuthConfig(format!("Cannot read SSH key {}: {}", path.display(), e))
        })?;

        let armored = contents
            .lines()
            .map(str::trim)
            .any(|line| line.starts_with("-----BEGIN ") && line.ends_with("PRIVATE KEY-----"));
        if !armored {
            return Err(Error::AuthConfig(format!(
                "{} is not a PEM or OpenSSH private key",
                path.display()
            )));
        }

        if contents.contains("BEGIN ENCRYPTED PRIVATE KEY") || contents.contains("Proc-Type: 4,ENCRYPTED") {
            return Err(Error::AuthConfig(format!(
                "{} is passphrase-protected, which is not supported",
                path.display()
            )));
        }

        Ok(())
    }

    /// Build remote callbacks that answer credential requests
    pub fn remote_callbacks(&self) -> RemoteCallbacks<'static> {
        let mut callbacks = RemoteCallbacks::new();

        callbacks.transfer_progress(|progress| {
            trace!(
                received = progress.received_objects(),
                total = progress.total_objects(),
                bytes = progress.received_bytes(),
                "Transfer progress"
            );
            true
        });

        if *self == Credential::None {
            return callbacks;
        }

        let credential = self.clone();
        let mut attempts = 0;
        callbacks.credentials(move |_url, username_from_url, allowed| {
            attempts += 1;
            if attempts > MAX_AUTH_ATTEMPTS {
                return Err(git2::Error::from_str("authentication rejected by remote"));
            }

            match &credential {
                Credential::Token(token) if allowed.contains(CredentialType::USER_PASS_PLAINTEXT) => {
                    Cred::userpass_plaintext(TOKEN_USERNAME, token)
                }
                Credential::SshKey(path) if allowed.contains(CredentialType::SSH_KEY) => {
                    let username = username_from_url.unwrap_or(DEFAULT_SSH_USERNAME);
                    Cred::ssh_key(username, None, path, None)
                }
                Credential::SshKey(_) if allowed.contains(CredentialType::USERNAME) => {
                    Cred::username(username_from_url.unwrap_or(DEFAULT_SSH_USERNAME))
                }
                _ => Err(git2::Error::from_str(&format!(
                    "remote requested {:?}, but {} credential is configured",
                    allowed,
                    credential.kind()
                ))),
            }
        });

        callbacks
    }

    /// Build fetch options carrying this credential
    pub fn fetch_options(&self) -> FetchOptions<'static> {
        let mut fetch_options = FetchOptions::new();
        fetch_options.remote_callbacks(self.remote_callbacks());
        fetch_options
    }
}
