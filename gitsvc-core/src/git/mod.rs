//! Git operations for gitsvc
//!
//! This module provides credential selection, cloning, pulling and HEAD
//! inspection for the mirrored repository.

mod credential;
mod mirror;
mod pull;
mod url;

pub use credential::{default_ssh_key_path, Credential};
pub use mirror::{Mirror, MirrorConfig};
pub use pull::SyncOutcome;
pub use url::RepoUrl;
