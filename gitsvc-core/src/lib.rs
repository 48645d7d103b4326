//! gitsvc Core - Repository mirroring for gitsvc
//!
//! This crate keeps a local working copy of a single remote git repository
//! in sync and exposes read-only views of it: file contents, the file tree,
//! and the commit currently checked out.

pub mod config;
pub mod error;
pub mod git;
pub mod secrets;
pub mod snapshot;

pub use config::Config;
pub use error::{Error, Result};
pub use git::{Credential, Mirror, MirrorConfig, RepoUrl, SyncOutcome};
pub use secrets::Secrets;
pub use snapshot::{FileContent, Snapshot};
