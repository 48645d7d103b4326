//! Local mirror of the remote repository

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, FixedOffset};
use git2::build::RepoBuilder;
use git2::Repository;
use tracing::{debug, info};

use super::credential::Credential;
use crate::{Error, Result};

/// Settings for a [`Mirror`], fixed for the life of the process
#[derive(Debug, Clone)]
pub struct MirrorConfig {
    /// Where the working copy lives
    pub path: PathBuf,
    /// Credential for clone and pull
    pub credential: Credential,
}

/// Owner of the local working copy
///
/// The repository is opened lazily on first use and the handle is reused
/// afterwards. Failed pulls never drop an open handle.
///
/// Pulls are serialized on their own lock and do their network work on a
/// separate handle, so the shared handle is only locked for local steps.
pub struct Mirror {
    path: PathBuf,
    credential: Credential,
    repo: Mutex<Option<Repository>>,
    sync: Mutex<()>,
}

impl std::fmt::Debug for Mirror {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mirror")
            .field("path", &self.path)
            .field("credential", &self.credential)
            .finish_non_exhaustive()
    }
}

impl Mirror {
    /// Create a mirror; nothing is touched on disk until first use
    pub fn new(config: MirrorConfig) -> Self {
        Self {
            path: config.path,
            credential: config.credential,
            repo: Mutex::new(None),
            sync: Mutex::new(()),
        }
    }

    /// Path to the working copy
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Credential used for remote operations
    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    /// Whether the local path already holds a working copy
    pub fn has_working_copy(&self) -> bool {
        self.path.join(".git").exists()
    }

    /// Clone `url` into the mirror path
    ///
    /// Only valid when there is no working copy yet. Errors are returned as-is
    /// and never retried.
    pub fn clone_remote(&self, url: &str) -> Result<()> {
        if self.has_working_copy() {
            return Err(Error::Clone(format!(
                "{} already contains a repository",
                self.path.display()
            )));
        }

        self.credential.check()?;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::Clone(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }

        info!(url = %url, path = %self.path.display(), auth = self.credential.kind(), "Cloning repository");

        let repo = RepoBuilder::new()
            .fetch_options(self.credential.fetch_options())
            .clone(url, &self.path)
            .map_err(|e| Error::Clone(format!("{}: {}", url, e.message())))?;

        *self.lock() = Some(repo);

        info!(path = %self.path.display(), "Clone complete");
        Ok(())
    }

    /// Hex id of the commit HEAD points at
    pub fn head_commit_id(&self) -> Result<String> {
        self.with_repo(|repo| {
            let head = repo
                .head()
                .map_err(|e| Error::MetadataUnavailable(format!("Failed to resolve HEAD: {}", e.message())))?;
            head.target()
                .map(|oid| oid.to_string())
                .ok_or_else(|| Error::MetadataUnavailable("HEAD has no target".to_string()))
        })
    }

    /// Committer time of the commit HEAD points at
    pub fn head_commit_time(&self) -> Result<DateTime<FixedOffset>> {
        self.with_repo(|repo| {
            let commit = repo
                .head()
                .and_then(|head| head.peel_to_commit())
                .map_err(|e| {
                    Error::MetadataUnavailable(format!("Failed to resolve HEAD commit: {}", e.message()))
                })?;
            let when = commit.committer().when();
            commit_time(&when)
        })
    }

    /// Run `f` against the open repository, opening it first if needed
    fn with_repo<T>(&self, f: impl FnOnce(&Repository) -> Result<T>) -> Result<T> {
        let mut guard = self.lock();
        let repo = match guard.take() {
            Some(repo) => repo,
            None => self.open().map_err(Error::MetadataUnavailable)?,
        };
        f(guard.insert(repo))
    }

    pub(super) fn open(&self) -> std::result::Result<Repository, String> {
        debug!(path = %self.path.display(), "Opening repository");
        Repository::open(&self.path).map_err(|e| {
            if e.code() == git2::ErrorCode::NotFound {
                format!("No repository at {}", self.path.display())
            } else {
                format!("Git error: {}", e.message())
            }
        })
    }

    /// Lock the shared handle, keeping metadata readers out while held
    pub(super) fn lock(&self) -> MutexGuard<'_, Option<Repository>> {
        self.repo.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lock held for the duration of one pull
    pub(super) fn sync_guard(&self) -> MutexGuard<'_, ()> {
        self.sync.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Convert a git timestamp, keeping its UTC offset
fn commit_time(when: &git2::Time) -> Result<DateTime<FixedOffset>> {
    let offset = FixedOffset::east_opt(when.offset_minutes() * 60)
        .ok_or_else(|| Error::MetadataUnavailable("Invalid commit timezone".to_string()))?;
    DateTime::from_timestamp(when.seconds(), 0)
        .map(|utc| utc.with_timezone(&offset))
        .ok_or_else(|| Error::MetadataUnavailable("Invalid commit timestamp".to_string()))
}
