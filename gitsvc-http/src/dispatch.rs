//! Request composition
//!
//! Blocking functions that combine the mirror and the snapshot reader into
//! response bodies. The async handlers run these on the blocking pool.

use chrono::{DateTime, FixedOffset, Utc};
use gitsvc_core::{Mirror, SyncOutcome};
use tracing::{debug, warn};

use crate::handler::AppState;
use crate::response::{FileResponse, TreeResponse, UpdateResponse};
use crate::AppError;

/// Reported in place of the commit hash when HEAD cannot be resolved
pub const UNKNOWN_COMMIT: &str = "unknown";

pub const UPDATED_MESSAGE: &str = "Repo updated";
pub const OFFLINE_MESSAGE: &str = "Failed to update repo, working in offline mode";

/// Commit metadata attached to every response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    pub commit_hash: String,
    pub timestamp: DateTime<FixedOffset>,
    /// Set when either the hash or the timestamp had to be substituted
    pub offline: bool,
}

impl CommitInfo {
    /// Read HEAD metadata from the mirror
    ///
    /// The hash and the timestamp are resolved separately; a failure in
    /// either one marks the response offline and substitutes a placeholder.
    pub fn derive(mirror: &Mirror) -> Self {
        let mut offline = false;

        let commit_hash = mirror.head_commit_id().unwrap_or_else(|e| {
            debug!(error = %e, "commit hash unavailable");
            offline = true;
            UNKNOWN_COMMIT.to_string()
        });

        let timestamp = mirror.head_commit_time().unwrap_or_else(|e| {
            debug!(error = %e, "commit timestamp unavailable");
            offline = true;
            Utc::now().fixed_offset()
        });

        Self {
            commit_hash,
            timestamp,
            offline,
        }
    }
}

/// Contents of one file plus commit metadata
pub fn get_file(state: &AppState, path: &str) -> Result<FileResponse, AppError> {
    let content = state.snapshot.read_file(path)?;
    let info = CommitInfo::derive(&state.mirror);

    Ok(FileResponse {
        content,
        timestamp: info.timestamp,
        commit_hash: info.commit_hash,
        offline: info.offline,
    })
}

/// Every file in the working copy plus commit metadata
pub fn get_tree(state: &AppState) -> Result<TreeResponse, AppError> {
    let files = state
        .snapshot
        .list_tree()
        .map_err(|e| AppError::Tree(e.into()))?;
    let info = CommitInfo::derive(&state.mirror);

    Ok(TreeResponse {
        files,
        timestamp: info.timestamp,
        commit_hash: info.commit_hash,
        offline: info.offline,
    })
}

/// Pull from the remote; never fails, only reports what happened
pub fn update(state: &AppState) -> UpdateResponse {
    let message = match state.mirror.synchronize() {
        Ok(outcome) => {
            debug!(updated = outcome == SyncOutcome::Updated, "sync finished");
            UPDATED_MESSAGE
        }
        Err(e) => {
            warn!(error = %e, "Failed to update repo, working in offline mode");
            OFFLINE_MESSAGE
        }
    };

    let info = CommitInfo::derive(&state.mirror);

    UpdateResponse {
        message: message.to_string(),
        commit_hash: info.commit_hash,
        timestamp: info.timestamp,
    }
}
