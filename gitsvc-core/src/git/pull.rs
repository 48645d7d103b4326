//! Pulling remote changes into the mirror

use git2::build::CheckoutBuilder;
use git2::{AutotagOption, Repository, SubmoduleUpdateOptions};
use tracing::{debug, info};

use super::credential::Credential;
use super::mirror::Mirror;
use crate::{Error, Result};

/// Remote every pull fetches from
const DEFAULT_REMOTE: &str = "origin";

/// Same nesting limit git uses by default for recursive submodule updates
const SUBMODULE_RECURSION_DEPTH: usize = 10;

/// Result of a successful synchronize
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The working copy moved to a newer commit
    Updated,
    /// The remote had nothing new
    UpToDate,
}

impl Mirror {
    /// Pull the latest changes from the remote into the working copy
    ///
    /// Fetches every branch from `origin` and fast-forwards the checked-out
    /// branch to its upstream. On failure the open repository is kept as-is,
    /// so reads keep serving the last good state.
    ///
    /// Fetching and submodule updates go through a handle of their own.
    /// The shared handle is locked only while the branch moves and the
    /// working tree is checked out.
    pub fn synchronize(&self) -> Result<SyncOutcome> {
        self.credential().check()?;

        let _sync = self.sync_guard();

        let repo = self.open().map_err(Error::Sync)?;
        if repo.workdir().is_none() {
            return Err(Error::Sync("Repository has no working tree".to_string()));
        }

        fetch_all(&repo, self.credential())?;

        let outcome = {
            let _handle = self.lock();
            fast_forward_head(&repo)?
        };

        if outcome == SyncOutcome::Updated {
            update_submodules(&repo, self.credential(), SUBMODULE_RECURSION_DEPTH)?;
        }

        match outcome {
            SyncOutcome::Updated => info!(path = %self.path().display(), "Repository updated"),
            SyncOutcome::UpToDate => debug!(path = %self.path().display(), "Repository already up to date"),
        }

        Ok(outcome)
    }
}

fn sync_error(context: &str, e: git2::Error) -> Error {
    Error::Sync(format!("{}: {}", context, e.message()))
}

/// Fetch all branches and tags from the default remote
fn fetch_all(repo: &Repository, credential: &Credential) -> Result<()> {
    let mut remote = repo
        .find_remote(DEFAULT_REMOTE)
        .map_err(|e| sync_error(&format!("Remote '{}' not found", DEFAULT_REMOTE), e))?;

    let mut fetch_options = credential.fetch_options();
    fetch_options.download_tags(AutotagOption::All);

    debug!(remote = DEFAULT_REMOTE, auth = credential.kind(), "Fetching");

    // Empty refspec list means the remote's configured refspecs, i.e. every branch
    remote
        .fetch(&[] as &[&str], Some(&mut fetch_options), None)
        .map_err(|e| sync_error(&format!("Fetch from '{}' failed", DEFAULT_REMOTE), e))
}

/// Move the checked-out branch to its freshly fetched upstream
fn fast_forward_head(repo: &Repository) -> Result<SyncOutcome> {
    let head = repo
        .find_reference("HEAD")
        .map_err(|e| sync_error("Failed to read HEAD", e))?;
    let branch = head
        .symbolic_target()
        .ok_or_else(|| Error::Sync("HEAD is detached; there is no branch to pull into".to_string()))?
        .to_string();

    let upstream = upstream_ref_name(repo, &branch);
    let upstream_ref = repo
        .find_reference(&upstream)
        .map_err(|e| sync_error(&format!("Upstream '{}' not found", upstream), e))?;
    let fetched = repo
        .reference_to_annotated_commit(&upstream_ref)
        .map_err(|e| sync_error("Failed to resolve fetched commit", e))?;

    let (analysis, _) = repo
        .merge_analysis(&[&fetched])
        .map_err(|e| sync_error("Merge analysis failed", e))?;

    if analysis.is_up_to_date() {
        return Ok(SyncOutcome::UpToDate);
    }

    if !(analysis.is_fast_forward() || analysis.is_unborn()) {
        return Err(Error::Sync(format!(
            "{} has diverged from {}; only fast-forward updates are supported",
            branch, upstream
        )));
    }

    let message = format!("pull: fast-forward to {}", fetched.id());
    match repo.find_reference(&branch) {
        Ok(mut reference) => {
            reference
                .set_target(fetched.id(), &message)
                .map_err(|e| sync_error("Failed to move branch", e))?;
        }
        Err(_) => {
            repo.reference(&branch, fetched.id(), true, &message)
                .map_err(|e| sync_error("Failed to create branch", e))?;
        }
    }

    repo.set_head(&branch)
        .map_err(|e| sync_error("Failed to update HEAD", e))?;
    repo.checkout_head(Some(CheckoutBuilder::new().force()))
        .map_err(|e| sync_error("Failed to check out working tree", e))?;

    debug!(branch = %branch, commit = %fetched.id(), "Fast-forwarded");
    Ok(SyncOutcome::Updated)
}

/// Configured upstream of `branch`, falling back to the same name on origin
fn upstream_ref_name(repo: &Repository, branch: &str) -> String {
    if let Ok(name) = repo.branch_upstream_name(branch) {
        if let Some(name) = name.as_str() {
            return name.to_string();
        }
    }

    let short = branch.strip_prefix("refs/heads/").unwrap_or(branch);
    format!("refs/remotes/{}/{}", DEFAULT_REMOTE, short)
}

fn update_submodules(repo: &Repository, credential: &Credential, depth: usize) -> Result<()> {
    if depth == 0 {
        return Ok(());
    }

    let submodules = repo
        .submodules()
        .map_err(|e| sync_error("Failed to list submodules", e))?;

    for mut submodule in submodules {
        let name = submodule.name().unwrap_or("<unnamed>").to_string();
        debug!(submodule = %name, "Updating submodule");

        let mut options = SubmoduleUpdateOptions::new();
        options.fetch(credential.fetch_options());
        submodule
            .update(true, Some(&mut options))
            .map_err(|e| sync_error(&format!("Failed to update submodule {}", name), e))?;

        let nested = submodule
            .open()
            .map_err(|e| sync_error(&format!("Failed to open submodule {}", name), e))?;
        update_submodules(&nested, credential, depth - 1)?;
    }

    Ok(())
}
