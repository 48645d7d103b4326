//! Serve command - Bring the mirror up to date and serve it over HTTP

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Args;
use gitsvc_core::git::default_ssh_key_path;
use gitsvc_core::{Config, Credential, Mirror, MirrorConfig, RepoUrl};
use gitsvc_http::{create_router, AppState};
use tokio::signal;
use tracing::{info, warn};

/// Arguments for the serve command
#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// Address to listen on (default 0.0.0.0:8080)
    #[arg(long, env = "GITSVC_LISTEN")]
    pub listen: Option<String>,
}

impl ServeArgs {
    /// Execute the serve command
    pub async fn execute(&self, config: &Config, token: Option<String>) -> anyhow::Result<()> {
        let repo_url = config.repo_url()?;
        let path = repo_url.local_path(&config.storage.repo_dir);

        let default_key = default_ssh_key_path();
        let credential = Credential::select(
            token.as_deref(),
            config.remote.ssh_key.as_deref(),
            default_key.as_deref(),
        );

        info!(
            url = %repo_url.clone_url,
            path = %path.display(),
            auth = credential.kind(),
            "Starting gitsvc"
        );

        let mirror = Arc::new(Mirror::new(MirrorConfig { path, credential }));

        let startup = Arc::clone(&mirror);
        tokio::task::spawn_blocking(move || bootstrap(&startup, &repo_url))
            .await
            .context("startup sync task failed")??;

        let listen_addr: SocketAddr = config
            .server
            .listen
            .parse()
            .with_context(|| format!("invalid listen address: {}", config.server.listen))?;

        run_http_server(Arc::new(AppState::new(mirror)), listen_addr).await
    }
}

/// Clone on first run, pull on later runs
///
/// A failed clone is fatal. A failed pull only means serving the copy already
/// on disk.
pub fn bootstrap(mirror: &Mirror, url: &RepoUrl) -> anyhow::Result<()> {
    if !mirror.path().exists() {
        mirror
            .clone_remote(&url.clone_url)
            .with_context(|| format!("failed to clone {}", url.clone_url))?;
        return Ok(());
    }

    if let Err(e) = mirror.synchronize() {
        warn!(error = %e, "Failed to update repo, working in offline mode");
    }

    Ok(())
}

async fn run_http_server(state: Arc<AppState>, listen_addr: SocketAddr) -> anyhow::Result<()> {
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind HTTP listener on {listen_addr}"))?;

    info!(%listen_addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received SIGINT"),
        () = terminate => info!("received SIGTERM"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use git2::{Repository, Signature};
    use std::path::Path;
    use tempfile::TempDir;

    fn origin(temp: &TempDir) -> (Repository, String) {
        let repo = Repository::init(temp.path().join("settings")).unwrap();
        std::fs::write(temp.path().join("settings/README.md"), "# Test Repo").unwrap();
        let mut index = repo.index().unwrap();
        index.add_path(Path::new("README.md")).unwrap();
        index.write().unwrap();
        let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
        let sig = Signature::now("Test User", "test@example.com").unwrap();
        let oid = repo
            .commit(Some("HEAD"), &sig, &sig, "Initial commit", &tree, &[])
            .unwrap();
        drop(tree);
        (repo, oid.to_string())
    }

    fn mirror_for(temp: &TempDir, url: &RepoUrl) -> Mirror {
        Mirror::new(MirrorConfig {
            path: url.local_path(&temp.path().join("repos")),
            credential: Credential::None,
        })
    }

    #[test]
    fn test_bootstrap_clones_first_run() {
        let temp = TempDir::new().unwrap();
        let (repo, oid) = origin(&temp);
        let url = RepoUrl::parse(repo.workdir().unwrap().to_str().unwrap()).unwrap();
        assert_eq!(url.name, "settings");

        let mirror = mirror_for(&temp, &url);
        bootstrap(&mirror, &url).unwrap();

        assert!(temp.path().join("repos/settings/README.md").exists());
        assert_eq!(mirror.head_commit_id().unwrap(), oid);
    }

    #[test]
    fn test_bootstrap_existing_copy_survives_offline_remote() {
        let temp = TempDir::new().unwrap();
        let (repo, oid) = origin(&temp);
        let url = RepoUrl::parse(repo.workdir().unwrap().to_str().unwrap()).unwrap();
        bootstrap(&mirror_for(&temp, &url), &url).unwrap();

        drop(repo);
        std::fs::remove_dir_all(temp.path().join("settings")).unwrap();

        // Restart: pull fails, startup still succeeds
        let mirror = mirror_for(&temp, &url);
        bootstrap(&mirror, &url).unwrap();
        assert_eq!(mirror.head_commit_id().unwrap(), oid);
    }

    #[test]
    fn test_bootstrap_clone_failure_is_fatal() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("settings");
        let url = RepoUrl::parse(missing.to_str().unwrap()).unwrap();

        let mirror = mirror_for(&temp, &url);
        assert!(bootstrap(&mirror, &url).is_err());
    }
}
