//! Test fixtures: an origin repository and a mirror cloned from it

use std::path::Path;
use std::sync::Arc;

use git2::{Repository, Signature};
use gitsvc_core::{Credential, Mirror, MirrorConfig};
use tempfile::TempDir;

use crate::AppState;

pub(crate) struct Fixture {
    temp: TempDir,
    origin: Repository,
    mirror: Arc<Mirror>,
    pub initial_commit: String,
}

impl Fixture {
    /// Origin with one commit ("Initial commit", README.md) and a fresh clone
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let origin = Repository::init(temp.path().join("origin")).unwrap();
        let initial_commit = commit(&origin, &[("README.md", "# Test Repo")], "Initial commit");

        let mirror = Mirror::new(MirrorConfig {
            path: temp.path().join("repos").join("origin"),
            credential: Credential::None,
        });
        mirror
            .clone_remote(origin.workdir().unwrap().to_str().unwrap())
            .unwrap();

        Self {
            temp,
            origin,
            mirror: Arc::new(mirror),
            initial_commit,
        }
    }

    pub fn state(&self) -> Arc<AppState> {
        Arc::new(AppState::new(Arc::clone(&self.mirror)))
    }

    pub fn mirror_path(&self) -> &Path {
        self.mirror.path()
    }

    pub fn commit_on_origin(&self, files: &[(&str, &str)]) -> String {
        commit(&self.origin, files, "Update")
    }

    /// Commit on origin and pull it into the mirror
    pub fn write_and_pull(&self, files: &[(&str, &str)]) {
        self.commit_on_origin(files);
        self.mirror.synchronize().unwrap();
    }

    /// Make the remote unreachable
    pub fn remove_origin(&self) {
        std::fs::remove_dir_all(self.temp.path().join("origin")).unwrap();
    }
}

fn commit(repo: &Repository, files: &[(&str, &str)], message: &str) -> String {
    let root = repo.workdir().unwrap().to_path_buf();
    let mut index = repo.index().unwrap();
    for (name, contents) in files {
        let path = root.join(name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, contents).unwrap();
        index.add_path(Path::new(name)).unwrap();
    }
    index.write().unwrap();

    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
    let sig = Signature::now("Test User", "test@example.com").unwrap();
    let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
    let parents: Vec<_> = parent.iter().collect();

    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
        .unwrap()
        .to_string()
}
