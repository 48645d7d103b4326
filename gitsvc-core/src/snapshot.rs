//! Read-only view of the working copy on disk
//!
//! Reads go straight to the filesystem rather than git's object store, so
//! they reflect the working tree exactly as the last clone or pull left it.

use std::path::{Component, Path, PathBuf};

use serde::Serialize;
use walkdir::WalkDir;

use crate::error::ParseFormat;
use crate::{Error, Result};

/// Name of git's metadata directory (or gitlink file, in submodules)
const GIT_DIR: &str = ".git";

/// File contents, typed by extension
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FileContent {
    /// `.json` files
    Json(serde_json::Value),
    /// `.yaml` / `.yml` files
    Yaml(serde_yaml::Value),
    /// Everything else
    Text(String),
}

impl FileContent {
    /// Interpret `bytes` according to the extension of `path`
    pub fn parse(path: &Path, bytes: &[u8]) -> Result<Self> {
        let extension = path.extension().and_then(|e| e.to_str());

        match extension {
            Some("json") => serde_json::from_slice(bytes)
                .map(FileContent::Json)
                .map_err(|e| Error::Parse {
                    path: path.to_path_buf(),
                    format: ParseFormat::Json,
                    message: e.to_string(),
                }),
            Some("yaml") | Some("yml") => serde_yaml::from_slice(bytes)
                .map(FileContent::Yaml)
                .map_err(|e| Error::Parse {
                    path: path.to_path_buf(),
                    format: ParseFormat::Yaml,
                    message: e.to_string(),
                }),
            _ => Ok(FileContent::Text(String::from_utf8_lossy(bytes).into_owned())),
        }
    }
}

/// Reader over the files under a working-copy root
#[derive(Debug, Clone)]
pub struct Snapshot {
    root: PathBuf,
}

impl Snapshot {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Raw bytes of the file at `relative`
    pub fn read_bytes(&self, relative: &str) -> Result<Vec<u8>> {
        let path = self
            .resolve(relative)
            .ok_or_else(|| Error::NotFound(PathBuf::from(relative)))?;

        std::fs::read(&path).map_err(|_| Error::NotFound(PathBuf::from(relative)))
    }

    /// Contents of the file at `relative`, parsed by extension
    pub fn read_file(&self, relative: &str) -> Result<FileContent> {
        let bytes = self.read_bytes(relative)?;
        FileContent::parse(Path::new(relative), &bytes)
    }

    /// Every regular file under the root, relative to it, outside `.git`
    ///
    /// Order is traversal order.
    pub fn list_tree(&self) -> Result<Vec<String>> {
        let mut files = Vec::new();

        let walker = WalkDir::new(&self.root)
            .into_iter()
            .filter_entry(|entry| entry.file_name() != GIT_DIR);

        for entry in walker {
            let entry = entry.map_err(|e| {
                Error::Io(e.into_io_error().unwrap_or_else(|| {
                    std::io::Error::other("filesystem loop while walking tree")
                }))
            })?;

            if !entry.file_type().is_file() {
                continue;
            }

            let relative = entry
                .path()
                .strip_prefix(&self.root)
                .map_err(|e| Error::Io(std::io::Error::other(e)))?;
            files.push(relative.to_string_lossy().replace('\\', "/"));
        }

        Ok(files)
    }

    /// Join `relative` onto the root, refusing paths that climb out of it
    fn resolve(&self, relative: &str) -> Option<PathBuf> {
        let mut path = self.root.clone();
        for component in Path::new(relative).components() {
            match component {
                Component::Normal(part) => path.push(part),
                Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
                Component::ParentDir => {
                    if !path.pop() || !path.starts_with(&self.root) {
                        return None;
                    }
                }
            }
        }
        Some(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn snapshot_with(files: &[(&str, &str)]) -> (TempDir, Snapshot) {
        let temp = TempDir::new().unwrap();
        for (name, contents) in files {
            let path = temp.path().join(name);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, contents).unwrap();
        }
        let snapshot = Snapshot::new(temp.path());
        (temp, snapshot)
    }

    #[test]
    fn test_read_text() {
        let (_temp, snapshot) = snapshot_with(&[("README.md", "# Test Repo")]);
        assert_eq!(
            snapshot.read_file("README.md").unwrap(),
            FileContent::Text("# Test Repo".to_string())
        );
    }

    #[test]
    fn test_read_bytes_matches_disk() {
        let temp = TempDir::new().unwrap();
        let bytes: Vec<u8> = (0..=255).collect();
        std::fs::write(temp.path().join("blob.bin"), &bytes).unwrap();

        let snapshot = Snapshot::new(temp.path());
        assert_eq!(snapshot.read_bytes("blob.bin").unwrap(), bytes);
    }

    #[test]
    fn test_read_json_and_yaml() {
        let (_temp, snapshot) = snapshot_with(&[
            ("config.json", r#"{"port": 8080, "tags": ["a"]}"#),
            ("config.yml", "port: 8080\n"),
            ("nested/app.yaml", "name: app\n"),
        ]);

        match snapshot.read_file("config.json").unwrap() {
            FileContent::Json(value) => assert_eq!(value["port"], 8080),
            other => panic!("expected JSON, got {:?}", other),
        }
        match snapshot.read_file("config.yml").unwrap() {
            FileContent::Yaml(value) => assert_eq!(value["port"].as_u64(), Some(8080)),
            other => panic!("expected YAML, got {:?}", other),
        }
        assert!(matches!(
            snapshot.read_file("nested/app.yaml").unwrap(),
            FileContent::Yaml(_)
        ));
    }

    #[test]
    fn test_parse_errors() {
        let (_temp, snapshot) = snapshot_with(&[("bad.json", "{"), ("bad.yaml", "a: [1, 2")]);

        assert!(matches!(
            snapshot.read_file("bad.json"),
            Err(Error::Parse { format: ParseFormat::Json, .. })
        ));
        assert!(matches!(
            snapshot.read_file("bad.yaml"),
            Err(Error::Parse { format: ParseFormat::Yaml, .. })
        ));
    }

    #[test]
    fn test_not_found() {
        let (_temp, snapshot) = snapshot_with(&[("dir/file.txt", "x")]);
        assert!(matches!(snapshot.read_file("missing.txt"), Err(Error::NotFound(_))));
        assert!(matches!(snapshot.read_file("dir"), Err(Error::NotFound(_))));
        assert!(matches!(snapshot.read_file(""), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_paths_stay_inside_root() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("secret.txt"), "secret").unwrap();
        std::fs::create_dir(temp.path().join("repo")).unwrap();
        std::fs::write(temp.path().join("repo/a.txt"), "a").unwrap();

        let snapshot = Snapshot::new(temp.path().join("repo"));
        assert!(matches!(snapshot.read_file("../secret.txt"), Err(Error::NotFound(_))));
        assert_eq!(
            snapshot.read_file("/a.txt").unwrap(),
            FileContent::Text("a".to_string())
        );
        assert_eq!(
            snapshot.read_file("./sub/../a.txt").unwrap(),
            FileContent::Text("a".to_string())
        );
        assert_eq!(
            snapshot.read_file("sub/../../secret.txt").unwrap_err().to_string(),
            "File not found: sub/../../secret.txt"
        );
    }

    #[test]
    fn test_list_tree_skips_git_dir() {
        let (_temp, snapshot) = snapshot_with(&[
            ("README.md", "readme"),
            (".gitignore", "target\n"),
            ("src/main.rs", "fn main() {}"),
            (".git/HEAD", "ref: refs/heads/main\n"),
            (".git/objects/ab/cdef", "blob"),
            ("vendor/lib/.git", "gitdir: ../../.git/modules/lib\n"),
            ("vendor/lib/lib.rs", ""),
        ]);

        let mut files = snapshot.list_tree().unwrap();
        files.sort();
        assert_eq!(
            files,
            vec![".gitignore", "README.md", "src/main.rs", "vendor/lib/lib.rs"]
        );
    }

    #[test]
    fn test_list_tree_missing_root() {
        let temp = TempDir::new().unwrap();
        let snapshot = Snapshot::new(temp.path().join("gone"));
        assert!(matches!(snapshot.list_tree(), Err(Error::Io(_))));
    }
}
