use std::collections::{BTreeMap, HashMap};
use std::io;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;
use async_trait::async_trait;

use crate::filesystem::{FileSystem, FileSystemError, Metadata, NodeKind, Result};
use crate::path;

#[derive(Debug, Clone)]
enum MockNode {
    File { content: Vec<u8>, modified: SystemTime },
    Directory { modified: SystemTime },
    Special { modified: SystemTime },
}

impl MockNode {
    fn kind(&self) -> NodeKind {
        match self {
            MockNode::File { .. } => NodeKind::File,
            MockNode::Directory { .. } => NodeKind::Directory,
            MockNode::Special { .. } => NodeKind::Other,
        }
    }

    fn modified_mut(&mut self) -> &mut SystemTime {
        match self {
            MockNode::File { modified, .. }
            | MockNode::Directory { modified }
            | MockNode::Special { modified } => modified,
        }
    }

    fn metadata(&self) -> Metadata {
        let (len, modified) = match self {
            MockNode::File { content, modified } => (content.len() as u64, *modified),
            MockNode::Directory { modified } | MockNode::Special { modified } => (0, *modified),
        };
        Metadata {
            kind: self.kind(),
            modified,
            len,
            readonly: false,
        }
    }
}

/// Primitive operation selector for [`MockFileSystem::fail_on`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOperation {
    Metadata,
    Read,
    Write,
    ListDirectory,
    CreateDirectory,
    RemoveDirectory,
    RemoveFile,
    Rename,
    HardLink,
    CopyFile,
}

/// In-memory tree keyed by path string.
///
/// `""` and `"/"` are an implicit root directory. Entries are listed in name
/// order. Mutating trait calls bump the parent directory's mtime; the
/// `add_*` seeding helpers do not. Hard links are snapshots of the source
/// content.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    nodes: Arc<Mutex<BTreeMap<String, MockNode>>>,
    failures: Arc<Mutex<HashMap<(MockOperation, String), io::ErrorKind>>>,
}

fn is_root(path: &str) -> bool {
    path.is_empty() || path == "/"
}

fn io_error(path: &str, kind: io::ErrorKind, message: &str) -> FileSystemError {
    FileSystemError::io(path, io::Error::new(kind, message))
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&self, path: &str, content: impl Into<Vec<u8>>, modified: SystemTime) {
        let mut nodes = self.nodes.lock().unwrap();
        nodes.insert(
            path.to_string(),
            MockNode::File {
                content: content.into(),
                modified,
            },
        );
    }

    /// Seeds a directory whose mtime is the Unix epoch.
    pub fn add_directory(&self, path: &str) {
        let mut nodes = self.nodes.lock().unwrap();
        nodes
            .entry(path.to_string())
            .or_insert(MockNode::Directory {
                modified: SystemTime::UNIX_EPOCH,
            });
    }

    /// Seeds a node that is neither a file nor a directory (a device or fifo).
    pub fn add_special(&self, path: &str) {
        let mut nodes = self.nodes.lock().unwrap();
        nodes.insert(
            path.to_string(),
            MockNode::Special {
                modified: SystemTime::UNIX_EPOCH,
            },
        );
    }

    /// Makes every later `operation` on `path` fail with `kind`.
    pub fn fail_on(&self, operation: MockOperation, path: &str, kind: io::ErrorKind) {
        let mut failures = self.failures.lock().unwrap();
        failures.insert((operation, path.to_string()), kind);
    }

    pub fn get_file_content(&self, path: &str) -> Option<Vec<u8>> {
        let nodes = self.nodes.lock().unwrap();
        match nodes.get(path) {
            Some(MockNode::File { content, .. }) => Some(content.clone()),
            _ => None,
        }
    }

    pub fn exists(&self, path: &str) -> bool {
        is_root(path) || self.nodes.lock().unwrap().contains_key(path)
    }

    /// Every seeded or created path, sorted.
    pub fn list_all_paths(&self) -> Vec<String> {
        let nodes = self.nodes.lock().unwrap();
        nodes.keys().cloned().collect()
    }

    fn check_failure(&self, operation: MockOperation, path: &str) -> Result<()> {
        let failures = self.failures.lock().unwrap();
        match failures.get(&(operation, path.to_string())) {
            Some(kind) => Err(FileSystemError::io(path, io::Error::from(*kind))),
            None => Ok(()),
        }
    }
}

fn is_child_of(parent: &str, candidate: &str) -> bool {
    match path::parent(candidate) {
        Some(p) => p == parent || (is_root(p) && is_root(parent)),
        None => false,
    }
}

fn has_children(nodes: &BTreeMap<String, MockNode>, dir: &str) -> bool {
    nodes.keys().any(|key| is_child_of(dir, key))
}

/// The parent of `path` must be an existing directory for it to be created.
fn ensure_parent(nodes: &BTreeMap<String, MockNode>, path: &str) -> Result<()> {
    match path::parent(path) {
        None => Ok(()),
        Some(parent) if is_root(parent) => Ok(()),
        Some(parent) => match nodes.get(parent) {
            Some(MockNode::Directory { .. }) => Ok(()),
            Some(_) => Err(io_error(parent, io::ErrorKind::Other, "not a directory")),
            None => Err(FileSystemError::NotFound(parent.to_string())),
        },
    }
}

fn touch_parent(nodes: &mut BTreeMap<String, MockNode>, path: &str) {
    if let Some(parent) = path::parent(path) {
        if let Some(node) = nodes.get_mut(parent) {
            *node.modified_mut() = SystemTime::now();
        }
    }
}

#[async_trait]
impl FileSystem for MockFileSystem {
    async fn metadata(&self, path: &str) -> Result<Metadata> {
        self.check_failure(MockOperation::Metadata, path)?;
        if is_root(path) {
            return Ok(MockNode::Directory {
                modified: SystemTime::UNIX_EPOCH,
            }
            .metadata());
        }

        let nodes = self.nodes.lock().unwrap();
        nodes
            .get(path)
            .map(MockNode::metadata)
            .ok_or_else(|| FileSystemError::NotFound(path.to_string()))
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>> {
        self.check_failure(MockOperation::Read, path)?;
        let nodes = self.nodes.lock().unwrap();
        match nodes.get(path) {
            Some(MockNode::File { content, .. }) => Ok(content.clone()),
            Some(_) => Err(io_error(path, io::ErrorKind::Other, "not a regular file")),
            None => Err(FileSystemError::NotFound(path.to_string())),
        }
    }

    async fn write(&self, path: &str, data: &[u8]) -> Result<()> {
        self.check_failure(MockOperation::Write, path)?;
        let mut nodes = self.nodes.lock().unwrap();
        ensure_parent(&nodes, path)?;
        if matches!(nodes.get(path), Some(MockNode::Directory { .. })) {
            return Err(io_error(path, io::ErrorKind::Other, "is a directory"));
        }

        nodes.insert(
            path.to_string(),
            MockNode::File {
                content: data.to_vec(),
                modified: SystemTime::now(),
            },
        );
        touch_parent(&mut nodes, path);
        Ok(())
    }

    async fn list_directory(&self, path: &str) -> Result<Vec<String>> {
        self.check_failure(MockOperation::ListDirectory, path)?;
        let nodes = self.nodes.lock().unwrap();

        if !is_root(path) {
            match nodes.get(path) {
                Some(MockNode::Directory { .. }) => {}
                Some(_) => return Err(io_error(path, io::ErrorKind::Other, "not a directory")),
                None => return Err(FileSystemError::NotFound(path.to_string())),
            }
        }

        Ok(nodes
            .keys()
            .filter(|key| is_child_of(path, key))
            .map(|key| path::file_name(key).to_string())
            .collect())
    }

    async fn create_directory(&self, path: &str) -> Result<()> {
        self.check_failure(MockOperation::CreateDirectory, path)?;
        let mut nodes = self.nodes.lock().unwrap();
        if is_root(path) || nodes.contains_key(path) {
            return Err(io_error(path, io::ErrorKind::AlreadyExists, "already exists"));
        }
        ensure_parent(&nodes, path)?;

        nodes.insert(
            path.to_string(),
            MockNode::Directory {
                modified: SystemTime::now(),
            },
        );
        touch_parent(&mut nodes, path);
        Ok(())
    }

    async fn remove_directory(&self, path: &str) -> Result<()> {
        self.check_failure(MockOperation::RemoveDirectory, path)?;
        let mut nodes = self.nodes.lock().unwrap();
        match nodes.get(path) {
            Some(MockNode::Directory { .. }) => {}
            Some(_) => return Err(io_error(path, io::ErrorKind::Other, "not a directory")),
            None => return Err(FileSystemError::NotFound(path.to_string())),
        }
        if has_children(&nodes, path) {
            return Err(io_error(path, io::ErrorKind::Other, "directory not empty"));
        }

        nodes.remove(path);
        touch_parent(&mut nodes, path);
        Ok(())
    }

    async fn remove_file(&self, path: &str) -> Result<()> {
        self.check_failure(MockOperation::RemoveFile, path)?;
        let mut nodes = self.nodes.lock().unwrap();
        match nodes.get(path) {
            Some(MockNode::Directory { .. }) => {
                return Err(io_error(path, io::ErrorKind::Other, "is a directory"))
            }
            Some(_) => {}
            None => return Err(FileSystemError::NotFound(path.to_string())),
        }

        nodes.remove(path);
        touch_parent(&mut nodes, path);
        Ok(())
    }

    async fn rename(&self, from: &str, to: &str) -> Result<()> {
        self.check_failure(MockOperation::Rename, from)?;
        let mut nodes = self.nodes.lock().unwrap();
        let source_is_directory = match nodes.get(from) {
            Some(node) => node.kind() == NodeKind::Directory,
            None => return Err(FileSystemError::NotFound(from.to_string())),
        };
        if from == to {
            return Ok(());
        }
        let prefix = format!("{from}/");
        if to.starts_with(&prefix) {
            return Err(io_error(from, io::ErrorKind::InvalidInput, "cannot move a directory into itself"));
        }
        ensure_parent(&nodes, to)?;
        match nodes.get(to) {
            Some(MockNode::Directory { .. }) if !source_is_directory => {
                return Err(io_error(to, io::ErrorKind::Other, "is a directory"))
            }
            Some(MockNode::Directory { .. }) if has_children(&nodes, to) => {
                return Err(io_error(to, io::ErrorKind::Other, "directory not empty"))
            }
            Some(MockNode::File { .. } | MockNode::Special { .. }) if source_is_directory => {
                return Err(io_error(to, io::ErrorKind::Other, "not a directory"))
            }
            _ => {}
        }

        let moved: Vec<String> = nodes
            .keys()
            .filter(|key| key.as_str() == from || key.starts_with(&prefix))
            .cloned()
            .collect();
        for key in moved {
            if let Some(node) = nodes.remove(&key) {
                let new_key = format!("{}{}", to, &key[from.len()..]);
                nodes.insert(new_key, node);
            }
        }

        touch_parent(&mut nodes, from);
        touch_parent(&mut nodes, to);
        Ok(())
    }

    async fn hard_link(&self, from: &str, to: &str) -> Result<()> {
        self.check_failure(MockOperation::HardLink, from)?;
        let mut nodes = self.nodes.lock().unwrap();
        let node = match nodes.get(from) {
            Some(MockNode::Directory { .. }) => {
                return Err(io_error(from, io::ErrorKind::PermissionDenied, "cannot link a directory"))
            }
            Some(node) => node.clone(),
            None => return Err(FileSystemError::NotFound(from.to_string())),
        };
        if nodes.contains_key(to) {
            return Err(io_error(to, io::ErrorKind::AlreadyExists, "already exists"));
        }
        ensure_parent(&nodes, to)?;

        nodes.insert(to.to_string(), node);
        touch_parent(&mut nodes, to);
        Ok(())
    }

    async fn copy_file(&self, from: &str, to: &str) -> Result<()> {
        self.check_failure(MockOperation::CopyFile, from)?;
        let mut nodes = self.nodes.lock().unwrap();
        let content = match nodes.get(from) {
            Some(MockNode::File { content, .. }) => content.clone(),
            Some(_) => return Err(io_error(from, io::ErrorKind::Other, "not a regular file")),
            None => return Err(FileSystemError::NotFound(from.to_string())),
        };
        ensure_parent(&nodes, to)?;
        if matches!(nodes.get(to), Some(MockNode::Directory { .. })) {
            return Err(io_error(to, io::ErrorKind::Other, "is a directory"));
        }

        nodes.insert(
            to.to_string(),
            MockNode::File {
                content,
                modified: SystemTime::now(),
            },
        );
        touch_parent(&mut nodes, to);
        Ok(())
    }

    async fn set_modified_time(&self, path: &str, time: SystemTime) -> Result<()> {
        let mut nodes = self.nodes.lock().unwrap();

        if let Some(node) = nodes.get_mut(path) {
            *node.modified_mut() = time;
            Ok(())
        } else {
            Err(FileSystemError::NotFound(path.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_list_directory_returns_direct_children_only() {
        let fs = MockFileSystem::new();
        fs.add_directory("/src");
        fs.add_directory("/src/sub");
        fs.add_file("/src/a.txt", "a", SystemTime::now());
        fs.add_file("/src/sub/b.txt", "b", SystemTime::now());

        let names = fs.list_directory("/src").await.unwrap();
        assert_eq!(names, vec!["a.txt".to_string(), "sub".to_string()]);

        let names = fs.list_directory("/").await.unwrap();
        assert_eq!(names, vec!["src".to_string()]);
    }

    #[tokio::test]
    async fn test_write_requires_parent_directory() {
        let fs = MockFileSystem::new();
        let err = fs.write("/missing/file.txt", b"x").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_write_bumps_parent_mtime() {
        let fs = MockFileSystem::new();
        fs.add_directory("/dir");

        fs.write("/dir/file.txt", b"x").await.unwrap();
        let parent = fs.metadata("/dir").await.unwrap();
        assert!(parent.modified > SystemTime::UNIX_EPOCH + Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_remove_directory_refuses_non_empty() {
        let fs = MockFileSystem::new();
        fs.add_directory("/dir");
        fs.add_file("/dir/file.txt", "x", SystemTime::now());

        assert!(fs.remove_directory("/dir").await.is_err());
        fs.remove_file("/dir/file.txt").await.unwrap();
        fs.remove_directory("/dir").await.unwrap();
        assert!(!fs.exists("/dir"));
    }

    #[tokio::test]
    async fn test_rename_moves_descendants() {
        let fs = MockFileSystem::new();
        fs.add_directory("/old");
        fs.add_file("/old/file.txt", "x", SystemTime::now());

        fs.rename("/old", "/new").await.unwrap();
        assert_eq!(fs.list_all_paths(), vec!["/new".to_string(), "/new/file.txt".to_string()]);
    }

    #[tokio::test]
    async fn test_rename_into_own_subtree_is_rejected() {
        let fs = MockFileSystem::new();
        fs.add_directory("/a");
        fs.add_file("/a/file.txt", "x", SystemTime::now());

        let err = fs.rename("/a", "/a/b").await.unwrap_err();
        assert!(matches!(err, FileSystemError::Io { ref source, .. } if source.kind() == io::ErrorKind::InvalidInput));
        assert_eq!(fs.list_all_paths(), vec!["/a".to_string(), "/a/file.txt".to_string()]);
    }

    #[tokio::test]
    async fn test_rename_file_onto_directory_is_rejected() {
        let fs = MockFileSystem::new();
        fs.add_file("/file.txt", "x", SystemTime::now());
        fs.add_directory("/empty");

        assert!(fs.rename("/file.txt", "/empty").await.is_err());
        assert!(fs.exists("/file.txt"));
        assert!(matches!(fs.metadata("/empty").await.unwrap().kind, NodeKind::Directory));
    }

    #[tokio::test]
    async fn test_rename_directory_onto_empty_directory_replaces_it() {
        let fs = MockFileSystem::new();
        fs.add_directory("/old");
        fs.add_file("/old/file.txt", "x", SystemTime::now());
        fs.add_directory("/empty");

        fs.rename("/old", "/empty").await.unwrap();
        assert_eq!(fs.list_all_paths(), vec!["/empty".to_string(), "/empty/file.txt".to_string()]);
    }

    #[tokio::test]
    async fn test_fail_on_injects_error() {
        let fs = MockFileSystem::new();
        fs.add_file("/file.txt", "x", SystemTime::now());
        fs.fail_on(MockOperation::Read, "/file.txt", io::ErrorKind::PermissionDenied);

        let err = fs.read("/file.txt").await.unwrap_err();
        assert!(matches!(err, FileSystemError::Io { .. }));
    }
}
