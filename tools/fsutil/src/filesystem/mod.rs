mod real;

pub use real::RealFileSystem;

use std::io;
use std::time::SystemTime;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FileSystemError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Type mismatch: {0} was read as text, expected raw bytes")]
    TypeMismatch(String),

    #[error("Unsupported node kind: {0} is neither a regular file nor a directory")]
    UnsupportedNodeKind(String),
}

impl FileSystemError {
    /// Attach `path` to an I/O error. `ErrorKind::NotFound` becomes [`FileSystemError::NotFound`].
    pub fn io(path: &str, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            Self::NotFound(path.to_string())
        } else {
            Self::Io {
                path: path.to_string(),
                source,
            }
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::Io { source, .. } if source.kind() == io::ErrorKind::AlreadyExists)
    }
}

pub type Result<T> = std::result::Result<T, FileSystemError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    File,
    Directory,
    /// Only reported by [`FileSystem::symlink_metadata`].
    Symlink,
    Other,
}

#[derive(Debug, Clone)]
pub struct Metadata {
    pub kind: NodeKind,
    pub modified: SystemTime,
    pub len: u64,
    pub readonly: bool,
}

impl Metadata {
    pub fn is_file(&self) -> bool {
        self.kind == NodeKind::File
    }

    pub fn is_directory(&self) -> bool {
        self.kind == NodeKind::Directory
    }
}

/// Primitive operations over a tree of `/`-separated paths.
///
/// Implementations must report a missing node as [`FileSystemError::NotFound`]
/// and an existing one on create as an `Io` error of kind `AlreadyExists`.
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Metadata of the node at `path`, following symbolic links.
    async fn metadata(&self, path: &str) -> Result<Metadata>;

    /// Like [`FileSystem::metadata`] but does not follow a final symbolic link.
    async fn symlink_metadata(&self, path: &str) -> Result<Metadata> {
        self.metadata(path).await
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>>;

    async fn write(&self, path: &str, data: &[u8]) -> Result<()>;

    /// Names of the direct children of `path`, in whatever order the backend yields them.
    async fn list_directory(&self, path: &str) -> Result<Vec<String>>;

    async fn create_directory(&self, path: &str) -> Result<()>;

    async fn remove_directory(&self, path: &str) -> Result<()>;

    async fn remove_file(&self, path: &str) -> Result<()>;

    async fn rename(&self, from: &str, to: &str) -> Result<()>;

    async fn hard_link(&self, from: &str, to: &str) -> Result<()>;

    /// Copy the contents of `from` into `to` without buffering the whole file.
    async fn copy_file(&self, from: &str, to: &str) -> Result<()>;

    async fn set_modified_time(&self, path: &str, time: SystemTime) -> Result<()>;
}
