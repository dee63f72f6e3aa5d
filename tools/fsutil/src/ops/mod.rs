mod recursive;

use std::time::SystemTime;
use log::trace;

use crate::content::{FileContent, ReadOptions};
use crate::filesystem::{FileSystem, FileSystemError, Metadata, Result};

pub const DEFAULT_MAX_CONCURRENCY: usize = 16;

#[derive(Debug, Clone)]
pub struct FsOptions {
    /// Children of a single directory processed at once by a recursive
    /// fan-out. Nested directories each get their own allowance.
    pub max_concurrency: usize,
}

impl FsOptions {
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }
}

impl Default for FsOptions {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }
}

/// Async file-tree operations on top of a [`FileSystem`] backend.
///
/// Every operation settles exactly once. Nothing is cached between calls: a
/// node's kind is looked up again each time it is needed.
pub struct FsUtil<FS: FileSystem> {
    filesystem: FS,
    options: FsOptions,
}

impl<FS: FileSystem> FsUtil<FS> {
    pub fn new(filesystem: FS) -> Self {
        Self::with_options(filesystem, FsOptions::default())
    }

    pub fn with_options(filesystem: FS, options: FsOptions) -> Self {
        let max_concurrency = options.max_concurrency;
        let options = options.with_max_concurrency(max_concurrency);
        Self { filesystem, options }
    }

    pub fn options(&self) -> &FsOptions {
        &self.options
    }

    pub async fn stat(&self, path: &str) -> Result<Metadata> {
        trace!("stat {}", path);
        self.filesystem.metadata(path).await
    }

    /// Read the whole file, decoding it to text when `options` asks for an encoding.
    pub async fn read_file(&self, path: &str, options: &ReadOptions) -> Result<FileContent> {
        trace!("read {}", path);
        let bytes = self.filesystem.read(path).await?;
        Ok(match options.encoding {
            Some(encoding) => FileContent::Text(encoding.decode(&bytes)),
            None => FileContent::Bytes(bytes),
        })
    }

    /// Read the whole file as raw bytes. Fails with `TypeMismatch` if the
    /// options turned the content into text.
    pub async fn read_file_to_bytes(&self, path: &str, options: &ReadOptions) -> Result<Vec<u8>> {
        match self.read_file(path, options).await? {
            FileContent::Bytes(bytes) => Ok(bytes),
            FileContent::Text(_) => Err(FileSystemError::TypeMismatch(path.to_string())),
        }
    }

    /// Create or truncate `path` with `data`. A failed write is an error.
    pub async fn write_file(&self, path: &str, data: impl AsRef<[u8]>) -> Result<String> {
        trace!("write {}", path);
        self.filesystem.write(path, data.as_ref()).await?;
        Ok(path.to_string())
    }

    pub async fn read_dir(&self, path: &str) -> Result<Vec<String>> {
        trace!("readdir {}", path);
        self.filesystem.list_directory(path).await
    }

    /// Remove an empty directory.
    pub async fn rm_dir(&self, path: &str) -> Result<()> {
        trace!("rmdir {}", path);
        self.filesystem.remove_directory(path).await
    }

    pub async fn unlink(&self, path: &str) -> Result<()> {
        trace!("unlink {}", path);
        self.filesystem.remove_file(path).await
    }

    pub async fn rename(&self, from: &str, to: &str) -> Result<String> {
        trace!("rename {} -> {}", from, to);
        self.filesystem.rename(from, to).await?;
        Ok(to.to_string())
    }

    pub async fn link(&self, from: &str, to: &str) -> Result<String> {
        trace!("link {} -> {}", from, to);
        self.filesystem.hard_link(from, to).await?;
        Ok(to.to_string())
    }

    /// Stream `src` into `dest`, resolving once `dest` is fully written.
    pub async fn cp(&self, src: &str, dest: &str) -> Result<String> {
        trace!("cp {} -> {}", src, dest);
        self.filesystem.copy_file(src, dest).await?;
        Ok(dest.to_string())
    }

    /// Create one directory level. An existing entry counts as success.
    pub async fn mkdir(&self, path: &str) -> Result<String> {
        trace!("mkdir {}", path);
        match self.filesystem.create_directory(path).await {
            Err(e) if e.is_already_exists() => Ok(path.to_string()),
            Err(e) => Err(e),
            Ok(()) => Ok(path.to_string()),
        }
    }

    pub async fn set_mtime(&self, path: &str, time: SystemTime) -> Result<()> {
        trace!("utimes {}", path);
        self.filesystem.set_modified_time(path, time).await
    }
}
