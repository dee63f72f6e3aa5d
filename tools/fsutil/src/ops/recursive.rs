use std::time::SystemTime;
use futures::future::{BoxFuture, FutureExt};
use futures::stream::{self, StreamExt};
use log::debug;

use super::FsUtil;
use crate::filesystem::{FileSystem, FileSystemError, NodeKind, Result};
use crate::path;

impl<FS: FileSystem> FsUtil<FS> {
    /// Remove `path` and everything below it. An absent path is already removed.
    pub async fn rm_rf(&self, path: &str) -> Result<()> {
        self.remove_tree(path.to_string()).await
    }

    /// [`FsUtil::rm_rf`] over every path, concurrently.
    ///
    /// All removals run to completion; the first one to fail decides the result.
    pub async fn rm_rf_many<P: AsRef<str>>(&self, paths: &[P]) -> Result<()> {
        let paths = paths.iter().map(|p| p.as_ref().to_string());
        self.fan_out(paths, |p| self.remove_tree(p)).await?;
        Ok(())
    }

    /// Copy `src` into `dest`. Directory children are copied one at a time in
    /// listing order.
    pub async fn cp_r(&self, src: &str, dest: &str) -> Result<()> {
        self.copy_tree(src.to_string(), dest.to_string()).await
    }

    /// Remove whatever is at `dest`, then copy `src` there.
    pub async fn cp_r_replacing(&self, src: &str, dest: &str) -> Result<()> {
        self.rm_rf(dest).await?;
        self.cp_r(src, dest).await
    }

    /// Create `path` and each missing ancestor, top-down, one level at a time.
    pub async fn mkdir_r(&self, path: &str) -> Result<()> {
        for level in path::ancestors(path) {
            self.mkdir(&level).await?;
        }
        Ok(())
    }

    pub async fn mk_parent_dirs(&self, path: &str) -> Result<()> {
        match path::parent(path) {
            Some(parent) => self.mkdir_r(parent).await,
            None => Ok(()),
        }
    }

    /// Latest modification time of `path` and all its descendants.
    ///
    /// Resolves to `None` when `path` does not exist, including when a
    /// directory vanishes while it is being scanned.
    pub async fn mtime_r(&self, path: &str) -> Result<Option<SystemTime>> {
        self.latest_mtime(path.to_string()).await
    }

    /// Run `op` over every item with at most `max_concurrency` of this call's
    /// items in flight. Nested calls are bounded separately.
    async fn fan_out<'a, T, I, F>(&'a self, items: I, op: F) -> Result<Vec<T>>
    where
        I: IntoIterator<Item = String>,
        F: FnMut(String) -> BoxFuture<'a, Result<T>>,
    {
        let results: Vec<Result<T>> = stream::iter(items)
            .map(op)
            .buffer_unordered(self.options.max_concurrency)
            .collect()
            .await;

        // Completion order, so this is the first failure to happen.
        results.into_iter().collect()
    }

    fn remove_tree(&self, path: String) -> BoxFuture<'_, Result<()>> {
        async move {
            let metadata = match self.filesystem.symlink_metadata(&path).await {
                Ok(metadata) => metadata,
                Err(e) if e.is_not_found() => {
                    debug!("Already absent: {}", path);
                    return Ok(());
                }
                Err(e) => return Err(e),
            };

            if metadata.is_directory() {
                let names = self.read_dir(&path).await?;
                debug!("Removing {} entries under {}", names.len(), path);
                let children = names.into_iter().map(|name| path::join(&path, &name));
                self.fan_out(children, |child| self.remove_tree(child)).await?;
                self.rm_dir(&path).await
            } else {
                self.unlink(&path).await
            }
        }
        .boxed()
    }

    fn copy_tree(&self, src: String, dest: String) -> BoxFuture<'_, Result<()>> {
        async move {
            let metadata = self.stat(&src).await?;

            if metadata.is_directory() {
                self.mkdir(&dest).await?;
                let names = self.read_dir(&src).await?;
                debug!("Copying {} entries: {} -> {}", names.len(), src, dest);
                for name in names {
                    self.copy_tree(path::join(&src, &name), path::join(&dest, &name))
                        .await?;
                }
            } else {
                self.cp(&src, &dest).await?;
            }
            Ok(())
        }
        .boxed()
    }

    fn latest_mtime(&self, path: String) -> BoxFuture<'_, Result<Option<SystemTime>>> {
        async move {
            let metadata = match self.filesystem.metadata(&path).await {
                Ok(metadata) => metadata,
                Err(e) if e.is_not_found() => return Ok(None),
                Err(e) => return Err(e),
            };

            match metadata.kind {
                NodeKind::File => Ok(Some(metadata.modified)),
                NodeKind::Directory => {
                    let names = match self.read_dir(&path).await {
                        Ok(names) => names,
                        Err(e) if e.is_not_found() => return Ok(None),
                        Err(e) => return Err(e),
                    };
                    let children = names.into_iter().map(|name| path::join(&path, &name));
                    let mtimes = self
                        .fan_out(children, |child| self.latest_mtime(child))
                        .await?;
                    let latest = mtimes.into_iter().flatten().fold(metadata.modified, Ord::max);
                    debug!("Latest mtime under {}: {:?}", path, latest);
                    Ok(Some(latest))
                }
                NodeKind::Symlink | NodeKind::Other => Err(FileSystemError::UnsupportedNodeKind(path)),
            }
        }
        .boxed()
    }
}
