use std::fs;
use std::io;
use std::time::SystemTime;
use async_trait::async_trait;
use filetime::{set_file_mtime, FileTime};
use tokio::io::AsyncWriteExt;

use super::{FileSystem, FileSystemError, Metadata, NodeKind, Result};

/// The local disk, driven through `tokio::fs`.
#[derive(Debug, Clone, Default)]
pub struct RealFileSystem;

impl RealFileSystem {
    pub fn new() -> Self {
        Self
    }
}

fn to_metadata(path: &str, metadata: &fs::Metadata) -> Result<Metadata> {
    let file_type = metadata.file_type();
    let kind = if file_type.is_file() {
        NodeKind::File
    } else if file_type.is_dir() {
        NodeKind::Directory
    } else if file_type.is_symlink() {
        NodeKind::Symlink
    } else {
        NodeKind::Other
    };

    Ok(Metadata {
        kind,
        modified: metadata.modified().map_err(|e| FileSystemError::io(path, e))?,
        len: metadata.len(),
        readonly: metadata.permissions().readonly(),
    })
}

#[async_trait]
impl FileSystem for RealFileSystem {
    async fn metadata(&self, path: &str) -> Result<Metadata> {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| FileSystemError::io(path, e))?;
        to_metadata(path, &metadata)
    }

    async fn symlink_metadata(&self, path: &str) -> Result<Metadata> {
        let metadata = tokio::fs::symlink_metadata(path)
            .await
            .map_err(|e| FileSystemError::io(path, e))?;
        to_metadata(path, &metadata)
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>> {
        tokio::fs::read(path)
            .await
            .map_err(|e| FileSystemError::io(path, e))
    }

    async fn write(&self, path: &str, data: &[u8]) -> Result<()> {
        tokio::fs::write(path, data)
            .await
            .map_err(|e| FileSystemError::io(path, e))
    }

    async fn list_directory(&self, path: &str) -> Result<Vec<String>> {
        let mut entries = tokio::fs::read_dir(path)
            .await
            .map_err(|e| FileSystemError::io(path, e))?;

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| FileSystemError::io(path, e))?
        {
            // Paths are strings throughout; a name that is not UTF-8 cannot be addressed.
            let name = entry.file_name().into_string().map_err(|name| {
                FileSystemError::io(
                    path,
                    io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("non UTF-8 entry name: {}", name.to_string_lossy()),
                    ),
                )
            })?;
            names.push(name);
        }

        Ok(names)
    }

    async fn create_directory(&self, path: &str) -> Result<()> {
        tokio::fs::create_dir(path)
            .await
            .map_err(|e| FileSystemError::io(path, e))
    }

    async fn remove_directory(&self, path: &str) -> Result<()> {
        tokio::fs::remove_dir(path)
            .await
            .map_err(|e| FileSystemError::io(path, e))
    }

    async fn remove_file(&self, path: &str) -> Result<()> {
        tokio::fs::remove_file(path)
            .await
            .map_err(|e| FileSystemError::io(path, e))
    }

    async fn rename(&self, from: &str, to: &str) -> Result<()> {
        tokio::fs::rename(from, to)
            .await
            .map_err(|e| FileSystemError::io(from, e))
    }

    async fn hard_link(&self, from: &str, to: &str) -> Result<()> {
        tokio::fs::hard_link(from, to)
            .await
            .map_err(|e| FileSystemError::io(from, e))
    }

    async fn copy_file(&self, from: &str, to: &str) -> Result<()> {
        let mut reader = tokio::fs::File::open(from)
            .await
            .map_err(|e| FileSystemError::io(from, e))?;
        let mut writer = tokio::fs::File::create(to)
            .await
            .map_err(|e| FileSystemError::io(to, e))?;

        tokio::io::copy(&mut reader, &mut writer)
            .await
            .map_err(|e| FileSystemError::io(to, e))?;
        writer.flush().await.map_err(|e| FileSystemError::io(to, e))?;
        Ok(())
    }

    async fn set_modified_time(&self, path: &str, time: SystemTime) -> Result<()> {
        let target = path.to_string();
        tokio::task::spawn_blocking(move || set_file_mtime(&target, FileTime::from(time)))
            .await
            .map_err(|e| FileSystemError::io(path, io::Error::other(e)))?
            .map_err(|e| FileSystemError::io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn path_str(dir: &TempDir, name: &str) -> String {
        format!("{}/{}", dir.path().display(), name)
    }

    #[tokio::test]
    async fn test_metadata_reports_kind() {
        let dir = TempDir::new().unwrap();
        let file = path_str(&dir, "file.txt");
        std::fs::write(&file, b"hello").unwrap();

        let fs = RealFileSystem::new();
        let metadata = fs.metadata(&file).await.unwrap();
        assert!(metadata.is_file());
        assert_eq!(metadata.len, 5);

        let metadata = fs.metadata(&dir.path().display().to_string()).await.unwrap();
        assert!(metadata.is_directory());
    }

    #[tokio::test]
    async fn test_missing_path_is_not_found() {
        let dir = TempDir::new().unwrap();
        let fs = RealFileSystem::new();

        let err = fs.metadata(&path_str(&dir, "missing")).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_create_existing_directory_is_already_exists() {
        let dir = TempDir::new().unwrap();
        let fs = RealFileSystem::new();

        let err = fs
            .create_directory(&dir.path().display().to_string())
            .await
            .unwrap_err();
        assert!(err.is_already_exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlink_metadata_does_not_follow() {
        let dir = TempDir::new().unwrap();
        let target = path_str(&dir, "target");
        let link = path_str(&dir, "link");
        std::fs::create_dir(&target).unwrap();
        std::os::unix::fs::symlink(&target, &link).unwrap();

        let fs = RealFileSystem::new();
        assert_eq!(fs.symlink_metadata(&link).await.unwrap().kind, NodeKind::Symlink);
        assert_eq!(fs.metadata(&link).await.unwrap().kind, NodeKind::Directory);
    }
}
