//! Local filesystem storage

use super::traits::StorageBackend;
use async_trait::async_trait;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Storage backed by the local filesystem
pub struct FsStorage {
    /// Directory that receives merge manifests
    manifest_dir: PathBuf,
}

impl FsStorage {
    pub fn new(manifest_dir: impl Into<PathBuf>) -> Self {
        Self {
            manifest_dir: manifest_dir.into(),
        }
    }
}

#[async_trait]
impl StorageBackend for FsStorage {
    async fn delete(&self, location: &Path) -> io::Result<()> {
        tokio::fs::remove_file(location).await?;
        tracing::debug!("Deleted {:?}", location);
        Ok(())
    }

    async fn write_manifest(&self, lines: &[String]) -> io::Result<PathBuf> {
        let dir = self.manifest_dir.clone();
        let mut content = lines.join("\n");
        content.push('\n');

        tokio::task::spawn_blocking(move || -> io::Result<PathBuf> {
            std::fs::create_dir_all(&dir)?;
            let mut file = tempfile::Builder::new()
                .prefix("manifest_")
                .suffix(".txt")
                .tempfile_in(&dir)?;
            file.write_all(content.as_bytes())?;
            file.flush()?;
            let (_, path) = file.keep()?;
            Ok(path)
        })
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("Manifest task failed: {}", e)))?
    }

    async fn prepare_dir(&self, dir: &Path) -> io::Result<PathBuf> {
        tokio::fs::create_dir_all(dir).await?;
        tokio::fs::canonicalize(dir).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_manifest_one_line_per_entry() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsStorage::new(dir.path());

        let lines = vec!["file '/a.mp4'".to_string(), "file '/b.mp4'".to_string()];
        let path = storage.write_manifest(&lines).await.unwrap();

        assert!(path.starts_with(dir.path()));
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "file '/a.mp4'\nfile '/b.mp4'\n");
    }

    #[tokio::test]
    async fn test_manifests_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsStorage::new(dir.path());

        let first = storage.write_manifest(&["a".to_string()]).await.unwrap();
        let second = storage.write_manifest(&["b".to_string()]).await.unwrap();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_delete_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsStorage::new(dir.path());
        let file = dir.path().join("segment_1.mp4");
        std::fs::write(&file, b"data").unwrap();

        storage.delete(&file).await.unwrap();
        assert!(!file.exists());
    }

    #[tokio::test]
    async fn test_delete_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsStorage::new(dir.path());

        let err = storage.delete(&dir.path().join("missing.mp4")).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_prepare_dir_creates_and_resolves() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsStorage::new(dir.path());

        let nested = dir.path().join("a").join("b");
        let resolved = storage.prepare_dir(&nested).await.unwrap();
        assert!(resolved.is_absolute());
        assert!(resolved.is_dir());
    }
}
