use crate::domain::ports::Storage;
use crate::utils::error::Result;
use std::path::{Path, PathBuf};

/// Filesystem storage rooted at a base directory. Absolute paths passed to
/// `read_file`/`write_file` bypass the base.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_path.join(path)
        }
    }
}

impl Storage for LocalStorage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let full_path = self.resolve(path);
        tracing::debug!("Reading {}", full_path.display());
        Ok(tokio::fs::read(full_path).await?)
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = self.resolve(path);

        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(&full_path, data).await?;
        tracing::debug!("Wrote {} bytes to {}", data.len(), full_path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path());

        storage
            .write_file("reports/2026/match.json", b"{}")
            .await
            .unwrap();

        assert!(dir.path().join("reports/2026/match.json").exists());
        assert_eq!(
            storage.read_file("reports/2026/match.json").await.unwrap(),
            b"{}"
        );
    }

    #[tokio::test]
    async fn test_absolute_paths_bypass_base() {
        let dir = TempDir::new().unwrap();
        let absolute = dir.path().join("resume.txt");
        std::fs::write(&absolute, "Skills\nRust").unwrap();

        let storage = LocalStorage::new("/nonexistent-base");
        let data = storage
            .read_file(absolute.to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(data, b"Skills\nRust");
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = LocalStorage::new(dir.path())
            .read_file("missing.txt")
            .await
            .unwrap_err();
        assert!(matches!(err, crate::utils::error::CopilotError::IoError(_)));
    }
}
