use crate::domain::ports::Storage;
use crate::utils::error::Result;
use std::path::{Path, PathBuf};

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

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }
}

impl Storage for LocalStorage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let data = tokio::fs::read(self.resolve(path)).await?;
        Ok(data)
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = self.resolve(path);

        // 輸出目錄不存在時自動建立
        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(&full_path, data).await?;
        tracing::debug!("Wrote {} bytes to {}", data.len(), full_path.display());
        Ok(())
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.base_path.join(path)
    }
}
