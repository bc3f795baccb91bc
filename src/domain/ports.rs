use crate::domain::model::{Artifact, Dataset};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// 回傳檔案實際落地的位置，作為 artifact 路徑
    fn resolve(&self, path: &str) -> PathBuf;
}

/// 固定延遲的等待點（分頁間隔與 429 冷卻）
#[async_trait]
pub trait Pacer: Send + Sync {
    async fn pause(&self, duration: Duration);
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    type Extracted: Send + 'static;

    fn name(&self) -> &'static str;
    async fn extract(&self) -> Result<Self::Extracted>;
    async fn transform(&self, extracted: Self::Extracted) -> Result<Dataset>;
    async fn load(&self, dataset: Dataset) -> Result<Artifact>;
}
