use crate::domain::ports::Pacer;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_PAGE_SIZE: usize = 1000;
pub const DEFAULT_PAGE_DELAY: Duration = Duration::from_millis(100);

/// 一頁資料；`total` 為 API 回報的總筆數（若有）
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: Option<usize>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self { items, total: None }
    }

    pub fn with_total(mut self, total: Option<usize>) -> Self {
        self.total = total;
        self
    }
}

#[async_trait]
pub trait PageSource: Send + Sync {
    type Item: Send;

    async fn fetch_page(&self, offset: usize, limit: usize) -> Result<Page<Self::Item>>;
}

#[derive(Debug)]
pub struct Paged<T> {
    pub items: Vec<T>,
    pub requests: usize,
}

/// offset 分頁：遇到空頁（或達到回報的總筆數）就停，每頁之間固定等待
#[derive(Clone)]
pub struct Paginator {
    page_size: usize,
    page_delay: Duration,
    pacer: Arc<dyn Pacer>,
}

impl Paginator {
    pub fn new(page_size: usize, page_delay: Duration, pacer: Arc<dyn Pacer>) -> Self {
        Self {
            page_size: page_size.max(1),
            page_delay,
            pacer,
        }
    }

    /// 固定的節流等待，個別請求之後也會用到
    pub async fn pace(&self) {
        self.pacer.pause(self.page_delay).await;
    }

    pub async fn collect<S: PageSource>(&self, source: &S) -> Result<Paged<S::Item>> {
        let mut items = Vec::new();
        let mut offset = 0;
        let mut requests = 0;

        loop {
            let page = source.fetch_page(offset, self.page_size).await?;
            requests += 1;

            if page.items.is_empty() {
                break;
            }

            tracing::debug!("📄 Page {} at offset {}: {} items", requests, offset, page.items.len());
            items.extend(page.items);
            offset += self.page_size;
            self.pace().await;

            if matches!(page.total, Some(total) if offset >= total) {
                break;
            }
        }

        Ok(Paged { items, requests })
    }
}
