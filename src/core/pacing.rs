use crate::domain::ports::Pacer;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// 真正睡眠的 Pacer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioPacer;

#[async_trait]
impl Pacer for TokioPacer {
    async fn pause(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}

/// 只記錄等待時間、不睡眠，供測試與 dry run 使用
#[derive(Debug, Clone, Default)]
pub struct RecordingPacer {
    pauses: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingPacer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pauses(&self) -> Vec<Duration> {
        self.pauses.lock().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn count_of(&self, duration: Duration) -> usize {
        self.pauses().iter().filter(|d| **d == duration).count()
    }
}

#[async_trait]
impl Pacer for RecordingPacer {
    async fn pause(&self, duration: Duration) {
        if let Ok(mut pauses) = self.pauses.lock() {
            pauses.push(duration);
        }
    }
}
