use chrono::{Local, NaiveDateTime};
use tracing::Span;

/// 一次執行的上下文：由最外層建立，往下傳給每個元件
#[derive(Debug, Clone)]
pub struct RunContext {
    run_id: String,
    span: Span,
}

impl RunContext {
    pub fn new(pipeline: &'static str) -> Self {
        Self::started_at(pipeline, Local::now().naive_local())
    }

    pub fn started_at(pipeline: &'static str, started_at: NaiveDateTime) -> Self {
        let run_id = started_at.format("%Y%m%d_%H%M%S").to_string();
        let span = tracing::info_span!("etl_run", pipeline, run_id = %run_id);
        Self { run_id, span }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    /// 元件專屬的子 span
    pub fn component(&self, name: &'static str) -> Span {
        tracing::info_span!(parent: &self.span, "component", component = name)
    }
}
