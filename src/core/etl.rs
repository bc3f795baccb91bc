use crate::core::context::RunContext;
use crate::domain::model::Artifact;
use crate::domain::ports::Pipeline;
use crate::utils::error::Result;
use std::time::Instant;
use tracing::Instrument;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    context: RunContext,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P, context: RunContext) -> Self {
        Self { pipeline, context }
    }

    pub async fn run(&self) -> Result<Artifact> {
        let span = self.context.span().clone();
        let result = self.run_stages().instrument(span).await;

        if let Err(e) = &result {
            tracing::error!(
                parent: self.context.span(),
                "❌ {} ETL run failed: {} (Category: {:?})",
                self.pipeline.name(),
                e,
                e.category()
            );
        }
        result
    }

    async fn run_stages(&self) -> Result<Artifact> {
        let started = Instant::now();
        tracing::info!(
            "🚀 Starting {} ETL process (run {})...",
            self.pipeline.name(),
            self.context.run_id()
        );

        // Extract
        let extracted = self.pipeline.extract().await?;
        tracing::info!("📥 Extraction finished after {:?}", started.elapsed());

        // Transform
        let dataset = self.pipeline.transform(extracted).await?;
        tracing::info!(
            "🔄 Transformed {} rows across {} tables",
            dataset.total_rows(),
            dataset.tables().len()
        );

        // Load
        let artifact = self.pipeline.load(dataset).await?;
        tracing::info!("📁 Output saved to: {}", artifact);
        tracing::info!(
            "✅ {} ETL process completed in {:?}",
            self.pipeline.name(),
            started.elapsed()
        );

        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{Dataset, Table, Value};
    use crate::utils::error::EtlError;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::Mutex;

    struct FakePipeline {
        fail_transform: bool,
        stages: Mutex<Vec<&'static str>>,
    }

    impl FakePipeline {
        fn new(fail_transform: bool) -> Self {
            Self {
                fail_transform,
                stages: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Pipeline for FakePipeline {
        type Extracted = Vec<i64>;

        fn name(&self) -> &'static str {
            "fake"
        }

        async fn extract(&self) -> Result<Vec<i64>> {
            self.stages.lock().unwrap().push("extract");
            Ok(vec![1, 2, 3])
        }

        async fn transform(&self, extracted: Vec<i64>) -> Result<Dataset> {
            self.stages.lock().unwrap().push("transform");
            if self.fail_transform {
                return Err(EtlError::transform("numbers", "refused"));
            }
            let mut table = Table::new("numbers", ["n"]);
            for n in extracted {
                table.push_row(vec![Value::Int(n)])?;
            }
            Ok(Dataset::from_iter([table]))
        }

        async fn load(&self, dataset: Dataset) -> Result<Artifact> {
            self.stages.lock().unwrap().push("load");
            assert_eq!(dataset.total_rows(), 3);
            Ok(Artifact {
                paths: vec![PathBuf::from("output/numbers.csv")],
            })
        }
    }

    #[tokio::test]
    async fn test_runs_stages_in_order() {
        let engine = EtlEngine::new(FakePipeline::new(false), RunContext::new("fake"));
        let artifact = engine.run().await.unwrap();

        assert_eq!(artifact.to_string(), "output/numbers.csv");
        assert_eq!(
            *engine.pipeline.stages.lock().unwrap(),
            vec!["extract", "transform", "load"]
        );
    }

    #[tokio::test]
    async fn test_failure_aborts_before_load() {
        let engine = EtlEngine::new(FakePipeline::new(true), RunContext::new("fake"));
        let err = engine.run().await.unwrap_err();

        assert!(matches!(err, EtlError::TransformError { .. }));
        assert_eq!(*engine.pipeline.stages.lock().unwrap(), vec!["extract", "transform"]);
    }
}
