pub mod csv;
pub mod json;
pub mod xlsx;

use crate::core::context::RunContext;
use crate::domain::model::{Artifact, Dataset, OutputFormat, Table};
use crate::domain::ports::Storage;
use crate::utils::error::Result;
use chrono::{Local, NaiveDateTime};
use tracing::Span;

pub const FILE_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// 把一次執行的表格寫成單一帶時間戳的輸出
pub struct Loader<S: Storage> {
    storage: S,
    base_name: String,
    span: Span,
}

impl<S: Storage> Loader<S> {
    pub fn new(storage: S, base_name: impl Into<String>, context: &RunContext) -> Self {
        Self {
            storage,
            base_name: base_name.into(),
            span: context.component("loader"),
        }
    }

    pub async fn load(
        &self,
        dataset: &Dataset,
        summary: Option<&Table>,
        format: OutputFormat,
    ) -> Result<Artifact> {
        self.load_at(dataset, summary, format, Local::now().naive_local())
            .await
    }

    pub async fn load_at(
        &self,
        dataset: &Dataset,
        summary: Option<&Table>,
        format: OutputFormat,
        now: NaiveDateTime,
    ) -> Result<Artifact> {
        let timestamp = now.format(FILE_TIMESTAMP_FORMAT).to_string();

        let tables: Vec<&Table> = dataset.tables().iter().filter(|t| !t.is_empty()).collect();
        for skipped in dataset.tables().iter().filter(|t| t.is_empty()) {
            tracing::debug!(parent: &self.span, "Skipping empty table '{}'", skipped.name());
        }

        if tables.is_empty() {
            tracing::warn!(parent: &self.span, "⚠️ Every table is empty, nothing to write");
            return Ok(Artifact::default());
        }

        let artifact = match format {
            OutputFormat::Csv => self.write_csv(&tables, &timestamp).await?,
            OutputFormat::Excel => self.write_excel(&tables, summary, &timestamp).await?,
            OutputFormat::Json => self.write_json(&tables, &timestamp).await?,
        };

        tracing::info!(parent: &self.span, "💾 Successfully loaded data to {}", artifact);
        Ok(artifact)
    }

    async fn write_csv(&self, tables: &[&Table], timestamp: &str) -> Result<Artifact> {
        let mut paths = Vec::with_capacity(tables.len());
        for table in tables {
            let filename = format!("{}_{}_{}.csv", self.base_name, table.name(), timestamp);
            let data = csv::encode_table(table)?;
            self.storage.write_file(&filename, &data).await?;
            tracing::debug!(parent: &self.span, "Wrote {} rows to {}", table.len(), filename);
            paths.push(self.storage.resolve(&filename));
        }
        Ok(Artifact { paths })
    }

    async fn write_excel(
        &self,
        tables: &[&Table],
        summary: Option<&Table>,
        timestamp: &str,
    ) -> Result<Artifact> {
        let filename = format!("{}_{}.xlsx", self.base_name, timestamp);

        let mut sheets = tables.to_vec();
        if let Some(summary) = summary.filter(|s| !s.is_empty()) {
            sheets.push(summary);
        }

        let data = xlsx::build_workbook(&sheets)?;
        tracing::debug!(
            parent: &self.span,
            "Writing workbook with {} sheets ({} bytes)",
            sheets.len(),
            data.len()
        );
        self.storage.write_file(&filename, &data).await?;

        Ok(Artifact {
            paths: vec![self.storage.resolve(&filename)],
        })
    }

    async fn write_json(&self, tables: &[&Table], timestamp: &str) -> Result<Artifact> {
        let filename = format!("{}_{}.json", self.base_name, timestamp);
        let data = json::encode_tables(tables.iter().copied())?;
        self.storage.write_file(&filename, &data).await?;

        Ok(Artifact {
            paths: vec![self.storage.resolve(&filename)],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Value;
    use crate::utils::error::EtlError;
    use chrono::NaiveDate;
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone, Default)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        async fn file_names(&self) -> Vec<String> {
            let mut names: Vec<String> = self.files.lock().await.keys().cloned().collect();
            names.sort();
            names
        }
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned().ok_or_else(|| {
                EtlError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }

        fn resolve(&self, path: &str) -> PathBuf {
            PathBuf::from("output").join(path)
        }
    }

    fn fixed_now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 6)
            .unwrap()
            .and_hms_opt(7, 8, 9)
            .unwrap()
    }

    fn dataset() -> Dataset {
        let lists = Table::new("lists", ["list_id"]);
        let mut campaigns = Table::new("campaigns", ["campaign_id", "emails_sent"]);
        campaigns
            .push_row(vec!["c1".into(), Value::Int(100)])
            .unwrap();
        Dataset::from_iter([lists, campaigns])
    }

    fn loader(storage: &MockStorage) -> Loader<MockStorage> {
        Loader::new(storage.clone(), "mailchimp_data", &RunContext::new("test"))
    }

    #[tokio::test]
    async fn test_csv_skips_empty_tables() {
        let storage = MockStorage::default();
        let artifact = loader(&storage)
            .load_at(&dataset(), None, OutputFormat::Csv, fixed_now())
            .await
            .unwrap();

        assert_eq!(
            storage.file_names().await,
            vec!["mailchimp_data_campaigns_20240506_070809.csv"]
        );
        assert_eq!(
            artifact.paths,
            vec![PathBuf::from("output/mailchimp_data_campaigns_20240506_070809.csv")]
        );
    }

    #[tokio::test]
    async fn test_json_has_one_key_per_non_empty_table() {
        let storage = MockStorage::default();
        loader(&storage)
            .load_at(&dataset(), None, OutputFormat::Json, fixed_now())
            .await
            .unwrap();

        let bytes = storage
            .read_file("mailchimp_data_20240506_070809.json")
            .await
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        let keys: Vec<&String> = parsed.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["campaigns"]);
    }

    #[tokio::test]
    async fn test_all_empty_writes_nothing() {
        let storage = MockStorage::default();
        let empty = Dataset::from_iter([Table::new("lists", ["list_id"])]);
        let artifact = loader(&storage)
            .load_at(&empty, None, OutputFormat::Excel, fixed_now())
            .await
            .unwrap();

        assert!(artifact.is_empty());
        assert!(storage.file_names().await.is_empty());
    }
}
