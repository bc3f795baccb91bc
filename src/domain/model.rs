use crate::utils::error::{EtlError, Result};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// ISO 格式，JSON 輸出與回讀比對都用這個
pub const ISO_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// 表格中的單一儲存格
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
}

impl Value {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) if f.is_finite() => Some(*f),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            Value::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Text(s) => serde_json::Value::String(s.clone()),
            Value::Date(d) => serde_json::Value::String(d.format("%Y-%m-%d").to_string()),
            Value::Timestamp(ts) => {
                serde_json::Value::String(ts.format(ISO_TIMESTAMP_FORMAT).to_string())
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(v) if v.is_finite() => write!(f, "{}", v),
            Value::Float(_) => Ok(()),
            Value::Text(s) => f.write_str(s),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S%.f")),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::Timestamp(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// 固定欄位的實體記錄，轉成表格時依 `COLUMNS` 的順序輸出
pub trait Tabular {
    const COLUMNS: &'static [&'static str];

    fn into_row(self) -> Vec<Value>;
}

/// 具名、欄位已宣告的表格
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    name: String,
    title: String,
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new<I, C>(name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<String>,
    {
        let name = name.into();
        Self {
            title: capitalize(&name),
            name,
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn from_records<T: Tabular>(name: impl Into<String>, records: impl IntoIterator<Item = T>) -> Self {
        let mut table = Self::new(name, T::COLUMNS.iter().copied());
        table.rows = records.into_iter().map(Tabular::into_row).collect();
        table
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 試算表的工作表名稱
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn push_row(&mut self, row: Vec<Value>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(EtlError::ProcessingError {
                message: format!(
                    "Row with {} values does not match the {} columns of table '{}'",
                    row.len(),
                    self.columns.len(),
                    self.name
                ),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    /// 取整欄的值；欄位不存在時回傳同長度的 Null
    pub fn column_or_null(&self, column: &str) -> Vec<Value> {
        match self.column_index(column) {
            Some(idx) => self.rows.iter().map(|r| r[idx].clone()).collect(),
            None => vec![Value::Null; self.rows.len()],
        }
    }

    /// 覆寫既有欄位，或在尾端新增欄位
    pub fn set_column(&mut self, column: &str, values: Vec<Value>) -> Result<()> {
        if values.len() != self.rows.len() {
            return Err(EtlError::ProcessingError {
                message: format!(
                    "Column '{}' has {} values but table '{}' has {} rows",
                    column,
                    values.len(),
                    self.name,
                    self.rows.len()
                ),
            });
        }

        match self.column_index(column) {
            Some(idx) => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[idx] = value;
                }
            }
            None => {
                self.columns.push(column.to_string());
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }
        Ok(())
    }

    /// 逐格轉換既有欄位，欄位不存在時回傳 false
    pub fn map_column<F>(&mut self, column: &str, mut f: F) -> Result<bool>
    where
        F: FnMut(&Value) -> Result<Value>,
    {
        let Some(idx) = self.column_index(column) else {
            return Ok(false);
        };
        for row in self.rows.iter_mut() {
            row[idx] = f(&row[idx])?;
        }
        Ok(true)
    }

    pub fn to_json_records(&self) -> Vec<serde_json::Map<String, serde_json::Value>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .zip(row)
                    .map(|(column, value)| (column.clone(), value.to_json()))
                    .collect()
            })
            .collect()
    }
}

/// 一次執行產出的全部表格，保持插入順序
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    tables: Vec<Table>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, table: Table) {
        self.tables.push(table);
    }

    pub fn get(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name() == name)
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn total_rows(&self) -> usize {
        self.tables.iter().map(Table::len).sum()
    }
}

impl FromIterator<Table> for Dataset {
    fn from_iter<I: IntoIterator<Item = Table>>(iter: I) -> Self {
        Self {
            tables: iter.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum OutputFormat {
    #[default]
    Csv,
    #[serde(alias = "xlsx")]
    #[cfg_attr(feature = "cli", value(alias = "xlsx"))]
    Excel,
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Excel => "excel",
            OutputFormat::Json => "json",
        };
        f.write_str(name)
    }
}

impl FromStr for OutputFormat {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "excel" | "xlsx" => Ok(OutputFormat::Excel),
            "json" => Ok(OutputFormat::Json),
            other => Err(EtlError::InvalidConfigValueError {
                field: "format".to_string(),
                value: other.to_string(),
                reason: "Supported formats: csv, excel, json".to_string(),
            }),
        }
    }
}

/// Loader 產出的檔案
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Artifact {
    pub paths: Vec<PathBuf>,
}

impl Artifact {
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .paths
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        f.write_str(&joined)
    }
}

/// 首字大寫、其餘小寫，例如 `campaigns` -> `Campaigns`
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
