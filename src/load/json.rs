use crate::domain::model::Table;
use crate::utils::error::Result;

/// 每個表格一個頂層 key，值為該表的 row 物件陣列
pub fn encode_tables<'a>(tables: impl IntoIterator<Item = &'a Table>) -> Result<Vec<u8>> {
    let combined: serde_json::Map<String, serde_json::Value> = tables
        .into_iter()
        .map(|table| {
            let records = table
                .to_json_records()
                .into_iter()
                .map(serde_json::Value::Object)
                .collect();
            (table.name().to_string(), serde_json::Value::Array(records))
        })
        .collect();

    Ok(serde_json::to_vec_pretty(&combined)?)
}
