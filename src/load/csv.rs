use crate::domain::model::Table;
use crate::utils::error::{EtlError, Result};

/// 表格轉 CSV：首列為欄名，Null 輸出為空字串
pub fn encode_table(table: &Table) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(table.columns())?;

    for row in table.rows() {
        writer.write_record(row.iter().map(|v| v.to_string()))?;
    }

    writer
        .into_inner()
        .map_err(|e| EtlError::IoError(e.into_error()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Value;
    use chrono::NaiveDate;

    #[test]
    fn test_encode_quotes_and_nulls() {
        let mut table = Table::new("campaigns", ["campaign_name", "opens", "send_time"]);
        let sent = NaiveDate::from_ymd_opt(2024, 2, 1)
            .unwrap()
            .and_hms_opt(9, 15, 0)
            .unwrap();
        table
            .push_row(vec!["Spring, update".into(), Value::Int(12), Value::Timestamp(sent)])
            .unwrap();
        table
            .push_row(vec!["Plain".into(), Value::Null, Value::Null])
            .unwrap();

        let csv = String::from_utf8(encode_table(&table).unwrap()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines[0], "campaign_name,opens,send_time");
        assert_eq!(lines[1], "\"Spring, update\",12,2024-02-01 09:15:00");
        assert_eq!(lines[2], "Plain,,");
    }
}
