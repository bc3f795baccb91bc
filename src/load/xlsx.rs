//! 最小的 SpreadsheetML (.xlsx) 輸出：每個表格一張工作表，字串以 inline string 寫入，
//! 日期與時間以 Excel 序號搭配內建數字格式。

use crate::domain::model::{Table, Value};
use crate::utils::error::Result;
use chrono::{NaiveDate, NaiveDateTime};
use std::fmt::Write as _;
use std::io::Write;
use zip::write::{SimpleFileOptions, ZipWriter};
use zip::CompressionMethod;

/// Excel 工作表名稱長度上限
pub const MAX_SHEET_NAME_LEN: usize = 31;

const XML_HEADER: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;
const MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const PKG_REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

const STYLE_DATETIME: u8 = 1;
const STYLE_DATE: u8 = 2;

const STYLES_XML: &str = r#"<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><fonts count="1"><font><sz val="11"/><name val="Calibri"/></font></fonts><fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills><borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="3"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="22" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/><xf numFmtId="14" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/></cellXfs><cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles></styleSheet>"#;

/// 工作表名稱：去掉 Excel 不接受的字元並截到 31 字
pub fn sheet_name(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .map(|c| match c {
            '[' | ']' | ':' | '*' | '?' | '/' | '\\' => '_',
            other => other,
        })
        .take(MAX_SHEET_NAME_LEN)
        .collect();
    if cleaned.is_empty() {
        "Sheet".to_string()
    } else {
        cleaned
    }
}

/// 產生整本活頁簿的位元組；`sheets` 依序成為工作表
pub fn build_workbook(sheets: &[&Table]) -> Result<Vec<u8>> {
    let names = unique_sheet_names(sheets);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));

    zip.start_file("[Content_Types].xml", options)?;
    zip.write_all(content_types(sheets.len()).as_bytes())?;

    zip.start_file("_rels/.rels", options)?;
    zip.write_all(root_rels().as_bytes())?;

    zip.start_file("xl/workbook.xml", options)?;
    zip.write_all(workbook_xml(&names).as_bytes())?;

    zip.start_file("xl/_rels/workbook.xml.rels", options)?;
    zip.write_all(workbook_rels(sheets.len()).as_bytes())?;

    zip.start_file("xl/styles.xml", options)?;
    zip.write_all(format!("{}{}", XML_HEADER, STYLES_XML).as_bytes())?;

    for (index, table) in sheets.iter().enumerate() {
        zip.start_file(format!("xl/worksheets/sheet{}.xml", index + 1), options)?;
        zip.write_all(worksheet_xml(table).as_bytes())?;
    }

    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}

fn unique_sheet_names(sheets: &[&Table]) -> Vec<String> {
    let mut names: Vec<String> = Vec::with_capacity(sheets.len());
    for table in sheets {
        let base = sheet_name(table.title());
        let mut candidate = base.clone();
        let mut n = 2;
        while names.iter().any(|existing| existing.eq_ignore_ascii_case(&candidate)) {
            let suffix = format!(" ({})", n);
            let keep = MAX_SHEET_NAME_LEN.saturating_sub(suffix.chars().count());
            candidate = format!("{}{}", base.chars().take(keep).collect::<String>(), suffix);
            n += 1;
        }
        names.push(candidate);
    }
    names
}

fn content_types(sheet_count: usize) -> String {
    let mut xml = String::from(XML_HEADER);
    xml.push_str(r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#);
    xml.push_str(r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#);
    xml.push_str(r#"<Default Extension="xml" ContentType="application/xml"/>"#);
    xml.push_str(r#"<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#);
    xml.push_str(r#"<Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>"#);
    for n in 1..=sheet_count {
        let _ = write!(
            xml,
            r#"<Override PartName="/xl/worksheets/sheet{}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
            n
        );
    }
    xml.push_str("</Types>");
    xml
}

fn root_rels() -> String {
    format!(
        r#"{}<Relationships xmlns="{}"><Relationship Id="rId1" Type="{}/officeDocument" Target="xl/workbook.xml"/></Relationships>"#,
        XML_HEADER, PKG_REL_NS, REL_NS
    )
}

fn workbook_xml(names: &[String]) -> String {
    let mut xml = format!(
        r#"{}<workbook xmlns="{}" xmlns:r="{}"><sheets>"#,
        XML_HEADER, MAIN_NS, REL_NS
    );
    for (index, name) in names.iter().enumerate() {
        let _ = write!(
            xml,
            r#"<sheet name="{}" sheetId="{}" r:id="rId{}"/>"#,
            escape(name),
            index + 1,
            index + 1
        );
    }
    xml.push_str("</sheets></workbook>");
    xml
}

fn workbook_rels(sheet_count: usize) -> String {
    let mut xml = format!(r#"{}<Relationships xmlns="{}">"#, XML_HEADER, PKG_REL_NS);
    for n in 1..=sheet_count {
        let _ = write!(
            xml,
            r#"<Relationship Id="rId{}" Type="{}/worksheet" Target="worksheets/sheet{}.xml"/>"#,
            n, REL_NS, n
        );
    }
    let _ = write!(
        xml,
        r#"<Relationship Id="rId{}" Type="{}/styles" Target="styles.xml"/>"#,
        sheet_count + 1,
        REL_NS
    );
    xml.push_str("</Relationships>");
    xml
}

fn worksheet_xml(table: &Table) -> String {
    let mut xml = format!(r#"{}<worksheet xmlns="{}"><sheetData>"#, XML_HEADER, MAIN_NS);

    xml.push_str(r#"<row r="1">"#);
    for (col, name) in table.columns().iter().enumerate() {
        push_text_cell(&mut xml, &cell_ref(col, 1), name);
    }
    xml.push_str("</row>");

    for (index, row) in table.rows().iter().enumerate() {
        let row_number = index + 2;
        let _ = write!(xml, r#"<row r="{}">"#, row_number);
        for (col, value) in row.iter().enumerate() {
            push_cell(&mut xml, &cell_ref(col, row_number), value);
        }
        xml.push_str("</row>");
    }

    xml.push_str("</sheetData></worksheet>");
    xml
}

fn push_cell(xml: &mut String, reference: &str, value: &Value) {
    match value {
        Value::Null => {}
        Value::Bool(b) => {
            let _ = write!(xml, r#"<c r="{}" t="b"><v>{}</v></c>"#, reference, u8::from(*b));
        }
        Value::Int(i) => {
            let _ = write!(xml, r#"<c r="{}"><v>{}</v></c>"#, reference, i);
        }
        Value::Float(f) if f.is_finite() => {
            let _ = write!(xml, r#"<c r="{}"><v>{}</v></c>"#, reference, f);
        }
        Value::Float(_) => {}
        Value::Text(s) => push_text_cell(xml, reference, s),
        Value::Date(d) => {
            let _ = write!(
                xml,
                r#"<c r="{}" s="{}"><v>{}</v></c>"#,
                reference,
                STYLE_DATE,
                date_serial(*d)
            );
        }
        Value::Timestamp(ts) => {
            let _ = write!(
                xml,
                r#"<c r="{}" s="{}"><v>{}</v></c>"#,
                reference,
                STYLE_DATETIME,
                timestamp_serial(*ts)
            );
        }
    }
}

fn push_text_cell(xml: &mut String, reference: &str, text: &str) {
    let _ = write!(
        xml,
        r#"<c r="{}" t="inlineStr"><is><t xml:space="preserve">{}</t></is></c>"#,
        reference,
        escape(text)
    );
}

/// 0 -> A, 25 -> Z, 26 -> AA
pub fn column_letter(mut index: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

fn cell_ref(col: usize, row: usize) -> String {
    format!("{}{}", column_letter(col), row)
}

fn excel_epoch() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1899, 12, 30)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

pub fn timestamp_serial(ts: NaiveDateTime) -> f64 {
    let millis = (ts - excel_epoch()).num_milliseconds();
    millis as f64 / 86_400_000.0
}

fn date_serial(d: NaiveDate) -> i64 {
    (d - excel_epoch().date()).num_days()
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            // XML 1.0 不允許的控制字元直接略過
            c if (c as u32) < 0x20 && !matches!(c, '\t' | '\n' | '\r') => {}
            c => out.push(c),
        }
    }
    out
}
