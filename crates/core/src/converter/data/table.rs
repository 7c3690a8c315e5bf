//! Tabular formats: CSV and Excel workbooks.
//!
//! JSON becomes a table as follows:
//! - An array is one row per item; object items contribute their keys as
//!   columns, other items land in a `value` column
//! - An object is a single row
//! - Anything else is a single `value` cell
//!
//! Columns are sorted by name. Strings are written as-is, nulls as empty
//! cells and everything else as compact JSON.
//!
//! Reading goes the other way: the first row names the columns and every
//! following row becomes an object of strings.

use calamine::{Data, Reader, Xls, Xlsx};
use serde_json::{Map, Value as Json};
use std::collections::BTreeSet;
use std::io::Cursor;

use crate::converter::error::ConverterError;

/// Sheet written to, and read from when present.
const SHEET_NAME: &str = "Sheet1";

/// A header row plus data rows, all as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn from_json(value: &Json) -> Self {
        match value {
            Json::Array(items) => {
                let mut columns = BTreeSet::new();
                for item in items {
                    match item {
                        Json::Object(map) => columns.extend(map.keys().cloned()),
                        _ => {
                            columns.insert("value".to_string());
                        }
                    }
                }
                let headers: Vec<String> = columns.into_iter().collect();
                let rows = items
                    .iter()
                    .map(|item| {
                        headers
                            .iter()
                            .map(|h| match item {
                                Json::Object(map) => cell_text(map.get(h)),
                                other if h == "value" => cell_text(Some(other)),
                                _ => String::new(),
                            })
                            .collect()
                    })
                    .collect();
                Self { headers, rows }
            }
            Json::Object(map) => {
                let mut entries: Vec<_> = map.iter().collect();
                entries.sort_by(|a, b| a.0.cmp(b.0));
                let headers = entries.iter().map(|(k, _)| k.to_string()).collect();
                let row = entries.iter().map(|(_, v)| cell_text(Some(v))).collect();
                Self {
                    headers,
                    rows: vec![row],
                }
            }
            other => Self {
                headers: vec!["value".to_string()],
                rows: vec![vec![cell_text(Some(other))]],
            },
        }
    }

    /// Builds a table from raw records, the first being the header row.
    pub fn from_records(mut records: Vec<Vec<String>>) -> Result<Self, ConverterError> {
        if records.is_empty() {
            return Err(ConverterError::parse("table is empty"));
        }
        let headers = records
            .remove(0)
            .into_iter()
            .enumerate()
            .map(|(i, h)| {
                if h.trim().is_empty() {
                    format!("col{}", i + 1)
                } else {
                    h
                }
            })
            .collect();
        Ok(Self {
            headers,
            rows: records,
        })
    }

    /// One object per row; short rows are padded with empty strings.
    pub fn to_json(&self) -> Json {
        Json::Array(
            self.rows
                .iter()
                .map(|row| {
                    let entry: Map<String, Json> = self
                        .headers
                        .iter()
                        .enumerate()
                        .map(|(i, h)| {
                            let cell = row.get(i).cloned().unwrap_or_default();
                            (h.clone(), Json::String(cell))
                        })
                        .collect();
                    Json::Object(entry)
                })
                .collect(),
        )
    }
}

fn cell_text(value: Option<&Json>) -> String {
    match value {
        None | Some(Json::Null) => String::new(),
        Some(Json::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

pub(super) fn write_csv(table: &Table) -> Result<Vec<u8>, ConverterError> {
    let failed = |e: csv::Error| {
        ConverterError::conversion_failed(format!("failed to write CSV: {e}"), None)
    };

    let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(Vec::new());
    if !table.headers.is_empty() {
        writer.write_record(&table.headers).map_err(failed)?;
    }
    for row in &table.rows {
        writer.write_record(row).map_err(failed)?;
    }
    writer
        .into_inner()
        .map_err(|e| ConverterError::conversion_failed(format!("failed to write CSV: {e}"), None))
}

pub(super) fn read_csv(input: &[u8]) -> Result<Table, ConverterError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input);

    let records = reader
        .records()
        .map(|record| {
            record
                .map(|r| r.iter().map(str::to_string).collect::<Vec<_>>())
                .map_err(|e| ConverterError::parse(format!("invalid CSV: {e}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    if records.is_empty() {
        return Err(ConverterError::parse("CSV file is empty"));
    }
    Table::from_records(records)
}

/// Writes an `.xlsx` workbook with a single sheet.
pub(super) fn write_workbook(table: &Table) -> Result<Vec<u8>, ConverterError> {
    let failed = |e: rust_xlsxwriter::XlsxError| {
        ConverterError::conversion_failed(format!("failed to write workbook: {e}"), None)
    };

    let mut workbook = rust_xlsxwriter::Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME).map_err(failed)?;

    for (col, header) in table.headers.iter().enumerate() {
        sheet
            .write_string(0, column_index(col)?, header.as_str())
            .map_err(failed)?;
    }
    for (row_idx, row) in table.rows.iter().enumerate() {
        let row_num = u32::try_from(row_idx + 1)
            .map_err(|_| ConverterError::conversion_failed("too many rows for a worksheet", None))?;
        for (col, value) in row.iter().enumerate() {
            sheet
                .write_string(row_num, column_index(col)?, value.as_str())
                .map_err(failed)?;
        }
    }

    workbook.save_to_buffer().map_err(failed)
}

fn column_index(col: usize) -> Result<u16, ConverterError> {
    u16::try_from(col)
        .map_err(|_| ConverterError::conversion_failed("too many columns for a worksheet", None))
}

/// Reads the first sheet of a workbook.
///
/// The content decides the format rather than the extension, since `.xls`
/// files written by this converter hold Office Open XML.
pub(super) fn read_workbook(input: Vec<u8>) -> Result<Table, ConverterError> {
    let range = match Xlsx::new(Cursor::new(input.clone())) {
        Ok(mut book) => first_sheet(&mut book)?,
        Err(_) => {
            let mut book = Xls::new(Cursor::new(input))
                .map_err(|e| ConverterError::parse(format!("invalid workbook: {e}")))?;
            first_sheet(&mut book)?
        }
    };

    let records: Vec<Vec<String>> = range
        .rows()
        .map(|row| row.iter().map(data_text).collect())
        .collect();
    if records.is_empty() {
        return Err(ConverterError::parse("workbook sheet is empty"));
    }
    Table::from_records(records)
}

fn first_sheet<R>(book: &mut R) -> Result<calamine::Range<Data>, ConverterError>
where
    R: Reader<Cursor<Vec<u8>>>,
    R::Error: std::fmt::Display,
{
    book.worksheet_range_at(0)
        .ok_or_else(|| ConverterError::parse("workbook has no sheets"))?
        .map_err(|e| ConverterError::parse(format!("failed to read sheet: {e}")))
}

fn data_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn people() -> Json {
        json!([{"name": "Ada", "age": 42}, {"name": "Bob", "age": 35, "tags": ["x"]}, "loose"])
    }

    #[test]
    fn test_table_from_array() {
        let table = Table::from_json(&people());
        assert_eq!(table.headers, vec!["age", "name", "tags", "value"]);
        assert_eq!(table.rows[0], vec!["42", "Ada", "", ""]);
        assert_eq!(table.rows[1], vec!["35", "Bob", "[\"x\"]", ""]);
        assert_eq!(table.rows[2], vec!["", "", "", "loose"]);
    }

    #[test]
    fn test_table_from_object_and_scalar() {
        let table = Table::from_json(&json!({"b": null, "a": true}));
        assert_eq!(table.headers, vec!["a", "b"]);
        assert_eq!(table.rows, vec![vec!["true".to_string(), String::new()]]);

        let table = Table::from_json(&json!(7));
        assert_eq!(table.headers, vec!["value"]);
        assert_eq!(table.rows, vec![vec!["7".to_string()]]);
    }

    #[test]
    fn test_records_name_blank_headers_and_pad_rows() {
        let table = Table::from_records(vec![
            vec!["id".into(), " ".into()],
            vec!["1".into()],
        ])
        .unwrap();
        assert_eq!(table.headers, vec!["id", "col2"]);
        assert_eq!(table.to_json(), json!([{"id": "1", "col2": ""}]));
    }

    #[test]
    fn test_csv_round_trip() {
        let table = Table::from_json(&json!([{"name": "Ada, Countess", "age": 42}]));
        let bytes = write_csv(&table).unwrap();
        assert_eq!(
            String::from_utf8(bytes.clone()).unwrap(),
            "age,name\n42,\"Ada, Countess\"\n"
        );

        let back = read_csv(&bytes).unwrap();
        assert_eq!(back.to_json(), json!([{"age": "42", "name": "Ada, Countess"}]));
    }

    #[test]
    fn test_csv_trims_and_rejects_empty() {
        let table = read_csv(b"a, b\n 1 ,2\n").unwrap();
        assert_eq!(table.to_json(), json!([{"a": "1", "b": "2"}]));

        let err = read_csv(b"").unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn test_workbook_round_trip() {
        let bytes = write_workbook(&Table::from_json(&people())).unwrap();
        let back = read_workbook(bytes).unwrap();
        assert_eq!(back.headers, vec!["age", "name", "tags", "value"]);
        assert_eq!(back.rows[0][1], "Ada");
        assert_eq!(back.rows[2][3], "loose");
    }

    #[test]
    fn test_read_workbook_rejects_garbage() {
        let err = read_workbook(b"not a workbook".to_vec()).unwrap_err();
        assert!(matches!(err, ConverterError::Parse { .. }));
    }
}
