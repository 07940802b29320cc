use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};

use crate::error::DashboardError;
use crate::table::{format_number, Table, Value};

/// A parsed upload: the (possibly truncated) table plus a content fingerprint
/// of the raw upload bytes, used as the cache key so repeated uploads of the
/// same file never re-parse and chart renders can be memoized per table.
#[derive(Clone, Debug)]
pub struct LoadedTable {
    pub table: Table,
    pub fingerprint: u64,
}

/// The two spreadsheet container formats the uploader accepts.
pub fn supported_extension(filename: &str) -> bool {
    matches!(
        filename.rsplit('.').next().map(|e| e.to_lowercase()).as_deref(),
        Some("xlsx") | Some("xls")
    ) && filename.contains('.')
}

/// 64-bit content hash of the upload bytes.
pub fn fingerprint(bytes: &[u8]) -> u64 {
    let mut hasher = DefaultHasher::new();
    bytes.hash(&mut hasher);
    hasher.finish()
}

/// Parse an uploaded spreadsheet into a [`LoadedTable`].
///
/// The first worksheet is read; its first row becomes the header (blank
/// header cells get synthesized `Column N` names). Rows beyond the table row
/// limit are discarded by [`Table::new`], which records the original count
/// for the truncation advisory.
pub fn load_workbook(filename: &str, bytes: &[u8]) -> Result<LoadedTable, DashboardError> {
    if !supported_extension(filename) {
        return Err(DashboardError::Parse(format!(
            "unsupported file type: {} (expected .xlsx or .xls)",
            filename
        )));
    }

    let cursor = Cursor::new(bytes);
    let mut workbook = open_workbook_auto_from_rs(cursor)
        .map_err(|e| DashboardError::Parse(e.to_string()))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| DashboardError::Parse("the workbook contains no sheets".to_string()))?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| DashboardError::Parse(e.to_string()))?;

    let mut rows = range.rows();
    let header = rows
        .next()
        .ok_or_else(|| DashboardError::Parse("the spreadsheet is empty".to_string()))?;

    let names: Vec<String> = header
        .iter()
        .enumerate()
        .map(|(i, cell)| header_name(cell, i))
        .collect();

    let data: Vec<Vec<Value>> = rows
        .map(|row| row.iter().map(convert_cell).collect())
        .collect();

    log::info!(
        "parsed sheet '{}' from {}: {} data rows, {} columns",
        sheet_name,
        filename,
        data.len(),
        names.len()
    );

    Ok(LoadedTable {
        table: Table::new(names, data),
        fingerprint: fingerprint(bytes),
    })
}

fn header_name(cell: &Data, index: usize) -> String {
    match cell {
        Data::String(s) if !s.trim().is_empty() => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => format_number(*f),
        _ => format!("Column {}", index + 1),
    }
}

/// Map a calamine cell onto the table's value model. Dates, durations,
/// booleans and error cells become `Unsupported`, which marks their whole
/// column as invisible to the aggregation and chart layers.
fn convert_cell(cell: &Data) -> Value {
    match cell {
        Data::Int(i) => Value::Number(*i as f64),
        Data::Float(f) => Value::Number(*f),
        Data::String(s) => {
            if s.trim().is_empty() {
                Value::Missing
            } else {
                Value::Text(s.clone())
            }
        }
        Data::Empty => Value::Missing,
        Data::Bool(_)
        | Data::DateTime(_)
        | Data::DateTimeIso(_)
        | Data::DurationIso(_)
        | Data::Error(_) => Value::Unsupported,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::ROW_LIMIT;
    use rust_xlsxwriter::Workbook;

    /// Build an in-memory .xlsx with a header row and one numeric + one text
    /// column of `rows` data rows.
    fn fixture(rows: usize) -> Vec<u8> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "amount").unwrap();
        sheet.write_string(0, 1, "region").unwrap();
        for r in 0..rows {
            sheet.write_number((r + 1) as u32, 0, (r + 1) as f64).unwrap();
            sheet
                .write_string((r + 1) as u32, 1, if r % 2 == 0 { "north" } else { "south" })
                .unwrap();
        }
        workbook.save_to_buffer().unwrap()
    }

    #[test]
    fn parses_a_valid_workbook() {
        let bytes = fixture(5);
        let loaded = load_workbook("report.xlsx", &bytes).unwrap();
        assert_eq!(loaded.table.row_count(), 5);
        assert_eq!(loaded.table.column_names(), vec!["amount", "region"]);
        assert_eq!(loaded.table.numeric_columns(), vec!["amount".to_string()]);
        assert_eq!(loaded.table.text_columns(), vec!["region".to_string()]);
        assert_eq!(
            loaded.table.numeric_values("amount").unwrap(),
            vec![1.0, 2.0, 3.0, 4.0, 5.0]
        );
    }

    #[test]
    fn same_bytes_same_fingerprint() {
        let bytes = fixture(3);
        let a = load_workbook("a.xlsx", &bytes).unwrap();
        let b = load_workbook("b.xlsx", &bytes).unwrap();
        assert_eq!(a.fingerprint, b.fingerprint);
        assert_ne!(a.fingerprint, fingerprint(&fixture(4)));
    }

    #[test]
    fn rejects_bytes_that_are_not_a_spreadsheet() {
        // A text file renamed to a supported extension must fail cleanly.
        let err = load_workbook("fake.xlsx", b"just,some,plain\ntext,1,2\n").unwrap_err();
        assert!(matches!(err, DashboardError::Parse(_)));
        assert!(err.is_user_visible());
    }

    #[test]
    fn rejects_unsupported_extensions() {
        let bytes = fixture(1);
        assert!(matches!(
            load_workbook("report.csv", &bytes),
            Err(DashboardError::Parse(_))
        ));
        assert!(matches!(
            load_workbook("noextension", &bytes),
            Err(DashboardError::Parse(_))
        ));
    }

    #[test]
    fn extension_check_is_case_insensitive() {
        let bytes = fixture(1);
        assert!(load_workbook("REPORT.XLSX", &bytes).is_ok());
    }

    #[test]
    fn truncates_past_the_row_limit() {
        let bytes = fixture(ROW_LIMIT + 25);
        let loaded = load_workbook("big.xlsx", &bytes).unwrap();
        assert_eq!(loaded.table.row_count(), ROW_LIMIT);
        assert!(loaded.table.truncated());
        assert_eq!(loaded.table.source_row_count(), ROW_LIMIT + 25);
    }

    #[test]
    fn blank_header_cells_get_synthesized_names() {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "amount").unwrap();
        // header cell (0, 1) left blank
        sheet.write_number(1, 0, 1.0).unwrap();
        sheet.write_string(1, 1, "x").unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let loaded = load_workbook("t.xlsx", &bytes).unwrap();
        assert_eq!(loaded.table.column_names(), vec!["amount", "Column 2"]);
    }

    #[test]
    fn boolean_and_date_columns_are_invisible_to_the_pipeline() {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "flag").unwrap();
        sheet.write_string(0, 1, "amount").unwrap();
        sheet.write_boolean(1, 0, true).unwrap();
        sheet.write_number(1, 1, 3.0).unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let loaded = load_workbook("t.xlsx", &bytes).unwrap();
        assert_eq!(loaded.table.numeric_columns(), vec!["amount".to_string()]);
        assert!(loaded.table.text_columns().is_empty());
        assert_eq!(loaded.table.unsupported_columns(), vec!["flag".to_string()]);
    }
}
