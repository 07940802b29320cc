use serde::{Deserialize, Serialize};

use crate::error::DashboardError;

/// Hard ceiling on retained rows; anything past this is discarded at load
/// time and the user gets a truncation advisory.
pub const ROW_LIMIT: usize = 10_000;

/// Number of rows shown in the data preview panel.
pub const PREVIEW_ROWS: usize = 10;

/// A single cell of the loaded table.
///
/// `Unsupported` marks content the pipeline does not aggregate or chart
/// (dates, durations, booleans, spreadsheet error cells). It is distinct from
/// `Missing` so that schema inference can tell an empty column apart from one
/// holding values of an unhandled type.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Number(f64),
    Text(String),
    Missing,
    Unsupported,
}

impl Value {
    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Text form used for group-by keys: numbers in a categorical column
    /// participate under their display form.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Value::Text(s) => Some(s.clone()),
            Value::Number(n) => Some(format_number(*n)),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Text(s) => serde_json::Value::String(s.clone()),
            Value::Missing => serde_json::Value::Null,
            Value::Unsupported => serde_json::Value::Null,
        }
    }
}

/// Render a float without a trailing `.0` for whole numbers, matching how the
/// values looked in the source spreadsheet.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Column classification, assigned once by schema inference at load time and
/// stored alongside the table. Unsupported columns are excluded from both the
/// numeric and categorical sets, so the aggregation and chart layers never
/// see them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Numeric,
    Text,
    Unsupported,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ColumnMeta {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
}

/// In-memory tabular data for the current session.
///
/// The column set and per-column types are fixed at construction; rows are
/// capped at [`ROW_LIMIT`] with the original count retained for the advisory.
#[derive(Clone, Debug)]
pub struct Table {
    columns: Vec<ColumnMeta>,
    rows: Vec<Vec<Value>>,
    source_rows: usize,
}

impl Table {
    /// Build a table from raw parsed rows, running schema inference and the
    /// truncation step. Rows shorter than the header are padded with missing
    /// cells; longer rows are cut to the header width.
    pub fn new(names: Vec<String>, mut rows: Vec<Vec<Value>>) -> Self {
        let width = names.len();
        for row in &mut rows {
            row.resize(width, Value::Missing);
        }

        let source_rows = rows.len();
        rows.truncate(ROW_LIMIT);

        let columns = names
            .into_iter()
            .enumerate()
            .map(|(idx, name)| ColumnMeta {
                name,
                column_type: infer_column_type(&rows, idx),
            })
            .collect();

        Table {
            columns,
            rows,
            source_rows,
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Row count of the source before the truncation step.
    pub fn source_row_count(&self) -> usize {
        self.source_rows
    }

    pub fn truncated(&self) -> bool {
        self.source_rows > self.rows.len()
    }

    pub fn columns(&self) -> &[ColumnMeta] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn numeric_columns(&self) -> Vec<String> {
        self.columns_of_type(ColumnType::Numeric)
    }

    pub fn text_columns(&self) -> Vec<String> {
        self.columns_of_type(ColumnType::Text)
    }

    pub fn unsupported_columns(&self) -> Vec<String> {
        self.columns_of_type(ColumnType::Unsupported)
    }

    fn columns_of_type(&self, wanted: ColumnType) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| c.column_type == wanted)
            .map(|c| c.name.clone())
            .collect()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// All cells of a named column, in table order.
    pub fn column_cells(&self, name: &str) -> Result<Vec<&Value>, DashboardError> {
        let idx = self
            .column_index(name)
            .ok_or_else(|| DashboardError::UnknownColumn(name.to_string()))?;
        Ok(self.rows.iter().map(|row| &row[idx]).collect())
    }

    /// Non-missing numeric values of a column, in table order.
    pub fn numeric_values(&self, name: &str) -> Result<Vec<f64>, DashboardError> {
        Ok(self
            .column_cells(name)?
            .into_iter()
            .filter_map(|v| v.as_number())
            .collect())
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// The first `n` rows as JSON arrays, for the preview panel.
    pub fn preview(&self, n: usize) -> Vec<Vec<serde_json::Value>> {
        self.rows
            .iter()
            .take(n)
            .map(|row| row.iter().map(Value::to_json).collect())
            .collect()
    }
}

/// One-shot type inference for a column: all-numeric cells make a numeric
/// column, any text makes it categorical, and any unhandled content (or a
/// column with no values at all) makes it unsupported.
fn infer_column_type(rows: &[Vec<Value>], idx: usize) -> ColumnType {
    let mut numbers = 0usize;
    let mut texts = 0usize;

    for row in rows {
        match &row[idx] {
            Value::Number(_) => numbers += 1,
            Value::Text(_) => texts += 1,
            Value::Missing => {}
            Value::Unsupported => return ColumnType::Unsupported,
        }
    }

    if texts > 0 {
        ColumnType::Text
    } else if numbers > 0 {
        ColumnType::Numeric
    } else {
        ColumnType::Unsupported
    }
}
