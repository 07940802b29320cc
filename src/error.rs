use thiserror::Error;

/// Failure modes of the dashboard pipeline.
///
/// Only `Parse` and `NoNumericColumns` carry user-facing wording; every other
/// variant is rendered to the client as a generic message plus a format hint.
#[derive(Debug, Error)]
pub enum DashboardError {
    /// The uploaded bytes could not be read as a spreadsheet.
    #[error("Error reading the spreadsheet file: {0}")]
    Parse(String),

    /// The table contains no numeric columns, so there is nothing to chart.
    #[error("No numeric columns found in your data")]
    NoNumericColumns,

    /// A selector referenced a column that is not in the table.
    #[error("unknown column: {0}")]
    UnknownColumn(String),

    /// A chart was requested for a column with no plottable values.
    #[error("column {0} has no numeric values to plot")]
    EmptyColumn(String),

    /// No file has been uploaded in this session.
    #[error("no spreadsheet loaded")]
    NoTable,

    /// A select request referenced a widget the page does not have.
    #[error("unknown selector: {0}")]
    UnknownSelector(String),

    #[error("chart rendering failed: {0}")]
    Render(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DashboardError {
    /// Whether this error has its own user-facing message, as opposed to the
    /// generic catch-all the presentation layer shows for internal failures.
    pub fn is_user_visible(&self) -> bool {
        matches!(
            self,
            DashboardError::Parse(_) | DashboardError::NoNumericColumns
        )
    }
}
