use std::sync::Arc;

use serde::Serialize;

use crate::error::DashboardError;
use crate::ingest::LoadedTable;
use crate::table::Table;

/// Number of KPI cards selected by default after an upload.
pub const DEFAULT_KPI_CARDS: usize = 4;

/// Current widget selections. Each field is addressed by a stable control
/// name so the page can update one selector without touching the rest.
#[derive(Clone, Debug, Default, Serialize)]
pub struct Selections {
    pub kpi: Vec<String>,
    pub bar: Option<String>,
    pub line: Option<String>,
    pub histogram: Option<String>,
    pub pie_category: Option<String>,
    pub pie_value: Option<String>,
}

impl Selections {
    /// Post-upload defaults: first four numeric columns on the KPI cards,
    /// first numeric column in every numeric selector, first text column as
    /// the pie category.
    pub fn defaults_for(table: &Table) -> Self {
        let numeric = table.numeric_columns();
        let text = table.text_columns();
        Selections {
            kpi: numeric.iter().take(DEFAULT_KPI_CARDS).cloned().collect(),
            bar: numeric.first().cloned(),
            line: numeric.first().cloned(),
            histogram: numeric.first().cloned(),
            pie_category: text.first().cloned(),
            pie_value: numeric.first().cloned(),
        }
    }
}

/// Explicit per-session state: the current table and the widget selections.
/// Replaced wholesale on a new upload; handlers mutate only the part their
/// interaction changes.
#[derive(Default)]
pub struct Session {
    table: Option<Arc<LoadedTable>>,
    pub selections: Selections,
}

impl Session {
    /// Install a freshly loaded table, re-defaulting every selection.
    pub fn install(&mut self, loaded: Arc<LoadedTable>) {
        self.selections = Selections::defaults_for(&loaded.table);
        self.table = Some(loaded);
    }

    pub fn loaded(&self) -> bool {
        self.table.is_some()
    }

    pub fn table(&self) -> Result<Arc<LoadedTable>, DashboardError> {
        self.table.clone().ok_or(DashboardError::NoTable)
    }

    /// Update one selector. Every referenced column must exist in the
    /// current table.
    pub fn set_selection(
        &mut self,
        control: &str,
        columns: Vec<String>,
    ) -> Result<(), DashboardError> {
        let loaded = self.table()?;
        for name in &columns {
            if loaded.table.column_index(name).is_none() {
                return Err(DashboardError::UnknownColumn(name.clone()));
            }
        }

        match control {
            "kpi" => self.selections.kpi = columns,
            "bar" => self.selections.bar = columns.into_iter().next(),
            "line" => self.selections.line = columns.into_iter().next(),
            "histogram" => self.selections.histogram = columns.into_iter().next(),
            "pie_category" => self.selections.pie_category = columns.into_iter().next(),
            "pie_value" => self.selections.pie_value = columns.into_iter().next(),
            other => return Err(DashboardError::UnknownSelector(other.to_string())),
        }
        Ok(())
    }
}
