use std::cmp::Ordering;
use std::collections::HashMap;

use serde::Serialize;

use crate::error::DashboardError;
use crate::table::Table;

/// The pie chart keeps only this many of the largest-sum groups.
pub const PIE_GROUP_LIMIT: usize = 10;

/// A single KPI card: total and average of a column's non-missing values.
#[derive(Clone, Debug, Serialize)]
pub struct KpiMetric {
    pub column: String,
    pub total: f64,
    /// Absent when the column has no non-missing values.
    pub average: Option<f64>,
    pub count: usize,
}

/// One slice of the pie aggregation: a category key and its summed value.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GroupSum {
    pub key: String,
    pub sum: f64,
}

/// Descriptive statistics for one numeric column.
#[derive(Clone, Debug, Serialize)]
pub struct ColumnSummary {
    pub column: String,
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub q25: Option<f64>,
    pub q50: Option<f64>,
    pub q75: Option<f64>,
    pub max: Option<f64>,
}

/// Total and average of a column, excluding missing cells from both the sum
/// and the mean denominator.
pub fn kpi(table: &Table, column: &str) -> Result<KpiMetric, DashboardError> {
    let values = table.numeric_values(column)?;
    let count = values.len();
    let total: f64 = values.iter().sum();
    let average = if count > 0 {
        Some(total / count as f64)
    } else {
        None
    };
    Ok(KpiMetric {
        column: column.to_string(),
        total,
        average,
        count,
    })
}

/// Group rows by a categorical column, sum a numeric column per group and
/// keep the `limit` largest sums, descending. Rows with a missing category
/// are skipped; missing values contribute nothing to their group's sum. Ties
/// keep first-encounter order (the sort is stable over insertion order).
pub fn top_groups(
    table: &Table,
    category: &str,
    value: &str,
    limit: usize,
) -> Result<Vec<GroupSum>, DashboardError> {
    let categories = table.column_cells(category)?;
    let values = table.column_cells(value)?;

    let mut groups: Vec<GroupSum> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for (cat, val) in categories.iter().zip(values.iter()) {
        let key = match cat.as_text() {
            Some(k) => k,
            None => continue,
        };
        let slot = *index.entry(key.clone()).or_insert_with(|| {
            groups.push(GroupSum { key, sum: 0.0 });
            groups.len() - 1
        });
        if let Some(n) = val.as_number() {
            groups[slot].sum += n;
        }
    }

    groups.sort_by(|a, b| b.sum.partial_cmp(&a.sum).unwrap_or(Ordering::Equal));
    groups.truncate(limit);
    Ok(groups)
}

/// Descriptive statistics for every numeric column: count, mean, unbiased
/// standard deviation, min, quartiles (linear interpolation) and max.
pub fn describe(table: &Table) -> Vec<ColumnSummary> {
    table
        .columns()
        .iter()
        .filter(|c| c.column_type == crate::table::ColumnType::Numeric)
        .map(|c| {
            let values = table.numeric_values(&c.name).unwrap_or_default();
            summarize(&c.name, &values)
        })
        .collect()
}

fn summarize(name: &str, values: &[f64]) -> ColumnSummary {
    let count = values.len();
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mean = if count > 0 {
        Some(values.iter().sum::<f64>() / count as f64)
    } else {
        None
    };

    // Sample standard deviation, n - 1 denominator.
    let std = match (mean, count) {
        (Some(m), n) if n >= 2 => {
            let ss: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
            Some((ss / (n as f64 - 1.0)).sqrt())
        }
        _ => None,
    };

    ColumnSummary {
        column: name.to_string(),
        count,
        mean,
        std,
        min: sorted.first().copied(),
        q25: percentile(&sorted, 0.25),
        q50: percentile(&sorted, 0.50),
        q75: percentile(&sorted, 0.75),
        max: sorted.last().copied(),
    }
}

/// Percentile over pre-sorted values with linear interpolation between the
/// closest ranks.
pub fn percentile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        return Some(sorted[lo]);
    }
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Value;

    fn n(v: f64) -> Value {
        Value::Number(v)
    }

    fn t(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    fn sales_table(rows: Vec<(Value, Value)>) -> Table {
        Table::new(
            vec!["region".into(), "amount".into()],
            rows.into_iter().map(|(a, b)| vec![a, b]).collect(),
        )
    }

    #[test]
    fn kpi_skips_missing_values() {
        let table = sales_table(vec![
            (t("a"), n(10.0)),
            (t("b"), Value::Missing),
            (t("c"), n(20.0)),
        ]);
        let m = kpi(&table, "amount").unwrap();
        assert_eq!(m.total, 30.0);
        assert_eq!(m.average, Some(15.0));
        assert_eq!(m.count, 2);
    }

    #[test]
    fn kpi_is_invariant_under_row_reordering() {
        let forward = sales_table(vec![(t("a"), n(1.0)), (t("b"), n(2.0)), (t("c"), n(3.0))]);
        let backward = sales_table(vec![(t("c"), n(3.0)), (t("b"), n(2.0)), (t("a"), n(1.0))]);
        let f = kpi(&forward, "amount").unwrap();
        let b = kpi(&backward, "amount").unwrap();
        assert_eq!(f.total, b.total);
        assert_eq!(f.average, b.average);
    }

    #[test]
    fn kpi_of_an_all_missing_column_has_no_average() {
        let table = sales_table(vec![(t("a"), Value::Missing)]);
        let m = kpi(&table, "amount").unwrap();
        assert_eq!(m.total, 0.0);
        assert_eq!(m.average, None);
        assert_eq!(m.count, 0);
    }

    #[test]
    fn top_groups_sums_per_category() {
        let table = sales_table(vec![
            (t("north"), n(5.0)),
            (t("south"), n(3.0)),
            (t("north"), n(2.0)),
            (Value::Missing, n(99.0)), // missing category rows are skipped
            (t("south"), Value::Missing),
        ]);
        let groups = top_groups(&table, "region", "amount", PIE_GROUP_LIMIT).unwrap();
        assert_eq!(
            groups,
            vec![
                GroupSum { key: "north".into(), sum: 7.0 },
                GroupSum { key: "south".into(), sum: 3.0 },
            ]
        );
    }

    #[test]
    fn top_groups_keeps_only_the_largest_sums() {
        let rows: Vec<(Value, Value)> = (0..15)
            .map(|i| (t(&format!("g{i:02}")), n(i as f64)))
            .collect();
        let table = sales_table(rows);
        let groups = top_groups(&table, "region", "amount", PIE_GROUP_LIMIT).unwrap();
        assert_eq!(groups.len(), PIE_GROUP_LIMIT);
        assert_eq!(groups[0], GroupSum { key: "g14".into(), sum: 14.0 });
        assert_eq!(groups[9], GroupSum { key: "g05".into(), sum: 5.0 });
    }

    #[test]
    fn top_groups_breaks_ties_by_first_encounter_order() {
        let table = sales_table(vec![
            (t("late"), n(1.0)),
            (t("early"), n(5.0)),
            (t("later"), n(5.0)),
            (t("late"), n(3.0)),
        ]);
        let groups = top_groups(&table, "region", "amount", PIE_GROUP_LIMIT).unwrap();
        // "early" was encountered before "later"; both sum to 5.0, while
        // "late" only reaches 4.0 despite being seen first.
        let keys: Vec<&str> = groups.iter().map(|g| g.key.as_str()).collect();
        assert_eq!(keys, vec!["early", "later", "late"]);
    }

    #[test]
    fn an_all_tied_grouping_keeps_pure_encounter_order() {
        let table = sales_table(vec![
            (t("b"), n(2.0)),
            (t("c"), n(2.0)),
            (t("a"), n(2.0)),
        ]);
        let groups = top_groups(&table, "region", "amount", PIE_GROUP_LIMIT).unwrap();
        let keys: Vec<&str> = groups.iter().map(|g| g.key.as_str()).collect();
        assert_eq!(keys, vec!["b", "c", "a"]);
    }

    #[test]
    fn describe_matches_the_hand_computed_fixture() {
        let table = Table::new(
            vec!["x".into()],
            (1..=5).map(|i| vec![n(i as f64)]).collect(),
        );
        let summaries = describe(&table);
        assert_eq!(summaries.len(), 1);
        let s = &summaries[0];
        assert_eq!(s.count, 5);
        assert_eq!(s.mean, Some(3.0));
        assert!((s.std.unwrap() - 1.5811388300841898).abs() < 1e-12);
        assert_eq!(s.min, Some(1.0));
        assert_eq!(s.q25, Some(2.0));
        assert_eq!(s.q50, Some(3.0));
        assert_eq!(s.q75, Some(4.0));
        assert_eq!(s.max, Some(5.0));
    }

    #[test]
    fn describe_has_one_row_per_numeric_column_only() {
        let table = Table::new(
            vec!["a".into(), "label".into(), "b".into()],
            vec![
                vec![n(1.0), t("x"), n(10.0)],
                vec![n(2.0), t("y"), n(20.0)],
            ],
        );
        let summaries = describe(&table);
        let cols: Vec<&str> = summaries.iter().map(|s| s.column.as_str()).collect();
        assert_eq!(cols, vec!["a", "b"]);
    }

    #[test]
    fn percentile_interpolates_between_ranks() {
        let sorted = vec![1.0, 2.0, 3.0, 4.0];
        assert_eq!(percentile(&sorted, 0.5), Some(2.5));
        assert_eq!(percentile(&sorted, 0.25), Some(1.75));
        assert_eq!(percentile(&sorted, 0.0), Some(1.0));
        assert_eq!(percentile(&sorted, 1.0), Some(4.0));
        assert_eq!(percentile(&[], 0.5), None);
    }

    #[test]
    fn single_value_column_has_no_std() {
        let table = Table::new(vec!["x".into()], vec![vec![n(7.0)]]);
        let s = &describe(&table)[0];
        assert_eq!(s.count, 1);
        assert_eq!(s.mean, Some(7.0));
        assert_eq!(s.std, None);
        assert_eq!(s.q50, Some(7.0));
    }
}
