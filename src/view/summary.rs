use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use crate::data::model::{CellValue, Dataset};

/// How many values the distribution column lists.
const TOP_VALUES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ColumnKind {
    Text,
    Number,
    Bool,
    Date,
    Mixed,
    /// Only nulls in the selection.
    Empty,
}

impl ColumnKind {
    pub fn label(self) -> &'static str {
        match self {
            ColumnKind::Text => "text",
            ColumnKind::Number => "number",
            ColumnKind::Bool => "bool",
            ColumnKind::Date => "date",
            ColumnKind::Mixed => "mixed",
            ColumnKind::Empty => "empty",
        }
    }

    fn of(value: &CellValue) -> Option<ColumnKind> {
        match value {
            CellValue::Text(_) => Some(ColumnKind::Text),
            CellValue::Integer(_) | CellValue::Float(_) => Some(ColumnKind::Number),
            CellValue::Bool(_) => Some(ColumnKind::Bool),
            CellValue::Date(_) => Some(ColumnKind::Date),
            CellValue::Null => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NumericStats {
    pub min: f64,
    pub mean: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValueCount {
    pub value: String,
    pub count: usize,
}

/// One row of the summary table.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSummary {
    pub name: String,
    pub kind: ColumnKind,
    pub non_null: usize,
    pub nulls: usize,
    pub distinct: usize,
    pub numeric: Option<NumericStats>,
    pub date_range: Option<(NaiveDate, NaiveDate)>,
    /// Most frequent values, most common first.
    pub top_values: Vec<ValueCount>,
}

impl ColumnSummary {
    pub fn null_pct(&self) -> f64 {
        let total = self.non_null + self.nulls;
        if total == 0 {
            0.0
        } else {
            (self.nulls as f64 / total as f64) * 100.0
        }
    }
}

/// Dataset-level figures shown above the tables.
#[derive(Debug, Clone, PartialEq)]
pub struct Overview {
    pub rows: usize,
    pub dataset_rows: usize,
    pub columns: usize,
    pub households: usize,
    pub unique_transactions: usize,
    pub total_amount: f64,
    pub mean_amount: f64,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
}

/// `None` when `rows` is empty.
pub fn overview(dataset: &Dataset, rows: &[usize], unique: &[usize]) -> Option<Overview> {
    let records = rows.iter().map(|&i| dataset.record(i));
    let first_date = records.clone().map(|r| r.date).min()?;
    let last_date = records.clone().map(|r| r.date).max()?;
    let total_amount: f64 = records.clone().map(|r| r.amount).sum();
    let households: BTreeSet<&str> = records.map(|r| r.household_id.as_str()).collect();

    Some(Overview {
        rows: rows.len(),
        dataset_rows: dataset.len(),
        columns: dataset.columns().len(),
        households: households.len(),
        unique_transactions: unique.len(),
        total_amount,
        mean_amount: total_amount / rows.len() as f64,
        first_date,
        last_date,
    })
}

/// Per-column statistics over the selected rows.
pub fn summarize_columns(dataset: &Dataset, rows: &[usize]) -> Vec<ColumnSummary> {
    dataset
        .columns()
        .iter()
        .map(|col| summarize_column(dataset, rows, col))
        .collect()
}

fn summarize_column(dataset: &Dataset, rows: &[usize], column: &str) -> ColumnSummary {
    let mut counts: BTreeMap<CellValue, usize> = BTreeMap::new();
    let mut nulls = 0usize;
    for &i in rows {
        let value = dataset.value(i, column);
        if value.is_null() {
            nulls += 1;
        } else {
            *counts.entry(value).or_default() += 1;
        }
    }

    let kinds: BTreeSet<ColumnKind> = counts.keys().filter_map(ColumnKind::of).collect();
    let kind = match (kinds.len(), kinds.first()) {
        (1, Some(only)) => *only,
        (0, _) => ColumnKind::Empty,
        _ => ColumnKind::Mixed,
    };

    let numeric = (kind == ColumnKind::Number).then(|| numeric_stats(&counts)).flatten();
    let date_range = if kind == ColumnKind::Date {
        let mut dates = counts.keys().filter_map(|v| match v {
            CellValue::Date(d) => Some(*d),
            _ => None,
        });
        // keys are sorted, so the first and last dates bound the range
        let first = dates.next();
        first.map(|f| (f, dates.last().unwrap_or(f)))
    } else {
        None
    };

    let mut top: Vec<(&CellValue, usize)> = counts.iter().map(|(v, c)| (v, *c)).collect();
    top.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    let top_values = top
        .into_iter()
        .take(TOP_VALUES)
        .map(|(v, count)| ValueCount {
            value: v.to_string(),
            count,
        })
        .collect();

    ColumnSummary {
        name: column.to_string(),
        kind,
        non_null: rows.len() - nulls,
        nulls,
        distinct: counts.len(),
        numeric,
        date_range,
        top_values,
    }
}

fn numeric_stats(counts: &BTreeMap<CellValue, usize>) -> Option<NumericStats> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut sum = 0.0;
    let mut n = 0usize;
    for (value, &count) in counts {
        let v = value.as_f64()?;
        min = min.min(v);
        max = max.max(v);
        sum += v * count as f64;
        n += count;
    }
    (n > 0).then(|| NumericStats {
        min,
        mean: sum / n as f64,
        max,
    })
}
