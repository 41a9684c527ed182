use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Serialize;

/// Column names the loader knows about. Every other column lands in
/// [`TransactionRecord::extra`].
pub mod columns {
    pub const HOUSEHOLD_ID: &str = "household_id";
    pub const DESCRIPTION: &str = "transaction_original_description";
    pub const AMOUNT: &str = "transaction_amount";
    pub const DATE: &str = "transaction_date";
    pub const CATEGORIZED_AS: &str = "categorized_as";
    pub const CATEGORY_ID: &str = "category_id";
    pub const CATEGORY_NAME: &str = "system_category_name";
}

// ---------------------------------------------------------------------------
// CellValue – a single cell of the loaded table
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value mirroring common dataframe dtypes.
/// Used as a `BTreeMap` / `BTreeSet` key downstream so it must be `Ord`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Date(NaiveDate),
    Null,
}

// -- Manual Eq/Ord so we can put CellValue in BTreeSet --

impl Eq for CellValue {}

impl PartialOrd for CellValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellValue {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use CellValue::*;
        fn discriminant(v: &CellValue) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Integer(_) => 2,
                Float(_) => 3,
                Text(_) => 4,
                Date(_) => 5,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (Text(a), Text(b)) => a.cmp(b),
            (Date(a), Date(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

impl std::hash::Hash for CellValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            CellValue::Text(s) => s.hash(state),
            CellValue::Integer(i) => i.hash(state),
            CellValue::Float(f) => f.to_bits().hash(state),
            CellValue::Bool(b) => b.hash(state),
            CellValue::Date(d) => d.hash(state),
            CellValue::Null => {}
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v:.2}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            CellValue::Null => write!(f, "<null>"),
        }
    }
}

impl CellValue {
    /// Try to interpret the value as an `f64` for numeric statistics.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float(v) => Some(*v),
            CellValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Text cells that are empty after trimming count as missing.
    pub fn from_text(s: &str) -> Self {
        if s.trim().is_empty() {
            CellValue::Null
        } else {
            CellValue::Text(s.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// TransactionRecord – one row of the dataset
// ---------------------------------------------------------------------------

/// A single enriched transaction (one row of the source file).
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRecord {
    pub household_id: String,
    pub description: String,
    pub amount: f64,
    pub date: NaiveDate,
    /// Category id assigned by the enrichment system, if any.
    pub categorized_as: Option<String>,
    /// Category name resolved through the lookup file.
    pub category_name: Option<String>,
    /// Remaining columns: column_name → value.
    pub extra: BTreeMap<String, CellValue>,
}

impl TransactionRecord {
    pub fn is_categorised(&self) -> bool {
        self.category_name.is_some()
    }
}

// ---------------------------------------------------------------------------
// Dataset – the complete loaded table
// ---------------------------------------------------------------------------

/// The full parsed dataset. Immutable once built.
#[derive(Debug, Clone)]
pub struct Dataset {
    records: Vec<TransactionRecord>,
    columns: Vec<String>,
    /// `duplicate[i]` is true when an earlier row shares household,
    /// description, amount and date with row `i`.
    duplicate: Vec<bool>,
    source: PathBuf,
}

impl Dataset {
    /// Build the dataset and its duplicate index from loaded records.
    /// `columns` is the display order of every column, required ones included.
    pub fn new(records: Vec<TransactionRecord>, columns: Vec<String>, source: &Path) -> Self {
        let mut seen: HashSet<(&str, &str, u64, NaiveDate)> = HashSet::new();
        let duplicate = records
            .iter()
            .map(|r| {
                // -0.0 and 0.0 are the same amount
                let amount = if r.amount == 0.0 { 0.0f64 } else { r.amount };
                !seen.insert((
                    r.household_id.as_str(),
                    r.description.as_str(),
                    amount.to_bits(),
                    r.date,
                ))
            })
            .collect();

        Dataset {
            records,
            columns,
            duplicate,
            source: source.to_path_buf(),
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset has no rows.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[TransactionRecord] {
        &self.records
    }

    pub fn record(&self, idx: usize) -> &TransactionRecord {
        &self.records[idx]
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn is_duplicate(&self, idx: usize) -> bool {
        self.duplicate[idx]
    }

    /// Keep only first occurrences from a set of row indices.
    pub fn unique_of(&self, indices: &[usize]) -> Vec<usize> {
        indices
            .iter()
            .copied()
            .filter(|&i| !self.is_duplicate(i))
            .collect()
    }

    /// Generic cell access by column name, used by the summary table.
    pub fn value(&self, idx: usize, column: &str) -> CellValue {
        let r = &self.records[idx];
        match column {
            columns::HOUSEHOLD_ID => CellValue::Text(r.household_id.clone()),
            columns::DESCRIPTION => CellValue::from_text(&r.description),
            columns::AMOUNT => CellValue::Float(r.amount),
            columns::DATE => CellValue::Date(r.date),
            columns::CATEGORIZED_AS => r
                .categorized_as
                .clone()
                .map_or(CellValue::Null, CellValue::Text),
            columns::CATEGORY_NAME => r
                .category_name
                .clone()
                .map_or(CellValue::Null, CellValue::Text),
            other => r.extra.get(other).cloned().unwrap_or(CellValue::Null),
        }
    }

    /// Household ids in order of first appearance.
    pub fn households(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.records
            .iter()
            .filter(|r| seen.insert(r.household_id.as_str()))
            .map(|r| r.household_id.clone())
            .collect()
    }

    /// Sorted set of resolved category names.
    pub fn category_names(&self) -> BTreeSet<String> {
        self.records
            .iter()
            .filter_map(|r| r.category_name.clone())
            .collect()
    }

    pub fn has_uncategorised(&self) -> bool {
        self.records.iter().any(|r| r.category_name.is_none())
    }

    /// Earliest and latest transaction dates.
    pub fn date_bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        let min = self.records.iter().map(|r| r.date).min()?;
        let max = self.records.iter().map(|r| r.date).max()?;
        Some((min, max))
    }
}
