use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use super::loader::RawTable;
use super::model::{columns, CellValue, Dataset, TransactionRecord};
use crate::error::LoadError;

// ---------------------------------------------------------------------------
// Category lookup
// ---------------------------------------------------------------------------

/// `(household_id, category_id) → system_category_name`.
#[derive(Debug, Clone, Default)]
pub struct CategoryLookup {
    names: HashMap<(String, String), String>,
}

impl CategoryLookup {
    pub fn from_table(table: &RawTable, path: &Path) -> Result<Self, LoadError> {
        let household = required_column(table, columns::HOUSEHOLD_ID, path)?;
        let category = required_column(table, columns::CATEGORY_ID, path)?;
        let name = required_column(table, columns::CATEGORY_NAME, path)?;

        let mut names = HashMap::new();
        let mut duplicates = 0usize;
        for row in &table.rows {
            let (Some(h), Some(c)) = (id_text(&row[household]), id_text(&row[category])) else {
                continue;
            };
            let Some(n) = id_text(&row[name]) else {
                continue;
            };
            // first entry wins so the join never multiplies rows
            if names.contains_key(&(h.clone(), c.clone())) {
                duplicates += 1;
                continue;
            }
            names.insert((h, c), n);
        }
        if duplicates > 0 {
            log::warn!(
                "{}: ignored {duplicates} duplicate (household_id, category_id) entries",
                path.display()
            );
        }

        Ok(CategoryLookup { names })
    }

    pub fn resolve(&self, household_id: &str, category_id: &str) -> Option<&str> {
        self.names
            .get(&(household_id.to_string(), category_id.to_string()))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }
}

// ---------------------------------------------------------------------------
// RawTable → Dataset
// ---------------------------------------------------------------------------

/// Coerce raw rows into typed records and left-join the category lookup.
pub fn build_dataset(
    table: RawTable,
    lookup: Option<&CategoryLookup>,
    path: &Path,
) -> Result<Dataset, LoadError> {
    let household_idx = required_column(&table, columns::HOUSEHOLD_ID, path)?;
    let description_idx = required_column(&table, columns::DESCRIPTION, path)?;
    let amount_idx = required_column(&table, columns::AMOUNT, path)?;
    let date_idx = required_column(&table, columns::DATE, path)?;
    let categorized_idx = table.column_index(columns::CATEGORIZED_AS);
    let name_idx = table.column_index(columns::CATEGORY_NAME);

    let known = [
        columns::HOUSEHOLD_ID,
        columns::DESCRIPTION,
        columns::AMOUNT,
        columns::DATE,
        columns::CATEGORIZED_AS,
        columns::CATEGORY_NAME,
    ];
    let extra_cols: Vec<(usize, &String)> = table
        .columns
        .iter()
        .enumerate()
        .filter(|(_, name)| !known.contains(&name.as_str()))
        .collect();

    let mut records = Vec::with_capacity(table.rows.len());
    for (i, row) in table.rows.iter().enumerate() {
        let row_no = i + 1;
        if row.len() != table.columns.len() {
            return Err(LoadError::Malformed(format!(
                "row {row_no}: expected {} fields, found {}",
                table.columns.len(),
                row.len()
            )));
        }

        let household_id = id_text(&row[household_idx])
            .ok_or_else(|| coercion_error(row_no, columns::HOUSEHOLD_ID, &row[household_idx]))?;
        let description = match &row[description_idx] {
            CellValue::Null => String::new(),
            other => other.to_string(),
        };
        let amount = parse_amount(&row[amount_idx])
            .ok_or_else(|| coercion_error(row_no, columns::AMOUNT, &row[amount_idx]))?;
        let date = parse_date(&row[date_idx])
            .ok_or_else(|| coercion_error(row_no, columns::DATE, &row[date_idx]))?;
        let categorized_as = categorized_idx.and_then(|c| id_text(&row[c]));

        let category_name = match lookup {
            Some(lookup) => categorized_as
                .as_deref()
                .and_then(|c| lookup.resolve(&household_id, c))
                .map(str::to_string),
            None => name_idx.and_then(|c| id_text(&row[c])),
        };

        let extra: BTreeMap<String, CellValue> = extra_cols
            .iter()
            .map(|(c, name)| ((*name).clone(), guess_cell_type(&row[*c])))
            .collect();

        records.push(TransactionRecord {
            household_id,
            description,
            amount,
            date,
            categorized_as,
            category_name,
            extra,
        });
    }

    let mut column_names = table.columns;
    if lookup.is_some() && name_idx.is_none() {
        column_names.push(columns::CATEGORY_NAME.to_string());
    }

    Ok(Dataset::new(records, column_names, path))
}

fn required_column(table: &RawTable, column: &str, path: &Path) -> Result<usize, LoadError> {
    table
        .column_index(column)
        .ok_or_else(|| LoadError::MissingColumn {
            path: path.to_path_buf(),
            column: column.to_string(),
        })
}

fn coercion_error(row: usize, column: &str, value: &CellValue) -> LoadError {
    LoadError::Coercion {
        row,
        column: column.to_string(),
        value: match value {
            CellValue::Null => String::new(),
            other => other.to_string(),
        },
    }
}

// ---------------------------------------------------------------------------
// Cell coercion
// ---------------------------------------------------------------------------

/// Identifiers are text regardless of how the file typed them, so `7` and
/// `7.0` both become `"7"`.
pub fn id_text(cell: &CellValue) -> Option<String> {
    match cell {
        CellValue::Null => None,
        CellValue::Text(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        CellValue::Integer(i) => Some(i.to_string()),
        CellValue::Float(f) if f.fract() == 0.0 && f.is_finite() => Some(format!("{f:.0}")),
        CellValue::Float(f) => Some(f.to_string()),
        CellValue::Bool(b) => Some(b.to_string()),
        CellValue::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
    }
}

/// Accepts plain numbers plus `$` and thousands separators.
pub fn parse_amount(cell: &CellValue) -> Option<f64> {
    match cell {
        CellValue::Float(f) => Some(*f),
        CellValue::Integer(i) => Some(*i as f64),
        CellValue::Text(s) => {
            let cleaned: String = s
                .trim()
                .chars()
                .filter(|c| *c != ',' && *c != '$')
                .collect();
            cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
        }
        _ => None,
    }
}

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Dates, datetimes and RFC 3339 timestamps; any time part is dropped.
pub fn parse_date(cell: &CellValue) -> Option<NaiveDate> {
    let s = match cell {
        CellValue::Date(d) => return Some(*d),
        CellValue::Text(s) => s.trim(),
        _ => return None,
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

/// Best-effort typing for columns without a declared type.
fn guess_cell_type(cell: &CellValue) -> CellValue {
    let CellValue::Text(s) = cell else {
        return cell.clone();
    };
    if let Ok(i) = s.parse::<i64>() {
        return CellValue::Integer(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        return CellValue::Float(f);
    }
    if s == "true" || s == "false" {
        return CellValue::Bool(s == "true");
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return CellValue::Date(d);
    }
    cell.clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    #[test]
    fn ids_normalise_to_text() {
        assert_eq!(id_text(&CellValue::Integer(7)), Some("7".to_string()));
        assert_eq!(id_text(&CellValue::Float(7.0)), Some("7".to_string()));
        assert_eq!(id_text(&text("  abc ")), Some("abc".to_string()));
        assert_eq!(id_text(&CellValue::Null), None);
    }

    #[test]
    fn amounts_accept_currency_formatting() {
        assert_eq!(parse_amount(&text("1,234.56")), Some(1234.56));
        assert_eq!(parse_amount(&text("-$50.00")), Some(-50.0));
        assert_eq!(parse_amount(&CellValue::Integer(3)), Some(3.0));
        assert_eq!(parse_amount(&text("n/a")), None);
        assert_eq!(parse_amount(&text("NaN")), None);
        assert_eq!(parse_amount(&CellValue::Null), None);
    }

    #[test]
    fn dates_accept_common_layouts() {
        let expected = NaiveDate::from_ymd_opt(2024, 7, 8);
        assert_eq!(parse_date(&text("2024-07-08")), expected);
        assert_eq!(parse_date(&text("2024-07-08 12:24:19")), expected);
        assert_eq!(parse_date(&text("2024-07-08T12:24:19.655026+00:00")), expected);
        assert_eq!(parse_date(&text("07/08/2024")), expected);
        assert_eq!(parse_date(&text("yesterday")), None);
    }

    #[test]
    fn extra_columns_are_typed_by_guessing() {
        assert_eq!(guess_cell_type(&text("12")), CellValue::Integer(12));
        assert_eq!(guess_cell_type(&text("1.5")), CellValue::Float(1.5));
        assert_eq!(guess_cell_type(&text("true")), CellValue::Bool(true));
        assert_eq!(
            guess_cell_type(&text("2024-01-02")),
            CellValue::Date(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap())
        );
        assert_eq!(guess_cell_type(&text("Uber")), text("Uber"));
    }

    #[test]
    fn missing_required_column_is_reported() {
        let table = RawTable {
            columns: vec!["household_id".into(), "transaction_amount".into()],
            rows: vec![],
        };
        let err = build_dataset(table, None, Path::new("x.csv")).unwrap_err();
        assert!(
            matches!(&err, LoadError::MissingColumn { column, .. } if column == "transaction_original_description"),
            "{err}"
        );
    }

    #[test]
    fn category_name_column_is_used_without_lookup() {
        let table = RawTable {
            columns: vec![
                "household_id".into(),
                "transaction_original_description".into(),
                "transaction_amount".into(),
                "transaction_date".into(),
                "system_category_name".into(),
            ],
            rows: vec![vec![
                text("1"),
                text("CAFE"),
                text("-3"),
                text("2024-01-01"),
                text("Coffee"),
            ]],
        };
        let ds = build_dataset(table, None, Path::new("x.csv")).unwrap();
        assert_eq!(ds.record(0).category_name.as_deref(), Some("Coffee"));
    }
}
