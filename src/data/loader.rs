use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{Array, AsArray};
use arrow::compute::cast;
use arrow::datatypes::{
    DataType, Date32Type, Float32Type, Float64Type, Int16Type, Int32Type, Int64Type, Int8Type,
    UInt32Type, UInt64Type,
};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::coerce::{build_dataset, CategoryLookup};
use super::model::{CellValue, Dataset};
use crate::error::LoadError;

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Where the dataset lives on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetSource {
    /// The enrichment evidence file (one row per transaction).
    pub transactions: PathBuf,
    /// Optional category lookup joined onto `categorized_as`.
    pub categories: Option<PathBuf>,
}

/// Column names plus untyped-or-typed cells, before coercion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl RawTable {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

/// Load the transactions file and, if configured, join the category lookup.
pub fn load_dataset(source: &DatasetSource) -> Result<Dataset, LoadError> {
    let table = load_table(&source.transactions)?;
    log::debug!(
        "read {} rows x {} columns from {}",
        table.rows.len(),
        table.columns.len(),
        source.transactions.display()
    );

    let lookup = match &source.categories {
        Some(path) => {
            let lookup = CategoryLookup::from_table(&load_table(path)?, path)?;
            log::debug!("{} category entries in {}", lookup.len(), path.display());
            Some(lookup)
        }
        None => None,
    };

    build_dataset(table, lookup.as_ref(), &source.transactions)
}

/// Read a flat table from a file. Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row, one record per line
/// * `.json`    – `[{ "column": value, ... }, ...]`
/// * `.parquet` – flat scalar columns
pub fn load_table(path: &Path) -> Result<RawTable, LoadError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "csv" => load_csv(path),
        "json" => load_json(path),
        "parquet" | "pq" => load_parquet(path),
        other => Err(LoadError::UnsupportedFormat(other.to_string())),
    }
}

fn open(path: &Path) -> Result<File, LoadError> {
    File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// Every cell is kept as text; typing happens during coercion.
fn load_csv(path: &Path) -> Result<RawTable, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::Headers)
        .from_reader(open(path)?);

    let columns: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        rows.push(record.iter().map(CellValue::from_text).collect());
    }

    Ok(RawTable { columns, rows })
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON layout (records-oriented, `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "household_id": 12, "transaction_amount": -4.5, ... },
///   ...
/// ]
/// ```
///
/// Columns are the union of keys in order of first appearance; keys missing
/// from a record read as null.
fn load_json(path: &Path) -> Result<RawTable, LoadError> {
    let root: JsonValue = serde_json::from_reader(BufReader::new(open(path)?))?;

    let records = root
        .as_array()
        .ok_or_else(|| LoadError::Malformed("expected a top-level JSON array".to_string()))?;

    let mut columns: Vec<String> = Vec::new();
    let mut objects = Vec::with_capacity(records.len());
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .ok_or_else(|| LoadError::Malformed(format!("row {}: not a JSON object", i + 1)))?;
        for key in obj.keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
        objects.push(obj);
    }

    let rows = objects
        .iter()
        .map(|obj| {
            columns
                .iter()
                .map(|col| obj.get(col).map_or(CellValue::Null, json_to_cell))
                .collect()
        })
        .collect();

    Ok(RawTable { columns, rows })
}

fn json_to_cell(val: &JsonValue) -> CellValue {
    match val {
        JsonValue::String(s) => CellValue::from_text(s),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                CellValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                CellValue::Float(f)
            } else {
                CellValue::Text(n.to_string())
            }
        }
        JsonValue::Bool(b) => CellValue::Bool(*b),
        JsonValue::Null => CellValue::Null,
        other => CellValue::Text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file of flat scalar columns.
///
/// Timestamps are narrowed to dates and dictionary-encoded strings (Pandas
/// categoricals) are decoded before reading. Works with files written by
/// both **Pandas** (`df.to_parquet()`) and **Polars** (`df.write_parquet()`).
fn load_parquet(path: &Path) -> Result<RawTable, LoadError> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(open(path)?)?;
    let columns: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build()?;

    let mut rows = Vec::new();
    for batch_result in reader {
        let batch = batch_result?;

        let arrays = batch
            .columns()
            .iter()
            .map(normalise_column)
            .collect::<Result<Vec<_>, _>>()?;

        for row in 0..batch.num_rows() {
            rows.push(arrays.iter().map(|col| extract_cell(col, row)).collect());
        }
    }

    Ok(RawTable { columns, rows })
}

// -- Parquet / Arrow helpers --

/// Cast column types we read indirectly into ones `extract_cell` handles.
fn normalise_column(col: &Arc<dyn Array>) -> Result<Arc<dyn Array>, LoadError> {
    let target = match col.data_type() {
        DataType::Timestamp(_, _) | DataType::Date64 => Some(DataType::Date32),
        DataType::Dictionary(_, _) => Some(DataType::Utf8),
        _ => None,
    };
    match target {
        Some(t) => Ok(cast(col, &t)?),
        None => Ok(Arc::clone(col)),
    }
}

/// Extract a single cell from an Arrow column at a given row.
fn extract_cell(col: &Arc<dyn Array>, row: usize) -> CellValue {
    if col.is_null(row) {
        return CellValue::Null;
    }
    match col.data_type() {
        DataType::Utf8 => CellValue::from_text(col.as_string::<i32>().value(row)),
        DataType::LargeUtf8 => CellValue::from_text(col.as_string::<i64>().value(row)),
        DataType::Int8 => CellValue::Integer(col.as_primitive::<Int8Type>().value(row) as i64),
        DataType::Int16 => CellValue::Integer(col.as_primitive::<Int16Type>().value(row) as i64),
        DataType::Int32 => CellValue::Integer(col.as_primitive::<Int32Type>().value(row) as i64),
        DataType::Int64 => CellValue::Integer(col.as_primitive::<Int64Type>().value(row)),
        DataType::UInt32 => CellValue::Integer(col.as_primitive::<UInt32Type>().value(row) as i64),
        DataType::UInt64 => {
            let v = col.as_primitive::<UInt64Type>().value(row);
            i64::try_from(v).map_or(CellValue::Float(v as f64), CellValue::Integer)
        }
        DataType::Float32 => {
            CellValue::Float(col.as_primitive::<Float32Type>().value(row) as f64)
        }
        DataType::Float64 => CellValue::Float(col.as_primitive::<Float64Type>().value(row)),
        DataType::Boolean => CellValue::Bool(col.as_boolean().value(row)),
        DataType::Date32 => col
            .as_primitive::<Date32Type>()
            .value_as_date(row)
            .map_or(CellValue::Null, CellValue::Date),
        other => CellValue::Text(format!("{other:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use arrow::array::{Float64Array, StringArray, TimestampMillisecondArray};
    use arrow::datatypes::{Field, Schema, TimeUnit};
    use arrow::record_batch::RecordBatch;
    use parquet::arrow::ArrowWriter;

    const HEADER: &str =
        "household_id,transaction_original_description,transaction_amount,transaction_date,categorized_as";

    fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        let mut f = File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    }

    fn source(path: PathBuf) -> DatasetSource {
        DatasetSource {
            transactions: path,
            categories: None,
        }
    }

    #[test]
    fn csv_row_count_matches_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut content = format!("{HEADER}\n");
        for i in 0..100 {
            content.push_str(&format!("{},SHOP {i},-{i}.25,2024-05-{:02},c{}\n", i % 7, i % 28 + 1, i % 3));
        }
        let path = write_file(dir.path(), "tx.csv", &content);

        let ds = load_dataset(&source(path)).unwrap();
        assert_eq!(ds.len(), 100);
        assert_eq!(ds.record(5).amount, -5.25);
    }

    #[test]
    fn header_only_csv_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "tx.csv", &format!("{HEADER}\n"));

        let ds = load_dataset(&source(path)).unwrap();
        assert!(ds.is_empty());
        assert_eq!(ds.columns().len(), 5);
    }

    #[test]
    fn missing_file_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_dataset(&source(dir.path().join("nope.csv"))).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }), "{err}");
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "tx.xlsx", "");
        let err = load_dataset(&source(path)).unwrap_err();
        assert!(matches!(err, LoadError::UnsupportedFormat(ext) if ext == "xlsx"));
    }

    #[test]
    fn ragged_csv_row_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "tx.csv",
            &format!("{HEADER}\n1,A,1.0,2024-01-01,c1\n2,B,2.0\n"),
        );
        let err = load_dataset(&source(path)).unwrap_err();
        assert!(matches!(err, LoadError::Csv(_)), "{err}");
    }

    #[test]
    fn bad_amount_is_coercion_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "tx.csv",
            &format!("{HEADER}\n1,A,1.0,2024-01-01,c1\n2,B,lots,2024-01-02,c1\n"),
        );
        match load_dataset(&source(path)).unwrap_err() {
            LoadError::Coercion { row, column, value } => {
                assert_eq!(row, 2);
                assert_eq!(column, "transaction_amount");
                assert_eq!(value, "lots");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn categories_join_on_household_and_id() {
        let dir = tempfile::tempdir().unwrap();
        let tx = write_file(
            dir.path(),
            "tx.csv",
            &format!("{HEADER}\n1,GROCER,-10,2024-01-01,7\n2,GROCER,-10,2024-01-01,7\n2,RENT,-900,2024-01-01,\n"),
        );
        let cats = write_file(
            dir.path(),
            "cats.csv",
            "household_id,category_id,system_category_name\n1,7,Groceries\n2,7,Dining\n2,7,Ignored duplicate\n",
        );

        let ds = load_dataset(&DatasetSource {
            transactions: tx,
            categories: Some(cats),
        })
        .unwrap();
        assert_eq!(ds.len(), 3);
        assert_eq!(ds.record(0).category_name.as_deref(), Some("Groceries"));
        assert_eq!(ds.record(1).category_name.as_deref(), Some("Dining"));
        assert_eq!(ds.record(2).category_name, None);
        assert!(ds.columns().iter().any(|c| c == "system_category_name"));
    }

    #[test]
    fn bundled_sample_joins_categories_per_household() {
        let data = Path::new(env!("CARGO_MANIFEST_DIR")).join("data");
        let ds = load_dataset(&DatasetSource {
            transactions: data.join("enrichment_evidence.csv"),
            categories: Some(data.join("categories.csv")),
        })
        .unwrap();

        let all: Vec<usize> = (0..ds.len()).collect();
        let unique = ds.unique_of(&all);
        let categorised = unique
            .iter()
            .filter(|&&i| ds.record(i).is_categorised())
            .count();
        assert_eq!(ds.len(), 379);
        assert_eq!(unique.len(), 363);
        assert_eq!(categorised, 285);
        assert_eq!(ds.households().len(), 6);
        // every assigned id resolves within its own household
        assert!(ds
            .records()
            .iter()
            .all(|r| r.categorized_as.is_some() == r.category_name.is_some()));
        assert!(ds.columns().iter().any(|c| c == "system_category_name"));
    }

    #[test]
    fn missing_category_file_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let tx = write_file(dir.path(), "tx.csv", &format!("{HEADER}\n"));
        let err = load_dataset(&DatasetSource {
            transactions: tx,
            categories: Some(dir.path().join("cats.csv")),
        })
        .unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }

    #[test]
    fn json_records_load_with_typed_ids() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "tx.json",
            r#"[
                {"household_id": 42, "transaction_original_description": "UBER", "transaction_amount": -12.5, "transaction_date": "2024-02-03T10:00:00Z", "merchant": "Uber"},
                {"household_id": 42, "transaction_original_description": "LYFT", "transaction_amount": -8, "transaction_date": "2024-02-04"}
            ]"#,
        );

        let ds = load_dataset(&source(path)).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.record(0).household_id, "42");
        assert_eq!(ds.record(1).amount, -8.0);
        assert_eq!(ds.record(1).extra.get("merchant"), Some(&CellValue::Null));
    }

    #[test]
    fn json_must_be_an_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "tx.json", r#"{"rows": []}"#);
        let err = load_dataset(&source(path)).unwrap_err();
        assert!(matches!(err, LoadError::Malformed(_)));
    }

    #[test]
    fn parquet_with_timestamps_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tx.parquet");

        let schema = Arc::new(Schema::new(vec![
            Field::new("household_id", DataType::Utf8, false),
            Field::new("transaction_original_description", DataType::Utf8, false),
            Field::new("transaction_amount", DataType::Float64, false),
            Field::new(
                "transaction_date",
                DataType::Timestamp(TimeUnit::Millisecond, None),
                false,
            ),
        ]));
        // 2024-01-01T00:00:00Z and 2024-01-02T12:00:00Z
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(StringArray::from(vec!["h1", "h2"])),
                Arc::new(StringArray::from(vec!["A", "B"])),
                Arc::new(Float64Array::from(vec![1.5, -2.0])),
                Arc::new(TimestampMillisecondArray::from(vec![1_704_067_200_000, 1_704_196_800_000])),
            ],
        )
        .unwrap();
        let mut writer = ArrowWriter::try_new(File::create(&path).unwrap(), schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let ds = load_dataset(&source(path)).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.record(1).date.to_string(), "2024-01-02");
        assert_eq!(ds.record(1).amount, -2.0);
    }
}
