/// Data layer: core types, loading, and filtering.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet   (+ category lookup)
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → RawTable
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  coerce   │  type required fields, join categories → Dataset
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  cache    │  load once, share Arc<Dataset> for the process lifetime
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  apply FilterSelection → filtered indices
///   └──────────┘
/// ```

pub mod cache;
pub mod coerce;
pub mod filter;
pub mod loader;
pub mod model;
