use std::sync::{Arc, OnceLock};
use std::time::Instant;

use super::loader::{load_dataset, DatasetSource};
use super::model::Dataset;
use crate::error::LoadError;

pub type LoadResult = Result<Arc<Dataset>, Arc<LoadError>>;

/// Loads the dataset once and hands out the same shared copy afterwards.
/// A failed load is memoized too: every session sees the same error.
#[derive(Debug)]
pub struct DatasetCache {
    source: DatasetSource,
    cell: OnceLock<LoadResult>,
}

impl DatasetCache {
    pub fn new(source: DatasetSource) -> Self {
        Self {
            source,
            cell: OnceLock::new(),
        }
    }

    /// A cache that already holds `dataset`.
    #[cfg(test)]
    pub fn preloaded(source: DatasetSource, dataset: Dataset) -> Self {
        let cell = OnceLock::new();
        let _ = cell.set(Ok(Arc::new(dataset)));
        Self { source, cell }
    }

    pub fn source(&self) -> &DatasetSource {
        &self.source
    }

    pub fn get(&self) -> LoadResult {
        self.cell
            .get_or_init(|| {
                let started = Instant::now();
                match load_dataset(&self.source) {
                    Ok(dataset) => {
                        if dataset.is_empty() {
                            log::warn!(
                                "{} has a header but no transactions",
                                self.source.transactions.display()
                            );
                        }
                        log::info!(
                            "Loaded {} transactions with columns {:?} in {:?}",
                            dataset.len(),
                            dataset.columns(),
                            started.elapsed()
                        );
                        Ok(Arc::new(dataset))
                    }
                    Err(e) => {
                        log::error!(
                            "Failed to load {}: {e}",
                            self.source.transactions.display()
                        );
                        Err(Arc::new(e))
                    }
                }
            })
            .clone()
    }
}
