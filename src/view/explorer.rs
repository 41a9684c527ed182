use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::data::model::Dataset;

/// Rows listed in the explorer table at most.
pub const MAX_ROWS: usize = 200;

#[derive(Debug, Clone, PartialEq)]
pub struct ExplorerRow {
    pub description: String,
    pub category: String,
}

/// Categorised transactions of one household, for eyeballing whether the
/// assigned categories make sense.
#[derive(Debug, Clone, PartialEq)]
pub struct ExplorerTable {
    pub household_id: Option<String>,
    /// Matching rows before truncation to [`MAX_ROWS`].
    pub total: usize,
    pub rows: Vec<ExplorerRow>,
    pub shuffled: bool,
}

/// `unique` rows of `household` that have a category, optionally shuffled
/// with a seeded RNG so the same seed always yields the same order.
pub fn explore_household(
    dataset: &Dataset,
    unique: &[usize],
    household: Option<&str>,
    seed: Option<u64>,
) -> ExplorerTable {
    let Some(household) = household else {
        return ExplorerTable {
            household_id: None,
            total: 0,
            rows: Vec::new(),
            shuffled: false,
        };
    };

    let mut rows: Vec<ExplorerRow> = unique
        .iter()
        .map(|&i| dataset.record(i))
        .filter(|r| r.household_id == household)
        .filter_map(|r| {
            r.category_name.as_ref().map(|name| ExplorerRow {
                description: r.description.clone(),
                category: name.clone(),
            })
        })
        .collect();

    if let Some(seed) = seed {
        rows.shuffle(&mut StdRng::seed_from_u64(seed));
    }
    let total = rows.len();
    rows.truncate(MAX_ROWS);

    ExplorerTable {
        household_id: Some(household.to_string()),
        total,
        rows,
        shuffled: seed.is_some(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::tests::{categorised, dataset, record};

    fn sample() -> Dataset {
        let mut rows: Vec<_> = (0..30)
            .map(|i| categorised(record("h1", &format!("TXN {i}"), 1.0, "2024-01-01"), "Shopping"))
            .collect();
        rows.push(record("h1", "MYSTERY", 1.0, "2024-01-01"));
        rows.push(categorised(record("h2", "OTHER", 1.0, "2024-01-01"), "Bills"));
        dataset(rows)
    }

    #[test]
    fn lists_only_categorised_rows_of_the_household() {
        let ds = sample();
        let all: Vec<usize> = (0..ds.len()).collect();
        let table = explore_household(&ds, &all, Some("h1"), None);
        assert_eq!(table.total, 30);
        assert_eq!(table.rows[0].description, "TXN 0");
        assert!(table.rows.iter().all(|r| r.category == "Shopping"));
        assert!(!table.shuffled);
    }

    #[test]
    fn same_seed_same_order() {
        let ds = sample();
        let all: Vec<usize> = (0..ds.len()).collect();
        let a = explore_household(&ds, &all, Some("h1"), Some(7));
        let b = explore_household(&ds, &all, Some("h1"), Some(7));
        let plain = explore_household(&ds, &all, Some("h1"), None);
        assert_eq!(a, b);
        assert!(a.shuffled);
        assert_ne!(a.rows, plain.rows);

        let mut sorted: Vec<_> = a.rows.iter().map(|r| r.description.clone()).collect();
        let mut expected: Vec<_> = plain.rows.iter().map(|r| r.description.clone()).collect();
        sorted.sort();
        expected.sort();
        assert_eq!(sorted, expected);
    }

    #[test]
    fn no_household_gives_empty_table() {
        let ds = sample();
        let table = explore_household(&ds, &[0, 1], None, Some(1));
        assert!(table.rows.is_empty());
        assert_eq!(table.household_id, None);
    }
}
