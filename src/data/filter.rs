use std::collections::BTreeSet;

use chrono::NaiveDate;

use super::model::{Dataset, TransactionRecord};

// ---------------------------------------------------------------------------
// Filter predicate: row constraints chosen in the sidebar
// ---------------------------------------------------------------------------

/// Row constraints. Every active constraint must hold (logical AND).
/// An empty set or `None` bound means "no constraint" for that field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSelection {
    pub households: BTreeSet<String>,
    /// Selected category names; `None` selects uncategorised rows.
    pub categories: BTreeSet<Option<String>>,
    /// Inclusive.
    pub date_from: Option<NaiveDate>,
    /// Inclusive.
    pub date_to: Option<NaiveDate>,
    pub min_amount: Option<f64>,
    pub max_amount: Option<f64>,
}

impl FilterSelection {
    /// Whether this selection narrows nothing.
    pub fn is_unconstrained(&self) -> bool {
        *self == FilterSelection::default()
    }

    /// Whether a single record passes every active constraint.
    pub fn matches(&self, r: &TransactionRecord) -> bool {
        if !self.households.is_empty() && !self.households.contains(&r.household_id) {
            return false;
        }
        if !self.categories.is_empty() && !self.categories.contains(&r.category_name) {
            return false;
        }
        if self.date_from.is_some_and(|from| r.date < from) {
            return false;
        }
        if self.date_to.is_some_and(|to| r.date > to) {
            return false;
        }
        if self.min_amount.is_some_and(|min| r.amount < min) {
            return false;
        }
        if self.max_amount.is_some_and(|max| r.amount > max) {
            return false;
        }
        true
    }
}

/// Return indices of records that pass all active filters, in file order.
pub fn filtered_indices(dataset: &Dataset, filters: &FilterSelection) -> Vec<usize> {
    if filters.is_unconstrained() {
        return (0..dataset.len()).collect();
    }
    dataset
        .records()
        .iter()
        .enumerate()
        .filter(|(_, r)| filters.matches(r))
        .map(|(i, _)| i)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::tests::{categorised, dataset, record};
    use proptest::prelude::*;

    fn sample() -> Dataset {
        let mut rows = Vec::new();
        for i in 0..100 {
            let cat = if i % 3 == 0 { "A" } else { "B" };
            let day = format!("2024-01-{:02}", i % 28 + 1);
            rows.push(categorised(record(&format!("h{}", i % 4), "SHOP", i as f64, &day), cat));
        }
        rows.push(record("h0", "UNKNOWN", 1.0, "2024-02-01"));
        dataset(rows)
    }

    #[test]
    fn no_filters_selects_everything() {
        let ds = sample();
        assert_eq!(filtered_indices(&ds, &FilterSelection::default()).len(), ds.len());
    }

    #[test]
    fn category_filter_counts_match_source() {
        let ds = sample();
        let expected = ds
            .records()
            .iter()
            .filter(|r| r.category_name.as_deref() == Some("A"))
            .count();
        let filters = FilterSelection {
            categories: [Some("A".to_string())].into_iter().collect(),
            ..Default::default()
        };
        assert_eq!(filtered_indices(&ds, &filters).len(), expected);
        assert_eq!(expected, 34);
    }

    #[test]
    fn uncategorised_is_selectable() {
        let ds = sample();
        let filters = FilterSelection {
            categories: [None].into_iter().collect(),
            ..Default::default()
        };
        assert_eq!(filtered_indices(&ds, &filters), vec![100]);
    }

    #[test]
    fn filters_are_conjunctive() {
        let ds = sample();
        let filters = FilterSelection {
            households: ["h1".to_string()].into_iter().collect(),
            categories: [Some("A".to_string())].into_iter().collect(),
            date_from: NaiveDate::from_ymd_opt(2024, 1, 10),
            date_to: NaiveDate::from_ymd_opt(2024, 1, 20),
            ..Default::default()
        };
        let picked = filtered_indices(&ds, &filters);
        assert!(!picked.is_empty());
        for i in picked {
            let r = ds.record(i);
            assert_eq!(r.household_id, "h1");
            assert_eq!(r.category_name.as_deref(), Some("A"));
            assert!(r.date >= filters.date_from.unwrap() && r.date <= filters.date_to.unwrap());
        }
    }

    #[test]
    fn inverted_date_range_selects_nothing() {
        let ds = sample();
        let filters = FilterSelection {
            date_from: NaiveDate::from_ymd_opt(2024, 3, 1),
            date_to: NaiveDate::from_ymd_opt(2024, 1, 1),
            ..Default::default()
        };
        assert!(filtered_indices(&ds, &filters).is_empty());
    }

    proptest! {
        #[test]
        fn amount_bounds_are_inclusive(min in 0.0f64..100.0, span in 0.0f64..50.0) {
            let ds = sample();
            let filters = FilterSelection {
                min_amount: Some(min),
                max_amount: Some(min + span),
                ..Default::default()
            };
            let picked = filtered_indices(&ds, &filters);
            let expected = ds
                .records()
                .iter()
                .filter(|r| r.amount >= min && r.amount <= min + span)
                .count();
            prop_assert_eq!(picked.len(), expected);
        }
    }
}
