use std::collections::BTreeSet;

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::data::filter::FilterSelection;
use crate::error::SelectionError;

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

/// N-gram length for the uncategorised-description patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct NgramSize(u8);

impl NgramSize {
    pub const CHOICES: [NgramSize; 3] = [NgramSize(1), NgramSize(2), NgramSize(3)];

    pub fn new(n: u8) -> Option<Self> {
        (1..=3).contains(&n).then_some(NgramSize(n))
    }

    pub fn get(self) -> usize {
        self.0 as usize
    }
}

impl Default for NgramSize {
    fn default() -> Self {
        NgramSize(1)
    }
}

/// Everything one user has chosen, independent of rendering. Decoded from
/// the page query string on every interaction and never stored server-side.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    /// Per-field row constraints.
    pub filters: FilterSelection,

    pub ngram: NgramSize,

    /// Household shown in the categorisation explorer (`None` = first one).
    pub explore_household: Option<String>,

    /// Seed of the explorer shuffle; `None` keeps file order.
    pub shuffle_seed: Option<u64>,
}

impl SessionState {
    /// Decode form fields. Repeated keys accumulate (`household`,
    /// `category`); empty values mean "unset" except for `category`, where
    /// the empty value selects uncategorised rows. Unknown keys are ignored.
    pub fn from_query(pairs: &[(String, String)]) -> Result<Self, SelectionError> {
        let mut state = SessionState::default();
        let mut households = BTreeSet::new();
        let mut categories = BTreeSet::new();

        for (key, raw) in pairs {
            let value = raw.trim();
            match key.as_str() {
                "household" if !value.is_empty() => {
                    households.insert(value.to_string());
                }
                "category" => {
                    categories.insert((!value.is_empty()).then(|| value.to_string()));
                }
                "from" => state.filters.date_from = parse_date(key, value)?,
                "to" => state.filters.date_to = parse_date(key, value)?,
                "min_amount" => state.filters.min_amount = parse_amount(key, value)?,
                "max_amount" => state.filters.max_amount = parse_amount(key, value)?,
                "ngram" if !value.is_empty() => {
                    state.ngram = value
                        .parse::<u8>()
                        .ok()
                        .and_then(NgramSize::new)
                        .ok_or_else(|| SelectionError::InvalidNgram(value.to_string()))?;
                }
                "explore" if !value.is_empty() => {
                    state.explore_household = Some(value.to_string());
                }
                "seed" if !value.is_empty() => {
                    state.shuffle_seed = Some(
                        value
                            .parse::<u64>()
                            .map_err(|_| SelectionError::InvalidSeed(value.to_string()))?,
                    );
                }
                _ => {}
            }
        }

        state.filters.households = households;
        state.filters.categories = categories;
        Ok(state)
    }

    /// Seed carried by the "Shuffle" button: a fresh permutation per click,
    /// derived from the current one so the page stays reproducible.
    pub fn next_shuffle_seed(&self) -> u64 {
        match self.shuffle_seed {
            Some(seed) => StdRng::seed_from_u64(seed).gen(),
            None => 1,
        }
    }
}

fn parse_date(field: &str, value: &str) -> Result<Option<NaiveDate>, SelectionError> {
    if value.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| SelectionError::InvalidDate {
            field: field.to_string(),
            value: value.to_string(),
        })
}

fn parse_amount(field: &str, value: &str) -> Result<Option<f64>, SelectionError> {
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(Some)
        .ok_or_else(|| SelectionError::InvalidAmount {
            field: field.to_string(),
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn empty_query_is_default_session() {
        let state = SessionState::from_query(&[]).unwrap();
        assert_eq!(state, SessionState::default());
        assert!(state.filters.is_unconstrained());
    }

    #[test]
    fn repeated_keys_accumulate() {
        let state = SessionState::from_query(&pairs(&[
            ("household", "12"),
            ("household", "7"),
            ("category", "Groceries"),
            ("category", ""),
            ("from", "2024-01-01"),
            ("to", ""),
            ("ngram", "2"),
            ("seed", "99"),
        ]))
        .unwrap();

        assert_eq!(state.filters.households.len(), 2);
        assert!(state.filters.categories.contains(&None));
        assert!(state.filters.categories.contains(&Some("Groceries".to_string())));
        assert_eq!(state.filters.date_from, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(state.filters.date_to, None);
        assert_eq!(state.ngram.get(), 2);
        assert_eq!(state.shuffle_seed, Some(99));
    }

    #[test]
    fn bad_values_are_rejected() {
        assert!(matches!(
            SessionState::from_query(&pairs(&[("from", "01/02/2024")])),
            Err(SelectionError::InvalidDate { .. })
        ));
        assert!(matches!(
            SessionState::from_query(&pairs(&[("ngram", "4")])),
            Err(SelectionError::InvalidNgram(_))
        ));
        assert!(matches!(
            SessionState::from_query(&pairs(&[("min_amount", "inf")])),
            Err(SelectionError::InvalidAmount { .. })
        ));
    }

    #[test]
    fn shuffle_seed_sequence_is_reproducible() {
        let start = SessionState::default();
        assert_eq!(start.next_shuffle_seed(), 1);

        let seeded = SessionState {
            shuffle_seed: Some(1),
            ..Default::default()
        };
        assert_eq!(seeded.next_shuffle_seed(), seeded.next_shuffle_seed());
        assert_ne!(seeded.next_shuffle_seed(), 1);
    }
}
