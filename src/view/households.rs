use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::data::model::Dataset;

/// Transaction history span of one household.
#[derive(Debug, Clone, PartialEq)]
pub struct HistorySpan {
    pub household_id: String,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    pub duration_days: i64,
    pub unique_transactions: usize,
    /// Rounded to one decimal, halves to even; `None` when the span is a
    /// single day.
    pub avg_per_day: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HouseholdCoverage {
    pub household_id: String,
    pub categorised: usize,
    pub total: usize,
    pub pct: f64,
}

/// Share of unique transactions that received a category name.
#[derive(Debug, Clone, PartialEq)]
pub struct Coverage {
    pub overall_pct: f64,
    /// Least covered first.
    pub per_household: Vec<HouseholdCoverage>,
}

/// One span per household over the unique rows, ordered by household id.
pub fn history_spans(dataset: &Dataset, unique: &[usize]) -> Vec<HistorySpan> {
    let mut groups: BTreeMap<&str, (NaiveDate, NaiveDate, usize)> = BTreeMap::new();
    for &i in unique {
        let r = dataset.record(i);
        groups
            .entry(r.household_id.as_str())
            .and_modify(|(first, last, n)| {
                *first = (*first).min(r.date);
                *last = (*last).max(r.date);
                *n += 1;
            })
            .or_insert((r.date, r.date, 1));
    }

    groups
        .into_iter()
        .map(|(household, (first, last, n))| {
            let duration_days = (last - first).num_days();
            let avg_per_day = (duration_days > 0)
                .then(|| (n as f64 / duration_days as f64 * 10.0).round_ties_even() / 10.0);
            HistorySpan {
                household_id: household.to_string(),
                first_date: first,
                last_date: last,
                duration_days,
                unique_transactions: n,
                avg_per_day,
            }
        })
        .collect()
}

pub fn coverage(dataset: &Dataset, unique: &[usize]) -> Coverage {
    let mut groups: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    for &i in unique {
        let r = dataset.record(i);
        let entry = groups.entry(r.household_id.as_str()).or_default();
        entry.1 += 1;
        if r.is_categorised() {
            entry.0 += 1;
        }
    }

    let categorised: usize = groups.values().map(|(c, _)| c).sum();
    let overall_pct = pct(categorised, unique.len());

    let mut per_household: Vec<HouseholdCoverage> = groups
        .into_iter()
        .map(|(household, (categorised, total))| HouseholdCoverage {
            household_id: household.to_string(),
            categorised,
            total,
            pct: pct(categorised, total),
        })
        .collect();
    per_household.sort_by(|a, b| {
        a.pct
            .total_cmp(&b.pct)
            .then_with(|| a.household_id.cmp(&b.household_id))
    });

    Coverage {
        overall_pct,
        per_household,
    }
}

fn pct(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}
