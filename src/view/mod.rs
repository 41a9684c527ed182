/// Exploration view: everything the page shows, computed from the shared
/// dataset and one session's selection. Pure and deterministic: the same
/// inputs always give an equal [`Rendering`].
///
/// ```text
///   Dataset + SessionState
///        │  filter (AND of all constraints)
///        ▼
///   selected rows ──► unique rows (first occurrence per household,
///        │                         description, amount, date)
///        ▼
///   summary · households · ngrams · explorer · charts
/// ```

pub mod charts;
pub mod explorer;
pub mod households;
pub mod ngrams;
pub mod summary;

use std::collections::HashSet;

use chrono::NaiveDate;

use crate::data::filter::filtered_indices;
use crate::data::model::Dataset;
use crate::error::EmptySelectionWarning;
use crate::state::SessionState;

use charts::ChartSpec;
use explorer::ExplorerTable;
use households::{Coverage, HistorySpan};
use ngrams::NgramTable;
use summary::{ColumnSummary, Overview};

/// N-grams listed in the pattern table and chart.
const TOP_NGRAMS: usize = 20;

/// Values offered by the sidebar controls. Always taken from the whole
/// dataset so narrowing one filter never hides the others' options.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterOptions {
    pub households: Vec<String>,
    pub categories: Vec<String>,
    pub has_uncategorised: bool,
    pub date_bounds: Option<(NaiveDate, NaiveDate)>,
}

impl FilterOptions {
    pub fn from_dataset(dataset: &Dataset) -> Self {
        let mut households = dataset.households();
        households.sort();
        FilterOptions {
            households,
            categories: dataset.category_names().into_iter().collect(),
            has_uncategorised: dataset.has_uncategorised(),
            date_bounds: dataset.date_bounds(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub overview: Overview,
    pub summary: Vec<ColumnSummary>,
    pub history: Vec<HistorySpan>,
    pub coverage: Coverage,
    pub ngrams: NgramTable,
    pub explorer: ExplorerTable,
    pub charts: Vec<ChartSpec>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewBody {
    /// The selection matched no rows.
    Empty(EmptySelectionWarning),
    Report(Box<Report>),
}

/// The complete page for one interaction.
#[derive(Debug, Clone, PartialEq)]
pub struct Rendering {
    pub source: String,
    pub options: FilterOptions,
    pub session: SessionState,
    /// Households with rows in the selection, in file order.
    pub explore_households: Vec<String>,
    /// Household the explorer shows after defaulting.
    pub explore_household: Option<String>,
    pub body: ViewBody,
}

/// Recompute the whole view for `session`.
pub fn explore(dataset: &Dataset, session: &SessionState) -> Rendering {
    let options = FilterOptions::from_dataset(dataset);
    let rows = filtered_indices(dataset, &session.filters);
    log::debug!("selection matched {} of {} rows", rows.len(), dataset.len());

    let mut seen = HashSet::new();
    let explore_households: Vec<String> = rows
        .iter()
        .map(|&i| dataset.record(i).household_id.as_str())
        .filter(|h| seen.insert(*h))
        .map(str::to_string)
        .collect();
    let explore_household = session
        .explore_household
        .clone()
        .filter(|h| explore_households.contains(h))
        .or_else(|| explore_households.first().cloned());

    let body = match report(dataset, session, &rows, explore_household.as_deref()) {
        Some(report) => ViewBody::Report(Box::new(report)),
        None => ViewBody::Empty(EmptySelectionWarning {
            dataset_rows: dataset.len(),
        }),
    };

    Rendering {
        source: dataset.source().display().to_string(),
        options,
        session: session.clone(),
        explore_households,
        explore_household,
        body,
    }
}

/// `None` when no rows are selected.
fn report(
    dataset: &Dataset,
    session: &SessionState,
    rows: &[usize],
    explore_household: Option<&str>,
) -> Option<Report> {
    let unique = dataset.unique_of(rows);
    let overview = summary::overview(dataset, rows, &unique)?;

    let history = households::history_spans(dataset, &unique);
    let coverage = households::coverage(dataset, &unique);
    let ngrams = ngrams::top_ngrams(
        unique
            .iter()
            .map(|&i| dataset.record(i))
            .filter(|r| !r.is_categorised())
            .map(|r| r.description.as_str()),
        session.ngram,
        TOP_NGRAMS,
    );
    let explorer =
        explorer::explore_household(dataset, &unique, explore_household, session.shuffle_seed);

    let mut charts = vec![
        charts::transactions_per_household(&history),
        charts::coverage_per_household(&coverage),
    ];
    if !ngrams.top.is_empty() {
        charts.push(charts::top_ngrams(&ngrams));
    }
    charts.extend(charts::amount_histogram(dataset, rows));
    charts.push(charts::daily_volume(dataset, rows));
    charts.push(charts::category_breakdown(dataset, &unique));

    Some(Report {
        overview,
        summary: summary::summarize_columns(dataset, rows),
        history,
        coverage,
        ngrams,
        explorer,
        charts,
    })
}
