use std::path::PathBuf;

use clap::Parser;

use crate::data::loader::DatasetSource;

const DATASET_ENV: &str = "TXN_REVIEW_DATASET";
const CATEGORIES_ENV: &str = "TXN_REVIEW_CATEGORIES";
const DEFAULT_DATASET: &str = "data/enrichment_evidence.csv";
const DEFAULT_CATEGORIES: &str = "data/categories.csv";

/// Transaction Dataset Review - browse and sanity-check enrichment output
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "txn-review", version)]
#[command(about = "Web dashboard for reviewing a transaction-enrichment dataset", long_about = None)]
pub struct Config {
    /// Interface to bind
    #[arg(long, env = "TXN_REVIEW_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "TXN_REVIEW_PORT", default_value_t = 8501)]
    pub port: u16,
}

/// Data files come from the environment only; the command line is just the
/// listening address.
pub fn dataset_source() -> DatasetSource {
    source_from(
        std::env::var(DATASET_ENV).ok(),
        std::env::var(CATEGORIES_ENV).ok(),
    )
}

/// An empty categories value disables the join.
fn source_from(dataset: Option<String>, categories: Option<String>) -> DatasetSource {
    let transactions = dataset
        .filter(|d| !d.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_DATASET.to_string());
    let categories = match categories {
        Some(c) if c.trim().is_empty() => None,
        Some(c) => Some(PathBuf::from(c.trim())),
        None => Some(PathBuf::from(DEFAULT_CATEGORIES)),
    };
    DatasetSource {
        transactions: PathBuf::from(transactions.trim()),
        categories,
    }
}
