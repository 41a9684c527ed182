//! Writes a synthetic enrichment dataset plus its category lookup.
//!
//! Usage: `generate_sample [OUT_DIR]` (default `sample-data`). The files
//! under `data/` are a committed snapshot and are not overwritten by default.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Per-household category ids are deliberately different so the lookup
/// has to be joined on `(household_id, category_id)`.
const CATEGORIES: &[(&str, &[&str])] = &[
    ("Groceries", &["SAFEWAY #1204", "TRADER JOE S #552", "WHOLEFDS MKT 10233"]),
    ("Restaurants & Bars", &["STARBUCKS STORE 0431", "CHIPOTLE 1187", "SQ *BLUE BOTTLE"]),
    ("Entertainment", &["NETFLIX.COM", "SPOTIFY USA", "AMC THEATRES 0099"]),
    ("Gas", &["SHELL OIL 5744", "CHEVRON 0209771"]),
    ("Shopping", &["AMAZON MKTPLACE PMTS", "TARGET T-1432", "BEST BUY 00012"]),
];

/// Descriptions the enrichment leaves without a category.
const UNCATEGORISED: &[&str] = &[
    "ZELLE PAYMENT TO J SMITH",
    "ZELLE PAYMENT FROM A LEE",
    "VENMO CASHOUT",
    "ONLINE TRANSFER TO SAV 8831",
    "CHECK DEPOSIT MOBILE",
    "ATM WITHDRAWAL 4521 MAIN ST",
];

fn main() -> Result<()> {
    let out_dir = PathBuf::from(std::env::args().nth(1).unwrap_or_else(|| "sample-data".into()));
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("cannot create {}", out_dir.display()))?;

    let mut rng = StdRng::seed_from_u64(42);
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).context("invalid start date")?;
    let households = [1001u32, 1002, 1003, 1004, 1005, 1006];

    // ---- Category lookup ----
    let categories_path = out_dir.join("categories.csv");
    let mut lookup = csv::Writer::from_path(&categories_path)?;
    lookup.write_record(["household_id", "category_id", "system_category_name"])?;
    for &h in &households {
        for (i, (name, _)) in CATEGORIES.iter().enumerate() {
            lookup.write_record([h.to_string(), category_id(h, i), name.to_string()])?;
        }
    }
    lookup.flush()?;

    // ---- Transactions ----
    let evidence_path = out_dir.join("enrichment_evidence.csv");
    let mut tx = csv::Writer::from_path(&evidence_path)?;
    tx.write_record([
        "household_id",
        "transaction_original_description",
        "transaction_amount",
        "transaction_date",
        "categorized_as",
        "account_type",
    ])?;

    let mut rows = 0usize;
    for (hi, &h) in households.iter().enumerate() {
        // uneven history lengths and volumes per household
        let days = 30 + 25 * hi as i64;
        let count = rng.gen_range(40..100);
        let mut previous: Option<Vec<String>> = None;

        for _ in 0..count {
            let date = start + Duration::days(rng.gen_range(0..=days));
            let account = if rng.gen_bool(0.7) { "checking" } else { "credit" };

            let (description, amount, category) = if rng.gen_bool(0.2) {
                let d = *UNCATEGORISED.choose(&mut rng).context("no descriptions")?;
                let sign = if d.contains("FROM") || d.contains("DEPOSIT") { 1.0 } else { -1.0 };
                (d, sign * rng.gen_range(20.0..500.0), String::new())
            } else {
                let ci = rng.gen_range(0..CATEGORIES.len());
                let d = *CATEGORIES[ci].1.choose(&mut rng).context("no merchants")?;
                (d, -rng.gen_range(3.0..153.0), category_id(h, ci))
            };

            let record = vec![
                h.to_string(),
                description.to_string(),
                format!("{amount:.2}"),
                date.format("%Y-%m-%d").to_string(),
                category,
                account.to_string(),
            ];
            tx.write_record(&record)?;
            rows += 1;

            // re-exported rows, as seen in real enrichment dumps
            if rng.gen_bool(0.05) {
                if let Some(prev) = &previous {
                    tx.write_record(prev)?;
                    rows += 1;
                }
            }
            previous = Some(record);
        }
    }
    tx.flush()?;

    println!(
        "Wrote {rows} transactions to {} and {} categories per household to {}",
        evidence_path.display(),
        CATEGORIES.len(),
        categories_path.display()
    );
    Ok(())
}

fn category_id(household: u32, index: usize) -> String {
    format!("{}", household as usize * 10 + index)
}
