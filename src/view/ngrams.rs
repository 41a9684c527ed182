use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::state::NgramSize;

/// Tokens of two or more word characters.
static TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\w\w+\b").expect("token pattern is valid"));

#[derive(Debug, Clone, PartialEq)]
pub struct NgramCount {
    pub gram: String,
    pub count: usize,
}

/// Most frequent n-grams in uncategorised descriptions.
#[derive(Debug, Clone, PartialEq)]
pub struct NgramTable {
    pub size: NgramSize,
    /// Descriptions that were scanned.
    pub documents: usize,
    pub top: Vec<NgramCount>,
}

pub fn tokenize(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    TOKEN
        .find_iter(&lower)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Count n-grams of `size` tokens across `documents` and keep the `limit`
/// most frequent, ties in alphabetical order.
pub fn top_ngrams<'a>(
    documents: impl IntoIterator<Item = &'a str>,
    size: NgramSize,
    limit: usize,
) -> NgramTable {
    let n = size.get();
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut scanned = 0usize;
    for doc in documents {
        scanned += 1;
        let tokens = tokenize(doc);
        for window in tokens.windows(n) {
            *counts.entry(window.join(" ")).or_default() += 1;
        }
    }

    let mut top: Vec<NgramCount> = counts
        .into_iter()
        .map(|(gram, count)| NgramCount { gram, count })
        .collect();
    // stable sort keeps the alphabetical order of the BTreeMap among ties
    top.sort_by(|a, b| b.count.cmp(&a.count));
    top.truncate(limit);

    NgramTable {
        size,
        documents: scanned,
        top,
    }
}
