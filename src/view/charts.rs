use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{json, Value};

use super::households::{Coverage, HistorySpan};
use super::ngrams::NgramTable;
use crate::color::{generate_palette, ColorMap};
use crate::data::model::Dataset;

const VEGA_LITE_SCHEMA: &str = "https://vega.github.io/schema/vega-lite/v5.json";
const HISTOGRAM_BINS: usize = 20;
pub const UNCATEGORISED: &str = "(uncategorised)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Bar,
    Histogram,
    TimeSeries,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisType {
    Nominal,
    Quantitative,
    Temporal,
}

impl AxisType {
    fn vega(self) -> &'static str {
        match self {
            AxisType::Nominal => "nominal",
            AxisType::Quantitative => "quantitative",
            AxisType::Temporal => "temporal",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Axis {
    pub title: String,
    pub kind: AxisType,
}

impl Axis {
    fn new(title: impl Into<String>, kind: AxisType) -> Self {
        Axis {
            title: title.into(),
            kind,
        }
    }
}

/// One data row bound to the chart's x / y channels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub x: XValue,
    /// Upper bin edge, histograms only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x2: Option<f64>,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum XValue {
    Label(String),
    Number(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChartColor {
    Single(String),
    ByLabel(ColorMap),
}

/// A renderer-independent chart: kind, axis bindings and its data subset.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub id: &'static str,
    pub title: String,
    pub kind: ChartKind,
    pub x: Axis,
    pub y: Axis,
    pub y_domain: Option<[f64; 2]>,
    pub data: Vec<ChartPoint>,
    pub color: ChartColor,
}

impl ChartSpec {
    /// Vega-Lite v5 JSON for the browser-side renderer.
    pub fn to_vega_lite(&self) -> Value {
        let mut x = json!({
            "field": "x",
            "type": self.x.kind.vega(),
            "title": self.x.title,
        });
        if self.x.kind == AxisType::Nominal {
            // keep data order; bars are pre-sorted
            x["sort"] = Value::Null;
            x["axis"] = json!({ "labelAngle": -45 });
        }
        if self.kind == ChartKind::Histogram {
            x["bin"] = json!({ "binned": true });
        }

        let mut y = json!({
            "field": "y",
            "type": self.y.kind.vega(),
            "title": self.y.title,
        });
        if let Some([lo, hi]) = self.y_domain {
            y["scale"] = json!({ "domain": [lo, hi] });
        }

        let mut encoding = json!({ "x": x, "y": y, "tooltip": [
            { "field": "x", "type": self.x.kind.vega(), "title": self.x.title },
            { "field": "y", "type": self.y.kind.vega(), "title": self.y.title },
        ]});
        if self.kind == ChartKind::Histogram {
            encoding["x2"] = json!({ "field": "x2" });
        }

        let mut mark = match self.kind {
            ChartKind::Bar | ChartKind::Histogram => json!({ "type": "bar" }),
            ChartKind::TimeSeries => json!({ "type": "line", "point": true }),
        };
        match &self.color {
            ChartColor::Single(c) => mark["color"] = json!(c),
            ChartColor::ByLabel(map) => {
                let (domain, range) = map.scale();
                encoding["color"] = json!({
                    "field": "x",
                    "type": "nominal",
                    "scale": { "domain": domain, "range": range },
                    "legend": null,
                });
            }
        }

        json!({
            "$schema": VEGA_LITE_SCHEMA,
            "title": self.title,
            "width": "container",
            "height": 280,
            "data": { "values": self.data },
            "mark": mark,
            "encoding": encoding,
        })
    }
}

fn label_point(label: impl Into<String>, y: f64) -> ChartPoint {
    ChartPoint {
        x: XValue::Label(label.into()),
        x2: None,
        y,
    }
}

fn series_color(i: usize) -> ChartColor {
    let palette = generate_palette(6);
    ChartColor::Single(palette[i % palette.len()].clone())
}

// ---------------------------------------------------------------------------
// Chart builders
// ---------------------------------------------------------------------------

pub fn transactions_per_household(spans: &[HistorySpan]) -> ChartSpec {
    ChartSpec {
        id: "household-transactions",
        title: "Number of Unique Transactions per Household".to_string(),
        kind: ChartKind::Bar,
        x: Axis::new("Household", AxisType::Nominal),
        y: Axis::new("Unique transactions", AxisType::Quantitative),
        y_domain: None,
        data: spans
            .iter()
            .map(|s| label_point(&s.household_id, s.unique_transactions as f64))
            .collect(),
        color: series_color(0),
    }
}

pub fn coverage_per_household(coverage: &Coverage) -> ChartSpec {
    ChartSpec {
        id: "household-coverage",
        title: "Percentage of Categorised Transactions by Household".to_string(),
        kind: ChartKind::Bar,
        x: Axis::new("Household", AxisType::Nominal),
        y: Axis::new("Categorised (%)", AxisType::Quantitative),
        y_domain: Some([0.0, 100.0]),
        data: coverage
            .per_household
            .iter()
            .map(|h| label_point(&h.household_id, h.pct))
            .collect(),
        color: series_color(1),
    }
}

pub fn top_ngrams(table: &NgramTable) -> ChartSpec {
    let n = table.size.get();
    ChartSpec {
        id: "ngrams",
        title: format!("Most Common {n}-grams in Uncategorised Transactions"),
        kind: ChartKind::Bar,
        x: Axis::new(format!("{n}-gram"), AxisType::Nominal),
        y: Axis::new("Frequency", AxisType::Quantitative),
        y_domain: None,
        data: table
            .top
            .iter()
            .map(|g| label_point(&g.gram, g.count as f64))
            .collect(),
        color: series_color(2),
    }
}

/// Equal-width bins between the smallest and largest amount.
pub fn amount_histogram(dataset: &Dataset, rows: &[usize]) -> Option<ChartSpec> {
    let amounts: Vec<f64> = rows.iter().map(|&i| dataset.record(i).amount).collect();
    let min = amounts.iter().copied().reduce(f64::min)?;
    let max = amounts.iter().copied().reduce(f64::max)?;

    let bins = if max > min { HISTOGRAM_BINS } else { 1 };
    let width = if max > min { (max - min) / bins as f64 } else { 1.0 };
    let mut counts = vec![0usize; bins];
    for a in &amounts {
        let idx = (((a - min) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }

    let data = counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| {
            let start = min + i as f64 * width;
            ChartPoint {
                x: XValue::Number(start),
                x2: Some(start + width),
                y: count as f64,
            }
        })
        .collect();

    Some(ChartSpec {
        id: "amount-histogram",
        title: "Transaction Amount Distribution".to_string(),
        kind: ChartKind::Histogram,
        x: Axis::new("Amount", AxisType::Quantitative),
        y: Axis::new("Transactions", AxisType::Quantitative),
        y_domain: None,
        data,
        color: series_color(3),
    })
}

/// Transactions per calendar day, days without transactions omitted.
pub fn daily_volume(dataset: &Dataset, rows: &[usize]) -> ChartSpec {
    let mut per_day: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for &i in rows {
        *per_day.entry(dataset.record(i).date).or_default() += 1;
    }
    ChartSpec {
        id: "daily-volume",
        title: "Transactions per Day".to_string(),
        kind: ChartKind::TimeSeries,
        x: Axis::new("Date", AxisType::Temporal),
        y: Axis::new("Transactions", AxisType::Quantitative),
        y_domain: None,
        data: per_day
            .into_iter()
            .map(|(day, n)| label_point(day.format("%Y-%m-%d").to_string(), n as f64))
            .collect(),
        color: series_color(4),
    }
}

/// Unique transactions per category name, largest first.
pub fn category_breakdown(dataset: &Dataset, unique: &[usize]) -> ChartSpec {
    let mut per_category: BTreeMap<&str, usize> = BTreeMap::new();
    for &i in unique {
        let name = dataset
            .record(i)
            .category_name
            .as_deref()
            .unwrap_or(UNCATEGORISED);
        *per_category.entry(name).or_default() += 1;
    }
    let colors = ColorMap::new(per_category.keys().copied());

    let mut bars: Vec<(&str, usize)> = per_category.into_iter().collect();
    bars.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    ChartSpec {
        id: "category-breakdown",
        title: "Unique Transactions by Category".to_string(),
        kind: ChartKind::Bar,
        x: Axis::new("Category", AxisType::Nominal),
        y: Axis::new("Unique transactions", AxisType::Quantitative),
        y_domain: None,
        data: bars
            .into_iter()
            .map(|(name, n)| label_point(name, n as f64))
            .collect(),
        color: ChartColor::ByLabel(colors),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::tests::{categorised, dataset, record};

    #[test]
    fn histogram_counts_every_row_once() {
        let ds = dataset(
            (0..50)
                .map(|i| record("h", &format!("T{i}"), i as f64, "2024-01-01"))
                .collect(),
        );
        let rows: Vec<usize> = (0..ds.len()).collect();
        let chart = amount_histogram(&ds, &rows).unwrap();
        assert_eq!(chart.data.len(), HISTOGRAM_BINS);
        let total: f64 = chart.data.iter().map(|p| p.y).sum();
        assert_eq!(total, 50.0);
        // the maximum lands in the last bin
        assert!(chart.data.last().unwrap().y >= 1.0);
    }

    #[test]
    fn histogram_of_constant_amounts_is_one_bin() {
        let ds = dataset(vec![
            record("h", "A", 5.0, "2024-01-01"),
            record("h", "B", 5.0, "2024-01-01"),
        ]);
        let chart = amount_histogram(&ds, &[0, 1]).unwrap();
        assert_eq!(chart.data.len(), 1);
        assert_eq!(chart.data[0].y, 2.0);
        assert!(amount_histogram(&ds, &[]).is_none());
    }

    #[test]
    fn category_breakdown_labels_uncategorised() {
        let ds = dataset(vec![
            categorised(record("h", "A", 1.0, "2024-01-01"), "Food"),
            record("h", "B", 1.0, "2024-01-01"),
            record("h", "C", 1.0, "2024-01-01"),
        ]);
        let chart = category_breakdown(&ds, &[0, 1, 2]);
        assert_eq!(chart.data[0], label_point(UNCATEGORISED, 2.0));
        assert_eq!(chart.data[1], label_point("Food", 1.0));
    }

    #[test]
    fn vega_lite_spec_binds_axes_and_data() {
        let ds = dataset(vec![
            record("h", "A", 1.0, "2024-01-02"),
            record("h", "B", 1.0, "2024-01-02"),
            record("h", "C", 1.0, "2024-01-01"),
        ]);
        let spec = daily_volume(&ds, &[0, 1, 2]).to_vega_lite();
        assert_eq!(spec["mark"]["type"], "line");
        assert_eq!(spec["encoding"]["x"]["type"], "temporal");
        assert_eq!(spec["data"]["values"][0]["x"], "2024-01-01");
        assert_eq!(spec["data"]["values"][1]["y"], 2.0);
    }

    #[test]
    fn coverage_chart_fixes_percent_domain() {
        let coverage = Coverage {
            overall_pct: 50.0,
            per_household: vec![],
        };
        let spec = coverage_per_household(&coverage).to_vega_lite();
        assert_eq!(spec["encoding"]["y"]["scale"]["domain"], json!([0.0, 100.0]));
        assert_eq!(spec["encoding"]["x"]["sort"], Value::Null);
    }
}
