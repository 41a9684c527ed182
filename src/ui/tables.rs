use std::fmt::{self, Write};

use super::{escape, plot};
use crate::state::NgramSize;
use crate::view::explorer::MAX_ROWS;
use crate::view::summary::ColumnSummary;
use crate::view::{Rendering, Report};

/// Main panel for a non-empty selection.
pub fn report(out: &mut String, rendering: &Rendering, report: &Report) -> fmt::Result {
    writeln!(out, "<h2>Basic descriptive analysis</h2>")?;
    metrics(out, report)?;

    writeln!(out, "<div class=\"columns\">\n<div>")?;
    chart(out, report, "household-transactions")?;
    writeln!(out, "</div>\n<div>")?;
    history(out, report)?;
    writeln!(out, "</div>\n</div>")?;

    writeln!(out, "<h2>Summary statistics</h2>")?;
    summary(out, &report.summary)?;

    writeln!(out, "<h2>Distributions</h2>")?;
    writeln!(out, "<div class=\"columns\">\n<div>")?;
    chart(out, report, "amount-histogram")?;
    chart(out, report, "daily-volume")?;
    writeln!(out, "</div>\n<div>")?;
    chart(out, report, "category-breakdown")?;
    writeln!(out, "</div>\n</div>")?;

    writeln!(out, "<h2>Categorisation</h2>")?;
    writeln!(out, "<div class=\"columns\">\n<div>")?;
    coverage(out, report)?;
    ngrams(out, rendering, report)?;
    writeln!(out, "</div>\n<div>")?;
    explorer(out, rendering, report)?;
    writeln!(out, "</div>\n</div>")
}

fn chart(out: &mut String, report: &Report, id: &str) -> fmt::Result {
    match report.charts.iter().find(|c| c.id == id) {
        Some(c) => plot::chart_container(out, c),
        None => Ok(()),
    }
}

fn metric(out: &mut String, label: &str, value: &str) -> fmt::Result {
    writeln!(
        out,
        "<div class=\"metric\"><div class=\"note\">{label}</div><div class=\"value\">{}</div></div>",
        escape(value)
    )
}

fn metrics(out: &mut String, report: &Report) -> fmt::Result {
    let o = &report.overview;
    writeln!(out, "<div class=\"metrics\">")?;
    metric(out, "Total Households", &o.households.to_string())?;
    metric(out, "Unique Transactions", &o.unique_transactions.to_string())?;
    metric(out, "Rows Selected", &format!("{} / {}", o.rows, o.dataset_rows))?;
    metric(out, "Columns", &o.columns.to_string())?;
    metric(out, "Total Amount", &format!("{:.2}", o.total_amount))?;
    metric(out, "Mean Amount", &format!("{:.2}", o.mean_amount))?;
    metric(
        out,
        "Date Span",
        &format!("{} – {}", o.first_date.format("%Y-%m-%d"), o.last_date.format("%Y-%m-%d")),
    )?;
    writeln!(out, "</div>")
}

fn history(out: &mut String, report: &Report) -> fmt::Result {
    writeln!(out, "<h3>Transaction history span</h3>")?;
    writeln!(
        out,
        "<table>\n<tr><th>Household ID</th><th>First Transaction</th><th>Last Transaction</th>\
         <th>Duration (days)</th><th>Unique Transactions</th><th>Avg Transactions/Day</th></tr>"
    )?;
    for span in &report.history {
        let avg = span
            .avg_per_day
            .map_or_else(|| "n/a".to_string(), |v| format!("{v:.1}"));
        writeln!(
            out,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td class=\"num\">{}</td><td class=\"num\">{}</td><td class=\"num\">{avg}</td></tr>",
            escape(&span.household_id),
            span.first_date.format("%Y-%m-%d"),
            span.last_date.format("%Y-%m-%d"),
            span.duration_days,
            span.unique_transactions,
        )?;
    }
    writeln!(out, "</table>")?;
    writeln!(
        out,
        "<p class=\"note\">Unusual values in transaction counts may indicate that some of the data is synthetic.</p>"
    )
}

fn summary(out: &mut String, columns: &[ColumnSummary]) -> fmt::Result {
    writeln!(
        out,
        "<table>\n<tr><th>Column</th><th>Type</th><th>Non-null</th><th>Nulls</th><th>Distinct</th>\
         <th>Min</th><th>Mean</th><th>Max</th><th>Most common values</th></tr>"
    )?;
    for col in columns {
        let (min, mean, max) = match (&col.numeric, &col.date_range) {
            (Some(n), _) => (
                format!("{:.2}", n.min),
                format!("{:.2}", n.mean),
                format!("{:.2}", n.max),
            ),
            (None, Some((first, last))) => (
                first.format("%Y-%m-%d").to_string(),
                String::new(),
                last.format("%Y-%m-%d").to_string(),
            ),
            (None, None) => Default::default(),
        };
        let top = col
            .top_values
            .iter()
            .map(|v| format!("{} ({})", escape(&v.value), v.count))
            .collect::<Vec<_>>()
            .join(", ");
        writeln!(
            out,
            "<tr><td>{}</td><td>{}</td><td class=\"num\">{}</td><td class=\"num\">{} ({:.1}%)</td>\
             <td class=\"num\">{}</td><td class=\"num\">{min}</td><td class=\"num\">{mean}</td>\
             <td class=\"num\">{max}</td><td>{top}</td></tr>",
            escape(&col.name),
            col.kind.label(),
            col.non_null,
            col.nulls,
            col.null_pct(),
            col.distinct,
        )?;
    }
    writeln!(out, "</table>")
}

fn coverage(out: &mut String, report: &Report) -> fmt::Result {
    writeln!(out, "<h3>Coverage: {:.2}%</h3>", report.coverage.overall_pct)?;
    writeln!(
        out,
        "<p>Coverage is the percentage of unique transactions that received a system category, regardless of accuracy.</p>"
    )?;
    chart(out, report, "household-coverage")
}

fn ngrams(out: &mut String, rendering: &Rendering, report: &Report) -> fmt::Result {
    let table = &report.ngrams;
    writeln!(out, "<h3>Common patterns in uncategorised transactions</h3>")?;
    writeln!(out, "<fieldset><legend>N-gram size</legend>")?;
    for size in NgramSize::CHOICES {
        let checked = if size == rendering.session.ngram { " checked" } else { "" };
        writeln!(
            out,
            "<label><input type=\"radio\" name=\"ngram\" value=\"{n}\"{checked} onchange=\"this.form.submit()\"> {n}</label>",
            n = size.get()
        )?;
    }
    writeln!(out, "</fieldset>")?;

    if table.top.is_empty() {
        return writeln!(
            out,
            "<p class=\"note\">No {}-grams found in {} uncategorised transactions.</p>",
            table.size.get(),
            table.documents
        );
    }
    chart(out, report, "ngrams")?;
    writeln!(out, "<table>\n<tr><th>{}-gram</th><th>Frequency</th></tr>", table.size.get())?;
    for g in &table.top {
        writeln!(
            out,
            "<tr><td>{}</td><td class=\"num\">{}</td></tr>",
            escape(&g.gram),
            g.count
        )?;
    }
    writeln!(out, "</table>")
}

fn explorer(out: &mut String, rendering: &Rendering, report: &Report) -> fmt::Result {
    let table = &report.explorer;
    writeln!(out, "<h3>'Accuracy' (qualitatively assessed)</h3>")?;
    writeln!(
        out,
        "<p>Eyeball the categorisation of one household at a time, in the absence of ground truth.</p>"
    )?;

    writeln!(
        out,
        "<label>Select Household <select name=\"explore\" onchange=\"this.form.submit()\">"
    )?;
    for h in &rendering.explore_households {
        let selected = if rendering.explore_household.as_ref() == Some(h) {
            " selected"
        } else {
            ""
        };
        writeln!(out, "<option value=\"{0}\"{selected}>{0}</option>", escape(h))?;
    }
    writeln!(out, "</select></label>")?;
    writeln!(
        out,
        "<button type=\"submit\" name=\"seed\" value=\"{}\">Shuffle Transactions</button>",
        rendering.session.next_shuffle_seed()
    )?;

    if table.rows.is_empty() {
        return writeln!(
            out,
            "<p class=\"note\">No categorised transactions for this household in the selection.</p>"
        );
    }
    if table.shuffled {
        writeln!(
            out,
            "<p class=\"note\">Shuffled order (seed {}).</p>",
            rendering.session.shuffle_seed.unwrap_or_default()
        )?;
    }
    writeln!(out, "<table>\n<tr><th>Description</th><th>Category</th></tr>")?;
    for row in &table.rows {
        writeln!(
            out,
            "<tr><td>{}</td><td>{}</td></tr>",
            escape(&row.description),
            escape(&row.category)
        )?;
    }
    writeln!(out, "</table>")?;
    if table.total > MAX_ROWS {
        writeln!(
            out,
            "<p class=\"note\">Showing {MAX_ROWS} of {} transactions.</p>",
            table.total
        )?;
    }
    Ok(())
}
