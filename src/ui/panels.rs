use std::fmt::{self, Write};

use super::{escape, PAGE_TITLE};
use crate::view::charts::UNCATEGORISED;
use crate::view::{Rendering, ViewBody};

const SUBMIT_ON_CHANGE: &str = "onchange=\"this.form.submit()\"";

// ---------------------------------------------------------------------------
// Left side panel – filter widgets
// ---------------------------------------------------------------------------

/// Render the left filter panel.
pub fn side_panel(out: &mut String, rendering: &Rendering) -> fmt::Result {
    let filters = &rendering.session.filters;
    let options = &rendering.options;

    writeln!(out, "<aside>")?;
    writeln!(out, "<h2>Filters</h2>")?;

    // ---- Households ----
    writeln!(out, "<fieldset><legend>Household</legend>")?;
    for h in &options.households {
        checkbox(out, "household", h, h, filters.households.contains(h))?;
    }
    writeln!(out, "</fieldset>")?;

    // ---- Categories ----
    writeln!(out, "<fieldset><legend>Category</legend>")?;
    if options.has_uncategorised {
        checkbox(out, "category", "", UNCATEGORISED, filters.categories.contains(&None))?;
    }
    for c in &options.categories {
        let checked = filters.categories.contains(&Some(c.clone()));
        checkbox(out, "category", c, c, checked)?;
    }
    writeln!(out, "</fieldset>")?;

    // ---- Date range ----
    let (min, max) = options
        .date_bounds
        .map(|(a, b)| (a.format("%Y-%m-%d").to_string(), b.format("%Y-%m-%d").to_string()))
        .unwrap_or_default();
    writeln!(out, "<fieldset><legend>Date range</legend>")?;
    for (name, label, value) in [
        ("from", "From", filters.date_from),
        ("to", "To", filters.date_to),
    ] {
        let value = value.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default();
        writeln!(
            out,
            "<label>{label} <input type=\"date\" name=\"{name}\" value=\"{value}\" min=\"{min}\" max=\"{max}\" {SUBMIT_ON_CHANGE}></label><br>"
        )?;
    }
    writeln!(out, "</fieldset>")?;

    // ---- Amount range ----
    writeln!(out, "<fieldset><legend>Amount</legend>")?;
    for (name, label, value) in [
        ("min_amount", "Min", filters.min_amount),
        ("max_amount", "Max", filters.max_amount),
    ] {
        let value = value.map(|v| v.to_string()).unwrap_or_default();
        writeln!(
            out,
            "<label>{label} <input type=\"number\" step=\"any\" name=\"{name}\" value=\"{value}\"></label><br>"
        )?;
    }
    writeln!(out, "</fieldset>")?;

    writeln!(out, "<button type=\"submit\">Apply</button> <a href=\"/\">Reset</a>")?;
    writeln!(out, "</aside>")
}

fn checkbox(out: &mut String, name: &str, value: &str, label: &str, checked: bool) -> fmt::Result {
    let checked = if checked { " checked" } else { "" };
    writeln!(
        out,
        "<label><input type=\"checkbox\" name=\"{name}\" value=\"{}\"{checked} {SUBMIT_ON_CHANGE}> {}</label><br>",
        escape(value),
        escape(label)
    )
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the page header.
pub fn top_bar(out: &mut String, rendering: &Rendering) -> fmt::Result {
    writeln!(out, "<header class=\"top-bar\">")?;
    writeln!(out, "<h1>{PAGE_TITLE}</h1>")?;
    writeln!(out, "<span class=\"note\">{}</span>", escape(&rendering.source))?;
    match &rendering.body {
        ViewBody::Report(report) => writeln!(
            out,
            "<span>{} of {} transactions selected</span>",
            report.overview.rows, report.overview.dataset_rows
        )?,
        ViewBody::Empty(warning) => writeln!(
            out,
            "<span>0 of {} transactions selected</span>",
            warning.dataset_rows
        )?,
    }
    writeln!(out, "</header>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::filter::FilterSelection;
    use crate::data::model::tests::{categorised, dataset, record};
    use crate::state::SessionState;
    use crate::view::explore;

    #[test]
    fn side_panel_reflects_the_selection() {
        let ds = dataset(vec![
            categorised(record("h1", "A", 1.0, "2024-01-01"), "Food & Drink"),
            record("h2", "B", 1.0, "2024-01-09"),
        ]);
        let session = SessionState {
            filters: FilterSelection {
                households: ["h2".to_string()].into_iter().collect(),
                categories: [None].into_iter().collect(),
                ..Default::default()
            },
            ..Default::default()
        };
        let mut html = String::new();
        side_panel(&mut html, &explore(&ds, &session)).unwrap();

        assert!(html.contains(r#"name="household" value="h2" checked"#));
        assert!(html.contains(r#"name="household" value="h1" onchange"#));
        assert!(html.contains(r#"name="category" value="" checked"#));
        assert!(html.contains("Food &amp; Drink"));
        assert!(html.contains(r#"min="2024-01-01" max="2024-01-09""#));
    }

    #[test]
    fn top_bar_counts_selected_rows() {
        let ds = dataset(vec![
            record("h1", "A", 1.0, "2024-01-01"),
            record("h2", "B", 1.0, "2024-01-09"),
        ]);
        let session = SessionState {
            filters: FilterSelection {
                households: ["h1".to_string()].into_iter().collect(),
                ..Default::default()
            },
            ..Default::default()
        };
        let mut html = String::new();
        top_bar(&mut html, &explore(&ds, &session)).unwrap();
        assert!(html.contains("1 of 2 transactions selected"));
    }
}
