/// HTML rendering of a [`Rendering`](crate::view::Rendering). One form
/// wraps the page so every control change resubmits the full selection.
pub mod panels;
pub mod plot;
pub mod tables;

use std::fmt::{self, Write};

use crate::error::LoadError;
use crate::view::charts::ChartSpec;
use crate::view::{Rendering, ViewBody};

pub const PAGE_TITLE: &str = "Transaction Dataset Review";

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; margin: 0; color: #1f2933; background: #f7f8fa; }
header.top-bar { display: flex; align-items: baseline; gap: 1.5rem; padding: 0.8rem 1.5rem; background: #fff; border-bottom: 1px solid #dde1e6; }
header.top-bar h1 { font-size: 1.3rem; margin: 0; }
.layout { display: grid; grid-template-columns: 260px 1fr; }
aside { padding: 1rem; background: #fff; border-right: 1px solid #dde1e6; min-height: 100vh; }
aside fieldset { border: none; padding: 0; margin: 0 0 1rem 0; }
aside legend { font-weight: 600; margin-bottom: 0.3rem; }
main { padding: 1rem 1.5rem; }
.metrics { display: flex; flex-wrap: wrap; gap: 1rem; }
.metric { background: #fff; border: 1px solid #dde1e6; border-radius: 6px; padding: 0.6rem 1rem; min-width: 140px; }
.metric .value { font-size: 1.4rem; font-weight: 600; }
.columns { display: grid; grid-template-columns: 1fr 1fr; gap: 1.5rem; }
.chart { width: 100%; min-height: 300px; }
table { border-collapse: collapse; width: 100%; background: #fff; font-size: 0.9rem; }
th, td { border-bottom: 1px solid #e4e7eb; padding: 0.3rem 0.5rem; text-align: left; vertical-align: top; }
td.num { text-align: right; font-variant-numeric: tabular-nums; }
.empty, .error { background: #fff; border: 1px solid #dde1e6; border-radius: 6px; padding: 2rem; margin-top: 1rem; }
.error { border-color: #d64545; color: #a61b1b; }
.note { color: #616e7c; font-size: 0.85rem; }
"#;

/// Minimal escaping for text and attribute values.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

fn head(out: &mut String, with_charts: bool) -> fmt::Result {
    writeln!(out, "<!doctype html>\n<html lang=\"en\">\n<head>")?;
    writeln!(out, "<meta charset=\"utf-8\">")?;
    writeln!(out, "<title>{PAGE_TITLE}</title>")?;
    writeln!(out, "<style>{STYLE}</style>")?;
    if with_charts {
        plot::script_tags(out)?;
    }
    writeln!(out, "</head>")
}

/// The dashboard page.
pub fn render_page(rendering: &Rendering) -> Result<String, fmt::Error> {
    let mut out = String::new();
    let charts: &[ChartSpec] = match &rendering.body {
        ViewBody::Report(report) => report.charts.as_slice(),
        ViewBody::Empty(_) => &[],
    };

    head(&mut out, !charts.is_empty())?;
    writeln!(out, "<body>")?;
    writeln!(out, "<form method=\"get\" action=\"/\">")?;
    panels::top_bar(&mut out, rendering)?;
    writeln!(out, "<div class=\"layout\">")?;
    panels::side_panel(&mut out, rendering)?;
    writeln!(out, "<main>")?;
    match &rendering.body {
        ViewBody::Empty(warning) => {
            writeln!(out, "<section class=\"empty\">")?;
            writeln!(out, "<h2>No data</h2>")?;
            writeln!(out, "<p>{}.</p>", escape(&warning.to_string()))?;
            writeln!(
                out,
                "<p class=\"note\">Widen the filters or <a href=\"/\">reset</a> them.</p>"
            )?;
            writeln!(out, "</section>")?;
        }
        ViewBody::Report(report) => tables::report(&mut out, rendering, report)?,
    }
    writeln!(out, "</main>\n</div>\n</form>")?;
    plot::embed_script(&mut out, charts)?;
    writeln!(out, "</body>\n</html>")?;
    Ok(out)
}

/// Shown in place of the dashboard when the dataset failed to load.
pub fn render_load_error(err: &LoadError, source: &str) -> Result<String, fmt::Error> {
    let mut out = String::new();
    head(&mut out, false)?;
    writeln!(out, "<body>\n<main>")?;
    writeln!(out, "<section class=\"error\">")?;
    writeln!(out, "<h2>The dataset could not be loaded</h2>")?;
    writeln!(out, "<p><code>{}</code></p>", escape(source))?;
    writeln!(out, "<p>{}</p>", escape(&err.to_string()))?;
    writeln!(out, "</section>\n</main>\n</body>\n</html>")?;
    Ok(out)
}

/// Plain message page for a rejected filter value.
pub fn render_bad_selection(message: &str) -> Result<String, fmt::Error> {
    let mut out = String::new();
    head(&mut out, false)?;
    writeln!(out, "<body>\n<main>")?;
    writeln!(out, "<section class=\"error\">")?;
    writeln!(out, "<h2>Invalid filter</h2>")?;
    writeln!(out, "<p>{}</p>", escape(message))?;
    writeln!(out, "<p><a href=\"/\">Start over</a></p>")?;
    writeln!(out, "</section>\n</main>\n</body>\n</html>")?;
    Ok(out)
}
