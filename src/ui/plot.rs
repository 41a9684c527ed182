use std::fmt::{self, Write};

use crate::view::charts::ChartSpec;

const VEGA: &str = "https://cdn.jsdelivr.net/npm/vega@5";
const VEGA_LITE: &str = "https://cdn.jsdelivr.net/npm/vega-lite@5";
const VEGA_EMBED: &str = "https://cdn.jsdelivr.net/npm/vega-embed@6";

// ---------------------------------------------------------------------------
// Charts (rendered client-side from Vega-Lite specs)
// ---------------------------------------------------------------------------

pub fn script_tags(out: &mut String) -> fmt::Result {
    for src in [VEGA, VEGA_LITE, VEGA_EMBED] {
        writeln!(out, "<script src=\"{src}\"></script>")?;
    }
    Ok(())
}

/// Placeholder the embed script draws into.
pub fn chart_container(out: &mut String, chart: &ChartSpec) -> fmt::Result {
    writeln!(out, "<div class=\"chart\" id=\"chart-{}\"></div>", chart.id)
}

/// One `vegaEmbed` call per chart. Nothing is written without charts.
pub fn embed_script(out: &mut String, charts: &[ChartSpec]) -> fmt::Result {
    if charts.is_empty() {
        return Ok(());
    }
    writeln!(out, "<script>")?;
    for chart in charts {
        // "</" would end the script element early
        let spec = chart.to_vega_lite().to_string().replace("</", "<\\/");
        writeln!(
            out,
            "vegaEmbed('#chart-{}', {spec}, {{ actions: false }});",
            chart.id
        )?;
    }
    writeln!(out, "</script>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::charts::{Axis, AxisType, ChartColor, ChartKind, ChartPoint, XValue};

    fn chart(label: &str) -> ChartSpec {
        ChartSpec {
            id: "test",
            title: "Test".into(),
            kind: ChartKind::Bar,
            x: Axis {
                title: "x".into(),
                kind: AxisType::Nominal,
            },
            y: Axis {
                title: "y".into(),
                kind: AxisType::Quantitative,
            },
            y_domain: None,
            data: vec![ChartPoint {
                x: XValue::Label(label.into()),
                x2: None,
                y: 1.0,
            }],
            color: ChartColor::Single("#000000".into()),
        }
    }

    #[test]
    fn labels_cannot_close_the_script() {
        let mut out = String::new();
        embed_script(&mut out, &[chart("</script><script>alert(1)")]).unwrap();
        assert_eq!(out.matches("</script>").count(), 1);
        assert!(out.contains("vegaEmbed('#chart-test'"));
    }

    #[test]
    fn no_charts_no_script() {
        let mut out = String::new();
        embed_script(&mut out, &[]).unwrap();
        assert!(out.is_empty());
    }
}
