//! Dashboard presentation.
//!
//! Rendering is split in two pure steps:
//!
//! 1. [`build_view`] turns `Statistics` into a [`DashboardView`]: counter
//!    values, bar chart geometry and table rows. No markup is produced here,
//!    so layout can be tested numerically.
//! 2. [`render_html`] turns a view into a self-contained HTML page with an
//!    inline SVG bar chart.
//!
//! # Clock injection
//! `build_view` takes the generation time as a parameter instead of calling
//! `Utc::now()`, which keeps rendered output deterministic in tests.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::logging::Component;
use crate::model::Statistics;

// ---------------------------------------------------------------------------
// Layout constants
// ---------------------------------------------------------------------------

pub const SVG_WIDTH: f64 = 500.0;
pub const SVG_HEIGHT: f64 = 400.0;
pub const MARGIN_TOP: f64 = 20.0;
pub const MARGIN_RIGHT: f64 = 20.0;
pub const MARGIN_BOTTOM: f64 = 60.0;
pub const MARGIN_LEFT: f64 = 60.0;

/// Fraction of each band left empty between bars (and at both ends).
pub const BAND_PADDING: f64 = 0.1;

/// Plot area inside the margins.
pub const PLOT_WIDTH: f64 = SVG_WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
pub const PLOT_HEIGHT: f64 = SVG_HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;

pub const CHART_TITLE: &str = "PPS Count by State";
pub const TABLE_HEADERS: [&str; 3] = ["State", "PPS Count", "Total Victims"];

// ---------------------------------------------------------------------------
// View types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Counter {
    pub label: String,
    pub value: u64,
}

/// One bar, in plot-area coordinates (origin at the top-left of the plot).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bar {
    pub label: String,
    pub value: u64,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tick {
    pub value: u64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarChart {
    pub title: String,
    pub bars: Vec<Bar>,
    pub y_ticks: Vec<Tick>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<[String; 3]>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub counters: Vec<Counter>,
    pub chart: BarChart,
    pub table: Table,
    /// Shown above the counters, e.g. when sample data replaced live data.
    pub notice: Option<String>,
    pub generated_at: String,
}

// ---------------------------------------------------------------------------
// Statistics -> view
// ---------------------------------------------------------------------------

pub fn build_view(stats: &Statistics, origin: Component, now: DateTime<Utc>) -> DashboardView {
    let notice = if origin == Component::Sample {
        Some("Live data unavailable. Showing bundled sample data.".to_string())
    } else if !stats.is_valid_input() {
        Some("The data source returned an unexpected response. Totals are zero.".to_string())
    } else {
        None
    };

    DashboardView {
        counters: vec![
            Counter {
                label: "Total PPS".to_string(),
                value: stats.total_shelter_count,
            },
            Counter {
                label: "Total Victims".to_string(),
                value: stats.total_victim_count,
            },
        ],
        chart: build_chart(stats),
        table: build_table(stats),
        notice,
        generated_at: now.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    }
}

fn build_chart(stats: &Statistics) -> BarChart {
    let n = stats.by_state.len();
    let max = stats.max_shelter_count();

    // Band scale: n bands with inner and outer padding of BAND_PADDING steps.
    let step = if n == 0 {
        0.0
    } else {
        PLOT_WIDTH / (n as f64 - BAND_PADDING + 2.0 * BAND_PADDING)
    };
    let bandwidth = step * (1.0 - BAND_PADDING);
    let offset = step * BAND_PADDING;

    let bars = stats
        .by_state
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let y = scale_y(s.shelter_count, max);
            Bar {
                label: s.state.clone(),
                value: s.shelter_count,
                x: offset + i as f64 * step,
                y,
                width: bandwidth,
                height: PLOT_HEIGHT - y,
            }
        })
        .collect();

    let y_ticks = tick_values(max)
        .into_iter()
        .map(|value| Tick {
            value,
            y: scale_y(value, max),
        })
        .collect();

    BarChart {
        title: CHART_TITLE.to_string(),
        bars,
        y_ticks,
    }
}

/// Linear y scale mapping `[0, max]` onto `[PLOT_HEIGHT, 0]`.
fn scale_y(value: u64, max: u64) -> f64 {
    if max == 0 {
        return PLOT_HEIGHT;
    }
    PLOT_HEIGHT - (value as f64 / max as f64) * PLOT_HEIGHT
}

/// Roughly five evenly spaced integer ticks from 0 up to `max`, with a step
/// of 1, 2 or 5 times a power of ten.
pub fn tick_values(max: u64) -> Vec<u64> {
    if max == 0 {
        return vec![0];
    }
    let raw = max as f64 / 5.0;
    let magnitude = 10f64.powf(raw.log10().floor());
    let step = [1.0, 2.0, 5.0, 10.0]
        .iter()
        .map(|m| m * magnitude)
        .find(|s| *s >= raw)
        .unwrap_or(10.0 * magnitude)
        .max(1.0) as u64;
    (0..=max / step).map(|i| i * step).collect()
}

fn build_table(stats: &Statistics) -> Table {
    Table {
        headers: TABLE_HEADERS.iter().map(|h| h.to_string()).collect(),
        rows: stats
            .by_state
            .iter()
            .map(|s| {
                [
                    s.state.clone(),
                    s.shelter_count.to_string(),
                    s.victim_total.to_string(),
                ]
            })
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// View -> HTML
// ---------------------------------------------------------------------------

const STYLE: &str = r#"
body { font-family: Arial, sans-serif; margin: 0; padding: 20px; background: #f5f5f5; }
.container { max-width: 1200px; margin: 0 auto; }
h1 { color: #1f2937; }
.notice { background: #fef3c7; border: 1px solid #f59e0b; padding: 10px 14px; border-radius: 6px; margin-bottom: 16px; }
.stats { display: flex; gap: 20px; margin-bottom: 20px; }
.stat-box { flex: 1; background: white; padding: 20px; border-radius: 8px; box-shadow: 0 2px 4px rgba(0,0,0,0.1); text-align: center; }
.stat-box h3 { margin: 0; color: #6b7280; }
.stat-box p { font-size: 2em; margin: 10px 0 0; color: #1d4ed8; }
.chart { background: white; padding: 20px; border-radius: 8px; margin-bottom: 20px; }
.bar { fill: steelblue; }
table { width: 100%; border-collapse: collapse; background: white; }
th, td { padding: 12px; text-align: left; border-bottom: 1px solid #e5e7eb; }
th { background: #1d4ed8; color: white; }
footer { color: #6b7280; font-size: 0.85em; margin-top: 12px; }
"#;

pub fn render_html(view: &DashboardView) -> String {
    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str("<title>Flood Relief Centre (PPS) Dashboard</title>\n");
    html.push_str(&format!("<style>{}</style>\n", STYLE));
    html.push_str("</head>\n<body>\n<div class=\"container\">\n");
    html.push_str("<h1>Flood Relief Centre (PPS) Dashboard</h1>\n");

    if let Some(notice) = &view.notice {
        html.push_str(&format!("<div class=\"notice\">{}</div>\n", escape(notice)));
    }

    html.push_str("<div class=\"stats\">\n");
    for counter in &view.counters {
        html.push_str(&format!(
            "<div class=\"stat-box\"><h3>{}</h3><p>{}</p></div>\n",
            escape(&counter.label),
            counter.value
        ));
    }
    html.push_str("</div>\n");

    html.push_str("<div class=\"chart\">\n");
    html.push_str(&render_chart_svg(&view.chart));
    html.push_str("</div>\n");

    html.push_str(&render_table(&view.table));
    html.push_str(&format!(
        "<footer>Generated {}</footer>\n",
        escape(&view.generated_at)
    ));
    html.push_str("</div>\n</body>\n</html>\n");
    html
}

pub fn render_chart_svg(chart: &BarChart) -> String {
    let mut bars = String::new();
    let mut x_labels = String::new();
    for bar in &chart.bars {
        bars.push_str(&format!(
            r#"<rect class="bar" x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}"><title>{}: {}</title></rect>"#,
            bar.x,
            bar.y,
            bar.width,
            bar.height,
            escape(&bar.label),
            bar.value
        ));
        bars.push('\n');

        // Rotated -45deg and anchored at the end so long state names fit.
        let cx = bar.x + bar.width / 2.0;
        x_labels.push_str(&format!(
            r#"<text x="{cx:.1}" y="{y:.1}" text-anchor="end" font-size="11" transform="rotate(-45, {cx:.1}, {y:.1})">{label}</text>"#,
            cx = cx,
            y = PLOT_HEIGHT + 14.0,
            label = escape(&bar.label)
        ));
        x_labels.push('\n');
    }

    let mut y_axis = String::new();
    for tick in &chart.y_ticks {
        y_axis.push_str(&format!(
            r#"<line x1="-6" y1="{y:.1}" x2="0" y2="{y:.1}" stroke="black"/><text x="-9" y="{y:.1}" dy="0.32em" text-anchor="end" font-size="11">{v}</text>"#,
            y = tick.y,
            v = tick.value
        ));
        y_axis.push('\n');
    }

    format!(
        r#"<svg width="{w}" height="{h}" xmlns="http://www.w3.org/2000/svg">
<g transform="translate({ml},{mt})">
<line x1="0" y1="{ph}" x2="{pw}" y2="{ph}" stroke="black"/>
<line x1="0" y1="0" x2="0" y2="{ph}" stroke="black"/>
{y_axis}{bars}{x_labels}<text x="{tx}" y="0" text-anchor="middle" font-weight="bold">{title}</text>
</g>
</svg>
"#,
        w = SVG_WIDTH,
        h = SVG_HEIGHT,
        ml = MARGIN_LEFT,
        mt = MARGIN_TOP,
        pw = PLOT_WIDTH,
        ph = PLOT_HEIGHT,
        tx = PLOT_WIDTH / 2.0,
        title = escape(&chart.title),
        y_axis = y_axis,
        bars = bars,
        x_labels = x_labels,
    )
}

fn render_table(table: &Table) -> String {
    let mut html = String::from("<table>\n<thead><tr>");
    for header in &table.headers {
        html.push_str(&format!("<th>{}</th>", escape(header)));
    }
    html.push_str("</tr></thead>\n<tbody>\n");
    for row in &table.rows {
        html.push_str("<tr>");
        for cell in row {
            html.push_str(&format!("<td>{}</td>", escape(cell)));
        }
        html.push_str("</tr>\n");
    }
    html.push_str("</tbody>\n</table>\n");
    html
}

/// Escapes text for HTML element content and attribute values.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
