//! Human-readable rendering of a run.

use std::fmt::Write as _;
use std::str::FromStr;

use ratebridge_common::RateKind;
use serde::{Deserialize, Serialize};

use crate::engine::RunOutcome;
use crate::error::FxError;

/// Output format of the run report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Text,
    Html,
}

impl FromStr for ReportFormat {
    type Err = FxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "txt" => Ok(ReportFormat::Text),
            "html" => Ok(ReportFormat::Html),
            other => Err(FxError::Configuration(format!(
                "Unknown report format: {other}"
            ))),
        }
    }
}

/// Render `outcome` in the requested format.
pub fn render(outcome: &RunOutcome, format: ReportFormat) -> String {
    match format {
        ReportFormat::Text => render_text(outcome),
        ReportFormat::Html => render_html(outcome),
    }
}

fn summary_lines(outcome: &RunOutcome) -> Vec<String> {
    let mut lines = vec![format!(
        "{} rates: {} direct, {} triangulated, {} reversed",
        outcome.rates.len(),
        outcome.count(RateKind::Direct),
        outcome.count(RateKind::Triangulated),
        outcome.count(RateKind::Reversed),
    )];

    if let Some(max) = outcome.validation.max_diff_pct() {
        lines.push(format!(
            "{} vs {}: {} currencies compared, max divergence {}%",
            outcome.validation.primary,
            outcome.validation.secondary,
            outcome.validation.divergences.len(),
            max.round_dp(2),
        ));
    }

    for currency in &outcome.degenerate {
        lines.push(format!("no usable quote for {currency}"));
    }

    for pair in &outcome.unresolved {
        lines.push(format!("unresolved {pair}"));
    }

    lines
}

/// Plain text table, one record per line.
pub fn render_text(outcome: &RunOutcome) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Exchange rates against {} (run {}, {})",
        outcome.base,
        outcome.run_id,
        outcome.finished_at.format("%Y-%m-%d %H:%M:%S UTC"),
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "{:<4} {:<4} {:>12}  NOTE", "FROM", "TO", "RATE");

    for record in &outcome.records {
        let _ = writeln!(
            out,
            "{:<4} {:<4} {:>12}  {}",
            record.from,
            record.to,
            record.value.to_string(),
            record.note
        );
    }

    let _ = writeln!(out);
    for line in summary_lines(outcome) {
        let _ = writeln!(out, "{line}");
    }
    out
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Standalone HTML document with one table row per record.
pub fn render_html(outcome: &RunOutcome) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "<!DOCTYPE html>");
    let _ = writeln!(
        out,
        "<html><head><meta charset=\"utf-8\"><title>Exchange rates</title></head><body>"
    );
    let _ = writeln!(
        out,
        "<h1>Exchange rates against {}</h1><p>Run {} at {}</p>",
        escape(outcome.base.code()),
        outcome.run_id,
        outcome.finished_at.format("%Y-%m-%d %H:%M:%S UTC"),
    );
    let _ = writeln!(
        out,
        "<table><thead><tr><th>From</th><th>To</th><th>Rate</th><th>Note</th></tr></thead><tbody>"
    );
    for record in &outcome.records {
        let _ = writeln!(
            out,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape(&record.from),
            escape(&record.to),
            record.value,
            escape(&record.note)
        );
    }
    let _ = writeln!(out, "</tbody></table><ul>");
    for line in summary_lines(outcome) {
        let _ = writeln!(out, "<li>{}</li>", escape(&line));
    }
    let _ = writeln!(out, "</ul></body></html>");
    out
}
