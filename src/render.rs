//! Rendering the search view to the terminal.
//!
//! Text output mirrors the layout of the search page: query preview, error
//! box, then one card per match. The other formats are meant for scripts.

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::fmt::Write;
use std::time::Duration;

use crate::cli::OutputFormat;
use crate::controller::SearchController;
use crate::model::{Metric, RequestState, RequestStatus, ResultItem};
use crate::service::SearchService;
use crate::{CONTENT_DIVIDER_WIDTH, csv_escape_text, format_bytes};

/// Explanation of the two similarity metrics.
pub const METRIC_GUIDE: &str = "L2 compares raw distances between embeddings; Cosine compares \
their orientation. Cosine is often more stable for images because it focuses on feature \
direction, not magnitude. Use L2 when absolute feature values are meaningful for your dataset.";

/// Point-in-time copy of what the view shows, in serializable form.
#[derive(Debug, Clone, Serialize)]
pub struct ViewSnapshot {
    pub query: QuerySummary,
    pub status: RequestStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorSummary>,
    pub results: Vec<ResultItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuerySummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<usize>,
    pub top_k: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metric: Option<Metric>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorSummary {
    pub kind: &'static str,
    pub message: String,
}

impl ViewSnapshot {
    /// Capture the current view of a controller.
    pub fn capture<S: SearchService>(controller: &SearchController<S>) -> Self {
        let query = controller.query();
        let preview = controller.preview();
        let state = controller.state();
        Self {
            query: QuerySummary {
                image: preview.map(|p| p.name().to_string()),
                preview_url: preview.map(|p| p.url().to_string()),
                mime_type: preview.map(|p| p.mime_type()),
                size_bytes: preview.map(|p| p.size()),
                top_k: query.top_k,
                metric: controller.sends_metric().then_some(query.metric),
            },
            status: state.status(),
            error: match state {
                RequestState::Failed(err) => Some(ErrorSummary {
                    kind: err.kind(),
                    message: err.to_string(),
                }),
                _ => None,
            },
            results: state.results().to_vec(),
        }
    }
}

/// Render a snapshot in the requested format.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn render(snapshot: &ViewSnapshot, format: OutputFormat) -> serde_json::Result<String> {
    Ok(match format {
        OutputFormat::Json => serde_json::to_string(snapshot)?,
        OutputFormat::JsonPretty => serde_json::to_string_pretty(snapshot)?,
        OutputFormat::Compact => render_compact(&snapshot.results),
        OutputFormat::Csv => render_csv(&snapshot.results),
        OutputFormat::Text => render_text(snapshot),
    })
}

/// Human-readable view: preview, error box, result cards.
#[must_use]
pub fn render_text(snapshot: &ViewSnapshot) -> String {
    let mut out = String::new();
    let query = &snapshot.query;

    if let Some(name) = &query.image {
        let _ = writeln!(out, "{}", "Query Image".bold().cyan());
        let detail = match (query.mime_type, query.size_bytes) {
            (Some(mime), Some(size)) => {
                format!(" ({mime}, {})", format_bytes(u64::try_from(size).unwrap_or(u64::MAX)))
            }
            _ => String::new(),
        };
        let _ = writeln!(out, "  {name}{}", detail.dimmed());
        let metric = query
            .metric
            .map_or_else(String::new, |m| format!("  Metric: {}", m.label()));
        let _ = writeln!(out, "  Top-K: {}{metric}", query.top_k);
        out.push('\n');
    }

    if let Some(error) = &snapshot.error {
        out.push_str(&render_error_box(&error.message));
        out.push('\n');
    }

    match snapshot.status {
        RequestStatus::Loading => {
            let _ = writeln!(out, "{}", "Searching...".yellow());
        }
        RequestStatus::Succeeded if snapshot.results.is_empty() => {
            let _ = writeln!(out, "{}", "No matches returned.".yellow());
        }
        RequestStatus::Succeeded => {
            let _ = writeln!(
                out,
                "{} {}\n",
                snapshot.results.len().to_string().cyan(),
                if snapshot.results.len() == 1 { "match" } else { "matches" }
            );
            for item in &snapshot.results {
                out.push_str(&render_card(item));
            }
        }
        RequestStatus::Idle | RequestStatus::Failed => {}
    }

    out
}

/// One result card.
#[must_use]
pub fn render_card(item: &ResultItem) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} {}",
        format!("Rank #{}", item.rank).bold(),
        item.display_name().green()
    );
    let _ = writeln!(out, "   Distance: {}", format_distance(item.distance));
    let _ = writeln!(out, "   {}", item.image_url.as_str().underline());
    let _ = writeln!(out, "   {}", format!("index {}", item.index).dimmed());
    out.push('\n');
    out
}

/// The red error box shown under the query.
#[must_use]
pub fn render_error_box(message: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", "─".repeat(CONTENT_DIVIDER_WIDTH).red());
    for line in textwrap::wrap(message, CONTENT_DIVIDER_WIDTH - 2) {
        let _ = writeln!(out, "{} {}", "✗".red().bold(), line.red());
    }
    let _ = writeln!(out, "{}", "─".repeat(CONTENT_DIVIDER_WIDTH).red());
    out
}

/// The metric guide, wrapped for the terminal.
#[must_use]
pub fn render_metric_guide() -> String {
    let mut out = format!("{}\n", "Metric guide:".bold());
    for line in textwrap::wrap(METRIC_GUIDE, CONTENT_DIVIDER_WIDTH) {
        let _ = writeln!(out, "  {line}");
    }
    out
}

fn render_compact(results: &[ResultItem]) -> String {
    let mut out = String::new();
    for item in results {
        let _ = writeln!(
            out,
            "#{} {} {} {}",
            item.rank,
            format_distance(item.distance),
            item.display_name(),
            item.image_url
        );
    }
    out
}

fn render_csv(results: &[ResultItem]) -> String {
    let mut out = String::from("rank,index,distance,filename,image_url\n");
    for item in results {
        let _ = writeln!(
            out,
            "{},{},{},\"{}\",\"{}\"",
            item.rank,
            item.index,
            format_distance(item.distance),
            csv_escape_text(item.filename.as_deref().unwrap_or("")),
            csv_escape_text(&item.image_url)
        );
    }
    out
}

/// Spinner shown while a search is in flight. Draws to stderr.
#[must_use]
pub fn searching_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message("Searching...");
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Distances are shown with four decimals.
#[must_use]
pub fn format_distance(distance: f64) -> String {
    format!("{distance:.4}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SearchError;

    fn item(index: u64, rank: u32, filename: Option<&str>) -> ResultItem {
        ResultItem {
            index,
            rank,
            distance: 0.123_456,
            image_url: format!("http://127.0.0.1:8000/static/{index}.jpg"),
            filename: filename.map(str::to_string),
        }
    }

    fn snapshot(state: &RequestState) -> ViewSnapshot {
        ViewSnapshot {
            query: QuerySummary {
                image: Some("cat.png".to_string()),
                preview_url: Some("preview:1".to_string()),
                mime_type: Some("image/png"),
                size_bytes: Some(2048),
                top_k: 5,
                metric: Some(Metric::Cosine),
            },
            status: state.status(),
            error: state.error().map(|e| ErrorSummary {
                kind: e.kind(),
                message: e.to_string(),
            }),
            results: state.results().to_vec(),
        }
    }

    #[test]
    fn format_distance_uses_four_decimals() {
        assert_eq!(format_distance(0.123_456), "0.1235");
        assert_eq!(format_distance(2.0), "2.0000");
    }

    #[test]
    fn card_falls_back_to_unknown() {
        let card = render_card(&item(4, 2, None));
        assert!(card.contains("Unknown"));
        assert!(card.contains("Rank #2"));
        assert!(card.contains("Distance: 0.1235"));
    }

    #[test]
    fn text_view_shows_preview_and_cards() {
        let state = RequestState::Succeeded(vec![item(1, 1, Some("a.jpg")), item(2, 2, None)]);
        let text = render_text(&snapshot(&state));
        assert!(text.contains("Query Image"));
        assert!(text.contains("cat.png"));
        assert!(text.contains("a.jpg"));
        assert!(text.contains("Rank #2"));
    }

    #[test]
    fn text_view_shows_error() {
        let state = RequestState::Failed(SearchError::server(500, r#"{"detail":"oops"}"#));
        let text = render_text(&snapshot(&state));
        assert!(text.contains("HTTP 500"));
        assert!(text.contains("oops"));
        assert!(!text.contains("Rank #"));
    }

    #[test]
    fn text_view_per_status() {
        let loading = render_text(&snapshot(&RequestState::Loading));
        assert!(loading.contains("Searching..."));

        let empty = render_text(&snapshot(&RequestState::Succeeded(Vec::new())));
        assert!(empty.contains("No matches returned."));

        let idle = render_text(&snapshot(&RequestState::Idle));
        assert!(!idle.contains("Searching..."));
        assert!(!idle.contains("No matches"));
    }

    #[test]
    fn json_carries_error_kind() {
        let state = RequestState::Failed(SearchError::Connectivity);
        let json = render(&snapshot(&state), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["status"], "failed");
        assert_eq!(value["error"]["kind"], "connectivity");
        assert_eq!(value["query"]["metric"], "cosine");
        assert_eq!(value["results"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn csv_has_header_and_rows() {
        let state = RequestState::Succeeded(vec![item(1, 1, Some("a \"b\".jpg"))]);
        let csv = render(&snapshot(&state), OutputFormat::Csv).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("rank,index,distance,filename,image_url"));
        assert_eq!(
            lines.next(),
            Some("1,1,0.1235,\"a \"\"b\"\".jpg\",\"http://127.0.0.1:8000/static/1.jpg\"")
        );
    }

    #[test]
    fn compact_is_one_line_per_result() {
        let state = RequestState::Succeeded(vec![item(1, 1, None), item(2, 2, None)]);
        let compact = render(&snapshot(&state), OutputFormat::Compact).unwrap();
        assert_eq!(compact.lines().count(), 2);
        assert!(compact.starts_with("#1 0.1235 Unknown"));
    }

    #[test]
    fn guide_mentions_both_metrics() {
        let guide = render_metric_guide();
        assert!(guide.contains("L2"));
        assert!(guide.contains("Cosine"));
    }
}
