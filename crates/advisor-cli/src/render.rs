//! Plain-text views of a [`RequestState`].

use prediction_core::{Analysis, MetricRow};
use query_controller::RequestState;
use serde_json::Value;

pub const IDLE_PROMPT: &str = "Enter a ticker symbol (e.g. AAPL) to get a prediction.";
pub const LOADING_TEXT: &str = "Loading…";
pub const FAILURE_TITLE: &str = "Prediction failed";

const SPARK_BARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

pub fn render(state: &RequestState) -> String {
    match state {
        RequestState::Idle => IDLE_PROMPT.to_string(),
        RequestState::Loading => LOADING_TEXT.to_string(),
        RequestState::Failure(message) => format!("{FAILURE_TITLE}\n  {message}"),
        RequestState::Success(analysis) => render_analysis(analysis),
    }
}

fn render_analysis(analysis: &Analysis) -> String {
    let mut lines = vec![format!(
        "{}  {}  (prediction {})",
        analysis.ticker,
        analysis.action,
        format_number(analysis.prediction_value)
    )];

    if !analysis.message.is_empty() {
        lines.push(analysis.message.clone());
    }

    if let Some(row) = analysis.latest_metrics() {
        lines.extend(metrics_panel(row));
    }

    if let Some(chart) = chart_line(analysis) {
        lines.push(chart);
    }

    lines.join("\n")
}

fn metrics_panel(row: &MetricRow) -> Vec<String> {
    let mut lines = vec![format!("Latest metrics ({})", row.date)];
    let base = [
        ("open", row.open),
        ("high", row.high),
        ("low", row.low),
        ("close", row.close),
        ("volume", row.volume),
    ];
    for (name, value) in base {
        lines.push(format!("  {name:<12}{}", format_number(value)));
    }
    for (name, value) in row.indicators() {
        lines.push(format!("  {name:<12}{}", format_value(value)));
    }
    lines
}

fn chart_line(analysis: &Analysis) -> Option<String> {
    let series = analysis.chart_series();
    let (first_label, _) = series.first()?;
    let (last_label, _) = series.last()?;
    let closes: Vec<f64> = series.iter().map(|(_, close)| *close).collect();

    let mut line = format!("{first_label} {} {last_label}", sparkline(&closes));
    if let Some(change) = analysis.price_change() {
        line.push_str(&format!(" ({:+.2}%)", change * 100.0));
    }
    Some(line)
}

/// One bar per value, scaled between the series minimum and maximum.
pub fn sparkline(values: &[f64]) -> String {
    let finite = values.iter().copied().filter(|v| v.is_finite());
    let min = finite.clone().fold(f64::INFINITY, f64::min);
    let max = finite.fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    let top = (SPARK_BARS.len() - 1) as f64;

    values
        .iter()
        .map(|&v| {
            if !v.is_finite() {
                ' '
            } else if range <= 0.0 {
                SPARK_BARS[SPARK_BARS.len() / 2]
            } else {
                SPARK_BARS[(((v - min) / range) * top).round() as usize]
            }
        })
        .collect()
}

/// Up to four decimals, without trailing zeros.
pub fn format_number(value: f64) -> String {
    let text = format!("{value:.4}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" {
        "0".to_string()
    } else {
        text.to_string()
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "n/a".to_string(),
        Value::Number(n) => n.as_f64().map(format_number).unwrap_or_else(|| n.to_string()),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prediction_core::{Action, HistoryPoint};
    use serde_json::json;

    fn point(date: &str, close: f64) -> HistoryPoint {
        HistoryPoint {
            date: date.to_string(),
            close,
        }
    }

    fn sample() -> Analysis {
        Analysis {
            ticker: "AAPL".to_string(),
            action: Action::Buy,
            prediction_value: 2.0,
            message: "Momentum is positive".to_string(),
            history: vec![
                point("2025-01-02", 100.0),
                point("2025-01-03", 105.0),
                point("2025-01-06", 110.0),
            ],
            metrics: vec![MetricRow {
                date: "2025-01-06".to_string(),
                open: 105.0,
                high: 111.25,
                low: 104.5,
                close: 110.0,
                volume: 1_200_000.0,
                ma_7: Some(json!(106.5)),
                rsi: Some(Value::Null),
                ..Default::default()
            }],
        }
    }

    #[test]
    fn test_simple_states() {
        assert_eq!(render(&RequestState::Idle), IDLE_PROMPT);
        assert_eq!(render(&RequestState::Loading), LOADING_TEXT);
        assert_eq!(
            render(&RequestState::Failure("ticker not found".into())),
            "Prediction failed\n  ticker not found"
        );
    }

    #[test]
    fn test_success_view() {
        let text = render(&RequestState::Success(sample()));
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "AAPL  BUY  (prediction 2)");
        assert_eq!(lines[1], "Momentum is positive");
        assert_eq!(lines[2], "Latest metrics (2025-01-06)");
        assert!(text.contains("  high        111.25"));
        assert!(text.contains("  ma_7        106.5"));
        assert!(text.contains("  rsi         n/a"));
        assert!(!text.contains("volatility"));
        assert_eq!(
            *lines.last().unwrap(),
            "2025-01-02 ▁▅█ 2025-01-06 (+10.00%)"
        );
    }

    #[test]
    fn test_success_without_metrics_or_history() {
        let analysis = Analysis {
            message: String::new(),
            history: Vec::new(),
            metrics: Vec::new(),
            ..sample()
        };
        assert_eq!(render(&RequestState::Success(analysis)), "AAPL  BUY  (prediction 2)");
    }

    #[test]
    fn test_sparkline_scaling() {
        assert_eq!(sparkline(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]), "▁▂▃▄▅▆▇█");
        assert_eq!(sparkline(&[5.0, 5.0, 5.0]), "▅▅▅");
        assert_eq!(sparkline(&[]), "");
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(2.0), "2");
        assert_eq!(format_number(190.5), "190.5");
        assert_eq!(format_number(0.00123), "0.0012");
        assert_eq!(format_number(-0.00001), "0");
    }
}
