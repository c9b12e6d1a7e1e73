//! Conversion of loosely-typed prediction payloads into [`Analysis`].
//!
//! The normalizer is total over arbitrary JSON: missing or misnamed fields fall
//! back to defaults, non-numeric prices coerce to zero, unknown actions become
//! HOLD. The only failures are a null payload and a payload that carries a
//! truthy `error` field.

use serde_json::{Map, Value};

use crate::{
    Action, Analysis, HistoryPoint, MetricRow, PredictionError, PredictionResult, HISTORY_LIMIT,
};

const TICKER_KEYS: &[&str] = &["ticker", "symbol"];
const ACTION_KEYS: &[&str] = &["action", "recommendation"];
const PREDICTION_KEYS: &[&str] = &["prediction", "score"];
const MESSAGE_KEYS: &[&str] = &["message", "reasoning"];

const DATE_KEYS: &[&str] = &["Date", "date", "DateString"];
const CLOSE_KEYS: &[&str] = &["Close", "close", "price"];
const OPEN_KEYS: &[&str] = &["Open", "open"];
const HIGH_KEYS: &[&str] = &["High", "high"];
const LOW_KEYS: &[&str] = &["Low", "low"];
const VOLUME_KEYS: &[&str] = &["Volume", "volume"];

const RETURN_1D_KEYS: &[&str] = &["return_1d", "Return_1d", "Return"];
const MA_7_KEYS: &[&str] = &["ma_7", "MA_7", "MA7"];
const MA_21_KEYS: &[&str] = &["ma_21", "MA_21", "MA21"];
const RSI_KEYS: &[&str] = &["rsi", "RSI"];
const VOLATILITY_KEYS: &[&str] = &["volatility", "Volatility"];
const NEXT_RETURN_KEYS: &[&str] = &["next_return", "Next_Return"];
const TARGET_KEYS: &[&str] = &["target", "Target"];
const TICKER_CODE_KEYS: &[&str] = &["ticker_code", "Ticker_Code"];

/// Prediction value used when the payload has none (HOLD-equivalent).
pub const DEFAULT_PREDICTION: f64 = 1.0;

const EMPTY_PAYLOAD: &str = "empty response from prediction service";
const GENERIC_ERROR: &str = "prediction service reported an error";

/// Normalize a raw payload for `requested_ticker`.
pub fn normalize(raw: &Value, requested_ticker: &str) -> PredictionResult<Analysis> {
    if raw.is_null() {
        return Err(PredictionError::InvalidResponse(EMPTY_PAYLOAD.to_string()));
    }

    let empty = Map::new();
    let fields = raw.as_object().unwrap_or(&empty);

    if let Some(error) = fields.get("error").filter(|v| is_truthy(v)) {
        let text = error
            .as_str()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(GENERIC_ERROR);
        return Err(PredictionError::InvalidResponse(text.to_string()));
    }

    let ticker = lookup(fields, TICKER_KEYS)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| requested_ticker.trim())
        .to_uppercase();

    let action = match lookup(fields, ACTION_KEYS) {
        Some(value) => value.as_str().and_then(Action::from_literal).unwrap_or_else(|| {
            tracing::debug!(%ticker, raw_action = %value, "Unrecognized action, defaulting to HOLD");
            Action::Hold
        }),
        None => Action::Hold,
    };

    let prediction_value = coerce_number(lookup(fields, PREDICTION_KEYS)).unwrap_or(DEFAULT_PREDICTION);

    let message = lookup(fields, MESSAGE_KEYS)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let history = normalize_history(fields.get("history"));
    let metrics = normalize_metrics(fields.get("metrics"));

    Ok(Analysis {
        ticker,
        action,
        prediction_value,
        message,
        history,
        metrics,
    })
}

fn normalize_history(value: Option<&Value>) -> Vec<HistoryPoint> {
    let Some(entries) = value.and_then(Value::as_array) else {
        return Vec::new();
    };

    let skip = entries.len().saturating_sub(HISTORY_LIMIT);
    if skip > 0 {
        tracing::debug!(received = entries.len(), dropped = skip, "Truncating history to the most recent entries");
    }

    entries
        .iter()
        .skip(skip)
        .map(|entry| {
            let row = entry.as_object();
            HistoryPoint {
                date: coerce_date(row.and_then(|r| lookup(r, DATE_KEYS))),
                close: coerce_number(row.and_then(|r| lookup(r, CLOSE_KEYS))).unwrap_or(0.0),
            }
        })
        .collect()
}

fn normalize_metrics(value: Option<&Value>) -> Vec<MetricRow> {
    match value {
        Some(Value::Array(rows)) => rows
            .iter()
            .map(|row| metric_row(row.as_object().unwrap_or(&Map::new())))
            .collect(),
        // Schema-constrained generators send a single metrics object.
        Some(Value::Object(row)) => vec![metric_row(row)],
        _ => Vec::new(),
    }
}

fn metric_row(row: &Map<String, Value>) -> MetricRow {
    let number = |keys: &[&str]| coerce_number(lookup(row, keys)).unwrap_or(0.0);

    MetricRow {
        date: coerce_date(lookup(row, DATE_KEYS)),
        open: number(OPEN_KEYS),
        high: number(HIGH_KEYS),
        low: number(LOW_KEYS),
        close: number(CLOSE_KEYS),
        volume: number(VOLUME_KEYS),
        return_1d: passthrough(row, RETURN_1D_KEYS),
        ma_7: passthrough(row, MA_7_KEYS),
        ma_21: passthrough(row, MA_21_KEYS),
        rsi: passthrough(row, RSI_KEYS),
        volatility: passthrough(row, VOLATILITY_KEYS),
        next_return: passthrough(row, NEXT_RETURN_KEYS),
        target: passthrough(row, TARGET_KEYS),
        ticker_code: passthrough(row, TICKER_CODE_KEYS),
    }
}

/// First alias holding a non-null value.
fn lookup<'a>(fields: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| fields.get(*key))
        .find(|value| !value.is_null())
}

/// First alias present by key, copied verbatim (null included).
fn passthrough(fields: &Map<String, Value>, keys: &[&str]) -> Option<Value> {
    keys.iter().find_map(|key| fields.get(*key)).cloned()
}

fn coerce_number(value: Option<&Value>) -> Option<f64> {
    let number = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|n| n.is_finite())
}

fn coerce_date(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |v| v != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
