use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Maximum number of history points kept after normalization.
pub const HISTORY_LIMIT: usize = 30;

/// Canonical trading recommendation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Buy,
    #[default]
    Hold,
    Sell,
}

impl Action {
    /// Strict literal match against the canonical upper-case spellings.
    /// `"buy"`, `"Buy"` or synonyms are not recognized.
    pub fn from_literal(value: &str) -> Option<Self> {
        match value {
            "BUY" => Some(Action::Buy),
            "HOLD" => Some(Action::Hold),
            "SELL" => Some(Action::Sell),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Buy => "BUY",
            Action::Hold => "HOLD",
            Action::Sell => "SELL",
        }
    }

    /// Class code used by the prediction backend (SELL=0, HOLD=1, BUY=2).
    pub fn class_code(&self) -> f64 {
        match self {
            Action::Sell => 0.0,
            Action::Hold => 1.0,
            Action::Buy => 2.0,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One (date, closing price) sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    pub date: String,
    pub close: f64,
}

/// One day of OHLCV data plus optional derived indicators.
///
/// Indicator fields keep whatever JSON value the upstream sent. `None` means the
/// key was absent upstream; `Some(Value::Null)` means it was present as null.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricRow {
    pub date: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "present")]
    pub return_1d: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "present")]
    pub ma_7: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "present")]
    pub ma_21: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "present")]
    pub rsi: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "present")]
    pub volatility: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "present")]
    pub next_return: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "present")]
    pub target: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "present")]
    pub ticker_code: Option<Value>,
}

/// Keeps an explicit `null` as `Some(Value::Null)` instead of collapsing it to `None`.
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl MetricRow {
    /// Present indicator fields in declaration order, for display.
    pub fn indicators(&self) -> Vec<(&'static str, &Value)> {
        [
            ("return_1d", &self.return_1d),
            ("ma_7", &self.ma_7),
            ("ma_21", &self.ma_21),
            ("rsi", &self.rsi),
            ("volatility", &self.volatility),
            ("next_return", &self.next_return),
            ("target", &self.target),
            ("ticker_code", &self.ticker_code),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.as_ref().map(|v| (name, v)))
        .collect()
    }
}

/// Normalized result of one ticker query.
///
/// Serializes with the same field names the normalizer accepts, so feeding the
/// JSON form back through `normalize` yields an identical record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub ticker: String,
    pub action: Action,
    #[serde(rename = "prediction")]
    pub prediction_value: f64,
    pub message: String,
    pub history: Vec<HistoryPoint>,
    pub metrics: Vec<MetricRow>,
}

impl Analysis {
    /// (label, value) pairs for the price chart, oldest first.
    pub fn chart_series(&self) -> Vec<(String, f64)> {
        self.history
            .iter()
            .map(|point| (point.date.clone(), point.close))
            .collect()
    }

    /// Row shown in the metrics panel.
    pub fn latest_metrics(&self) -> Option<&MetricRow> {
        self.metrics.last()
    }

    /// Relative change between the first and last close in the history window.
    pub fn price_change(&self) -> Option<f64> {
        if self.history.len() < 2 {
            return None;
        }
        let first = self.history.first()?.close;
        let last = self.history.last()?.close;
        crate::stats::simple_return(first, last)
    }
}
