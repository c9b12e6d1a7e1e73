//! Offline prediction source.
//!
//! Generates a plausible payload in the backend's canonical shape: a 30-day
//! random-walk price history, a noisy next-close forecast and a recommendation
//! from a volatility-adjusted threshold rule.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Datelike, Duration, NaiveDate, Utc, Weekday};
use prediction_core::stats::{moving_average, relative_volatility, simple_return};
use prediction_core::{Action, PredictionResult, PredictionSource, HISTORY_LIMIT};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{json, Map, Value};

/// Minimum relative move before the rule leaves HOLD.
pub const DEFAULT_POLICY_THRESHOLD: f64 = 0.01;
/// Trailing window for the volatility estimate (one trading week).
pub const VOLATILITY_WINDOW: usize = 5;

const DAILY_MOVE: f64 = 0.02;
const FORECAST_ERROR: f64 = 0.03;

pub struct SimulatedPredictionSource {
    rng: Mutex<StdRng>,
    policy_threshold: f64,
    as_of: Option<NaiveDate>,
}

impl SimulatedPredictionSource {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng: Mutex::new(rng),
            policy_threshold: DEFAULT_POLICY_THRESHOLD,
            as_of: None,
        }
    }

    pub fn with_policy_threshold(mut self, threshold: f64) -> Self {
        self.policy_threshold = threshold;
        self
    }

    /// Pin the last history date instead of using today.
    pub fn with_as_of(mut self, date: NaiveDate) -> Self {
        self.as_of = Some(date);
        self
    }

    fn generate(&self, ticker: &str) -> Value {
        let as_of = self.as_of.unwrap_or_else(|| Utc::now().date_naive());
        let dates = business_days_ending(as_of, HISTORY_LIMIT);

        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut closes = Vec::with_capacity(dates.len());
        let mut price: f64 = rng.gen_range(20.0..500.0);
        for _ in &dates {
            price *= 1.0 + rng.gen_range(-DAILY_MOVE..DAILY_MOVE);
            closes.push(round2(price));
        }

        let code = ticker_code(ticker);
        let mut history = Vec::with_capacity(dates.len());
        let mut metrics = Vec::with_capacity(dates.len());
        for (i, (date, &close)) in dates.iter().zip(&closes).enumerate() {
            let date = date.format("%Y-%m-%d").to_string();
            let open = if i == 0 { close } else { closes[i - 1] };
            let high = round2(open.max(close) * (1.0 + rng.gen_range(0.0..0.01)));
            let low = round2(open.min(close) * (1.0 - rng.gen_range(0.0..0.01)));
            let volume = rng.gen_range(1_000_000.0_f64..5_000_000.0).round();

            history.push(json!({ "Date": date, "Close": close }));

            let window = &closes[..=i];
            let mut row = Map::new();
            row.insert("Date".into(), json!(date));
            row.insert("Open".into(), json!(open));
            row.insert("High".into(), json!(high));
            row.insert("Low".into(), json!(low));
            row.insert("Close".into(), json!(close));
            row.insert("Volume".into(), json!(volume));
            if let Some(ret) = i.checked_sub(1).and_then(|p| simple_return(closes[p], close)) {
                row.insert("Return_1d".into(), json!(ret));
            }
            if let Some(ma) = moving_average(window, 7) {
                row.insert("MA_7".into(), json!(ma));
            }
            if let Some(ma) = moving_average(window, 21) {
                row.insert("MA_21".into(), json!(ma));
            }
            if window.len() >= VOLATILITY_WINDOW {
                row.insert("Volatility".into(), json!(relative_volatility(window, VOLATILITY_WINDOW)));
            }
            row.insert("Ticker_Code".into(), json!(code));
            metrics.push(Value::Object(row));
        }

        let last = closes.last().copied().unwrap_or_default();
        let predicted = last * (1.0 + rng.gen_range(-FORECAST_ERROR..FORECAST_ERROR));
        drop(rng);

        let delta = simple_return(last, predicted).unwrap_or(0.0);
        let volatility = relative_volatility(&closes, VOLATILITY_WINDOW);
        let threshold = effective_threshold(self.policy_threshold, volatility);
        let action = decide(delta, volatility, self.policy_threshold);

        json!({
            "ticker": ticker,
            "action": action.as_str(),
            "prediction": action.class_code(),
            "message": format!(
                "Forecast close {:.2} vs last {:.2} ({:+.2}%). Volatility {:.2}%, threshold {:.2}%.",
                predicted,
                last,
                delta * 100.0,
                volatility * 100.0,
                threshold * 100.0
            ),
            "history": history,
            "metrics": metrics,
        })
    }
}

#[async_trait]
impl PredictionSource for SimulatedPredictionSource {
    async fn fetch(&self, ticker: &str) -> PredictionResult<Value> {
        let payload = self.generate(ticker);
        tracing::debug!(%ticker, action = %payload["action"], "Generated simulated prediction");
        Ok(payload)
    }

    fn backend_name(&self) -> &'static str {
        "simulated"
    }
}

/// The policy threshold, widened to half the recent volatility.
pub fn effective_threshold(policy_threshold: f64, volatility: f64) -> f64 {
    policy_threshold.max(volatility * 0.5)
}

/// BUY above the effective threshold, SELL below its negative, HOLD in between.
pub fn decide(delta: f64, volatility: f64, policy_threshold: f64) -> Action {
    let threshold = effective_threshold(policy_threshold, volatility);
    if delta > threshold {
        Action::Buy
    } else if delta < -threshold {
        Action::Sell
    } else {
        Action::Hold
    }
}

/// The `count` most recent weekdays up to and including `end`, oldest first.
fn business_days_ending(end: NaiveDate, count: usize) -> Vec<NaiveDate> {
    let mut days = Vec::with_capacity(count);
    let mut day = end;
    while days.len() < count {
        if !matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
            days.push(day);
        }
        day -= Duration::days(1);
    }
    days.reverse();
    days
}

fn ticker_code(ticker: &str) -> u64 {
    ticker
        .bytes()
        .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(u64::from(b)))
        % 10_000
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
