use std::cell::Cell;
use std::sync::Arc;

use prediction_core::{normalize, PredictionError, PredictionSource};
use tokio::sync::watch;

use crate::state::RequestState;

/// Shown when a failure carries no text of its own.
pub const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong while fetching the prediction.";

/// How a submitted query ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Blank input; nothing was sent and the state is untouched.
    Ignored,
    /// The result became the current state.
    Applied,
    /// A newer query was submitted while this one was in flight.
    Superseded,
}

/// Drives one prediction lookup at a time and publishes its state.
///
/// Every submission takes a fresh generation token. A response is applied
/// only if its token is still the latest when it arrives, so a slow answer
/// for an earlier ticker never overwrites a newer query.
///
/// The controller is meant to live on a single thread (`LocalSet` or a
/// plain `join!`); observers on any thread read the state through
/// [`RequestController::subscribe`].
pub struct RequestController {
    source: Arc<dyn PredictionSource>,
    state: watch::Sender<RequestState>,
    generation: Cell<u64>,
}

impl RequestController {
    pub fn new(source: Arc<dyn PredictionSource>) -> Self {
        let (state, _) = watch::channel(RequestState::Idle);
        Self {
            source,
            state,
            generation: Cell::new(0),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<RequestState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> RequestState {
        self.state.borrow().clone()
    }

    pub async fn submit_query(&self, ticker_text: &str) -> SubmitOutcome {
        let ticker = ticker_text.trim().to_uppercase();
        if ticker.is_empty() {
            tracing::debug!("Ignoring blank query");
            return SubmitOutcome::Ignored;
        }

        let token = self.generation.get() + 1;
        self.generation.set(token);
        self.state.send_replace(RequestState::Loading);
        tracing::info!(%ticker, token, backend = self.source.backend_name(), "Fetching prediction");

        let result = self
            .source
            .fetch(&ticker)
            .await
            .and_then(|raw| normalize(&raw, &ticker));

        if self.generation.get() != token {
            tracing::debug!(%ticker, token, latest = self.generation.get(), "Discarding stale result");
            return SubmitOutcome::Superseded;
        }

        let next = match result {
            Ok(analysis) => {
                tracing::info!(ticker = %analysis.ticker, action = %analysis.action, "Prediction ready");
                RequestState::Success(analysis)
            }
            Err(e) => {
                tracing::warn!(%ticker, error = %e, "Prediction failed");
                RequestState::Failure(failure_text(&e))
            }
        };
        self.state.send_replace(next);
        SubmitOutcome::Applied
    }
}

fn failure_text(err: &PredictionError) -> String {
    let message = err.message().trim();
    if message.is_empty() {
        GENERIC_FAILURE_MESSAGE.to_string()
    } else {
        message.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use prediction_core::{Action, PredictionResult};
    use serde_json::{json, Value};
    use tokio::sync::oneshot;

    enum Reply {
        Ready(PredictionResult<Value>),
        Gated(oneshot::Receiver<PredictionResult<Value>>),
    }

    /// Answers from a script; gated replies wait until the test releases them.
    #[derive(Default)]
    struct ScriptedSource {
        replies: Mutex<HashMap<String, Reply>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedSource {
        fn ready(self, ticker: &str, reply: PredictionResult<Value>) -> Self {
            self.replies.lock().unwrap().insert(ticker.to_string(), Reply::Ready(reply));
            self
        }

        fn gated(self, ticker: &str) -> (Self, oneshot::Sender<PredictionResult<Value>>) {
            let (tx, rx) = oneshot::channel();
            self.replies.lock().unwrap().insert(ticker.to_string(), Reply::Gated(rx));
            (self, tx)
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        async fn wait_for_call(&self, ticker: &str) {
            while !self.calls().iter().any(|t| t == ticker) {
                tokio::task::yield_now().await;
            }
        }
    }

    #[async_trait]
    impl PredictionSource for ScriptedSource {
        async fn fetch(&self, ticker: &str) -> PredictionResult<Value> {
            self.calls.lock().unwrap().push(ticker.to_string());
            let reply = self.replies.lock().unwrap().remove(ticker);
            match reply {
                Some(Reply::Ready(result)) => result,
                Some(Reply::Gated(rx)) => rx
                    .await
                    .unwrap_or_else(|_| Err(PredictionError::Transport("reply dropped".into()))),
                None => Err(PredictionError::Transport(format!("no script for {ticker}"))),
            }
        }

        fn backend_name(&self) -> &'static str {
            "scripted"
        }
    }

    fn controller_for(source: &Arc<ScriptedSource>) -> RequestController {
        RequestController::new(source.clone())
    }

    #[tokio::test]
    async fn test_success_applies_normalized_analysis() {
        let source = Arc::new(ScriptedSource::default().ready(
            "AAPL",
            Ok(json!({
                "ticker": "aapl",
                "action": "BUY",
                "prediction": 2,
                "message": "Uptrend",
                "history": [{"date": "2025-01-02", "close": 190.5}]
            })),
        ));
        let controller = controller_for(&source);
        assert_eq!(controller.snapshot(), RequestState::Idle);

        let outcome = controller.submit_query("  aapl ").await;

        assert_eq!(outcome, SubmitOutcome::Applied);
        assert_eq!(source.calls(), vec!["AAPL"]);
        let state = controller.snapshot();
        let analysis = state.analysis().unwrap();
        assert_eq!(analysis.ticker, "AAPL");
        assert_eq!(analysis.action, Action::Buy);
        assert_eq!(analysis.history.len(), 1);
    }

    #[tokio::test]
    async fn test_blank_query_is_ignored() {
        let source = Arc::new(ScriptedSource::default().ready("MSFT", Ok(json!({"action": "HOLD"}))));
        let controller = controller_for(&source);
        controller.submit_query("msft").await;
        let before = controller.snapshot();

        assert_eq!(controller.submit_query("   ").await, SubmitOutcome::Ignored);
        assert_eq!(controller.submit_query("").await, SubmitOutcome::Ignored);

        assert_eq!(controller.snapshot(), before);
        assert_eq!(source.calls(), vec!["MSFT"]);
    }

    #[tokio::test]
    async fn test_error_payload_becomes_failure() {
        let source = Arc::new(
            ScriptedSource::default().ready("ZZZZ", Ok(json!({"error": "ticker not found"}))),
        );
        let controller = controller_for(&source);

        assert_eq!(controller.submit_query("zzzz").await, SubmitOutcome::Applied);
        assert_eq!(controller.snapshot(), RequestState::Failure("ticker not found".into()));
    }

    #[tokio::test]
    async fn test_transport_error_becomes_failure() {
        let source = Arc::new(ScriptedSource::default().ready(
            "AAPL",
            Err(PredictionError::Transport("HTTP 503".into())),
        ));
        let controller = controller_for(&source);

        controller.submit_query("AAPL").await;
        assert_eq!(controller.snapshot().failure_message(), Some("HTTP 503"));
    }

    #[tokio::test]
    async fn test_blank_error_text_uses_generic_message() {
        let source = Arc::new(
            ScriptedSource::default().ready("AAPL", Err(PredictionError::Transport("  ".into()))),
        );
        let controller = controller_for(&source);

        controller.submit_query("AAPL").await;
        assert_eq!(controller.snapshot().failure_message(), Some(GENERIC_FAILURE_MESSAGE));
    }

    #[tokio::test]
    async fn test_loading_replaces_previous_failure() {
        let (source, release) = ScriptedSource::default()
            .ready("BAD", Ok(json!({"error": "unknown ticker"})))
            .gated("GOOD");
        let source = Arc::new(source);
        let controller = controller_for(&source);

        controller.submit_query("bad").await;
        assert!(controller.snapshot().failure_message().is_some());

        let mut observer = controller.subscribe();
        let (outcome, ()) = tokio::join!(controller.submit_query("good"), async {
            source.wait_for_call("GOOD").await;
            assert!(observer.borrow_and_update().is_loading());
            release.send(Ok(json!({"ticker": "GOOD", "action": "SELL"}))).unwrap();
        });

        assert_eq!(outcome, SubmitOutcome::Applied);
        let state = controller.snapshot();
        assert_eq!(state.analysis().unwrap().action, Action::Sell);
        assert!(state.failure_message().is_none());
    }

    #[tokio::test]
    async fn test_late_response_for_older_query_is_discarded() {
        let (source, release_a) = ScriptedSource::default().gated("AAA");
        let (source, release_b) = source.gated("BBB");
        let source = Arc::new(source);
        let controller = controller_for(&source);
        let mut observer = controller.subscribe();

        let (outcome_a, outcome_b, ()) = tokio::join!(
            controller.submit_query("aaa"),
            async {
                source.wait_for_call("AAA").await;
                controller.submit_query("bbb").await
            },
            async {
                source.wait_for_call("BBB").await;
                release_b.send(Ok(json!({"ticker": "BBB", "action": "SELL"}))).unwrap();
                observer.wait_for(|s| s.analysis().is_some()).await.unwrap();
                release_a.send(Ok(json!({"ticker": "AAA", "action": "BUY"}))).unwrap();
            },
        );

        assert_eq!(outcome_a, SubmitOutcome::Superseded);
        assert_eq!(outcome_b, SubmitOutcome::Applied);
        let state = controller.snapshot();
        let analysis = state.analysis().unwrap();
        assert_eq!(analysis.ticker, "BBB");
        assert_eq!(analysis.action, Action::Sell);
    }

    #[tokio::test]
    async fn test_early_stale_response_keeps_loading() {
        let (source, release_a) = ScriptedSource::default().gated("AAA");
        let (source, release_b) = source.gated("BBB");
        let source = Arc::new(source);
        let controller = controller_for(&source);

        let (outcome_a, outcome_b, ()) = tokio::join!(
            controller.submit_query("aaa"),
            async {
                source.wait_for_call("AAA").await;
                controller.submit_query("bbb").await
            },
            async {
                source.wait_for_call("BBB").await;
                release_a.send(Err(PredictionError::Transport("HTTP 500".into()))).unwrap();
                for _ in 0..4 {
                    tokio::task::yield_now().await;
                }
                assert!(controller.snapshot().is_loading());
                release_b.send(Ok(json!({"ticker": "BBB", "action": "HOLD"}))).unwrap();
            },
        );

        assert_eq!(outcome_a, SubmitOutcome::Superseded);
        assert_eq!(outcome_b, SubmitOutcome::Applied);
        assert_eq!(controller.snapshot().analysis().unwrap().ticker, "BBB");
    }
}
