use async_trait::async_trait;
use serde_json::Value;

use crate::PredictionResult;

/// Remote source of raw prediction payloads.
///
/// Implemented by the HTTP endpoint client, the schema-constrained generative
/// client and the offline simulator. One call issues exactly one upstream
/// request; retries and caching are the caller's concern.
#[async_trait]
pub trait PredictionSource: Send + Sync {
    /// Fetch the raw payload for an already trimmed, upper-cased ticker.
    async fn fetch(&self, ticker: &str) -> PredictionResult<Value>;

    fn backend_name(&self) -> &'static str;
}
