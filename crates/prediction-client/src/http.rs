use async_trait::async_trait;
use prediction_core::{PredictionError, PredictionResult, PredictionSource};
use serde_json::Value;

use crate::error::{ConfigError, ConfigResult};

const BODY_SNIPPET_LIMIT: usize = 200;

/// Client for the prediction backend's `GET /predict/{ticker}` endpoint.
#[derive(Clone)]
pub struct HttpPredictionSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpPredictionSource {
    pub fn new(base_url: impl Into<String>) -> ConfigResult<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    pub fn predict_url(&self, ticker: &str) -> String {
        format!(
            "{}/predict/{}",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(ticker)
        )
    }
}

#[async_trait]
impl PredictionSource for HttpPredictionSource {
    async fn fetch(&self, ticker: &str) -> PredictionResult<Value> {
        if ticker.trim().is_empty() {
            return Err(PredictionError::EmptyInput);
        }
        let url = self.predict_url(ticker);
        tracing::debug!(%url, "Requesting prediction");

        let response = self.client.get(&url).send().await.map_err(send_error)?;
        let body = response_text(response).await?;

        tracing::debug!(%ticker, bytes = body.len(), "Prediction response received");
        parse_body(&body)
    }

    fn backend_name(&self) -> &'static str {
        "http"
    }
}

/// Transport error for a failed send. The URL is dropped from the text since
/// it may carry credentials.
pub(crate) fn send_error(err: reqwest::Error) -> PredictionError {
    PredictionError::Transport(format!("request failed: {}", err.without_url()))
}

/// Body of a 2xx response; any other status becomes a `Transport` error that
/// keeps the status code even when the body cannot be read.
pub(crate) async fn response_text(response: reqwest::Response) -> PredictionResult<String> {
    let status = response.status();
    let code = status.as_u16();
    match response.text().await {
        Ok(body) if status.is_success() => Ok(body),
        Ok(body) => {
            tracing::warn!(status = code, "Prediction endpoint returned an error status");
            Err(PredictionError::Transport(status_message(code, &body)))
        }
        Err(e) if status.is_success() => Err(PredictionError::Transport(format!(
            "failed to read response body: {}",
            e.without_url()
        ))),
        Err(_) => {
            tracing::warn!(status = code, "Prediction endpoint returned an error status");
            Err(PredictionError::Transport(status_message(code, "")))
        }
    }
}

/// `HTTP {code}` plus a trimmed snippet of the body when there is one.
pub(crate) fn status_message(code: u16, body: &str) -> String {
    let snippet: String = body.trim().chars().take(BODY_SNIPPET_LIMIT).collect();
    if snippet.is_empty() {
        format!("HTTP {code}")
    } else {
        format!("HTTP {code}: {snippet}")
    }
}

pub(crate) fn parse_body(body: &str) -> PredictionResult<Value> {
    if body.trim().is_empty() {
        return Err(PredictionError::InvalidResponse("empty response body".to_string()));
    }
    serde_json::from_str(body)
        .map_err(|e| PredictionError::InvalidResponse(format!("malformed JSON: {e}")))
}
