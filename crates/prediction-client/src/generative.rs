use async_trait::async_trait;
use prediction_core::{PredictionError, PredictionResult, PredictionSource};
use serde_json::{json, Value};

use crate::config::GenerativeConfig;
use crate::error::{ConfigError, ConfigResult};
use crate::http::{parse_body, response_text, send_error};

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Prediction source backed by a schema-constrained Gemini `generateContent` call.
#[derive(Clone)]
pub struct GenerativePredictionSource {
    client: reqwest::Client,
    config: GenerativeConfig,
}

impl GenerativePredictionSource {
    pub fn new(config: GenerativeConfig) -> ConfigResult<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: reqwest::Client, config: GenerativeConfig) -> Self {
        Self { client, config }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }
}

#[async_trait]
impl PredictionSource for GenerativePredictionSource {
    async fn fetch(&self, ticker: &str) -> PredictionResult<Value> {
        if ticker.trim().is_empty() {
            return Err(PredictionError::EmptyInput);
        }
        tracing::debug!(%ticker, model = %self.config.model, "Requesting generated prediction");

        let response = self
            .client
            .post(self.endpoint())
            .header(API_KEY_HEADER, self.config.api_key.as_str())
            .json(&request_body(ticker))
            .send()
            .await
            .map_err(send_error)?;
        let body = response_text(response).await?;

        extract_candidate_json(&parse_body(&body)?)
    }

    fn backend_name(&self) -> &'static str {
        "generative"
    }
}

fn prompt(ticker: &str) -> String {
    format!(
        "Act as a quantitative equity analyst. For the stock ticker {ticker}, produce a trading \
         recommendation (BUY, HOLD or SELL), a numeric confidence score, a short reasoning, \
         current technical indicators and the last 30 daily closing prices. Respond only with JSON \
         matching the provided schema."
    )
}

fn request_body(ticker: &str) -> Value {
    json!({
        "contents": [{
            "role": "user",
            "parts": [{ "text": prompt(ticker) }]
        }],
        "generationConfig": {
            "temperature": 0.2,
            "responseMimeType": "application/json",
            "responseSchema": response_schema()
        }
    })
}

/// Output schema: same fields the normalizer accepts from the backend.
pub fn response_schema() -> Value {
    let number = json!({ "type": "NUMBER" });
    json!({
        "type": "OBJECT",
        "properties": {
            "ticker": { "type": "STRING" },
            "recommendation": { "type": "STRING", "enum": ["BUY", "HOLD", "SELL"] },
            "prediction": number,
            "reasoning": { "type": "STRING" },
            "metrics": {
                "type": "OBJECT",
                "properties": {
                    "return_1d": number,
                    "ma_7": number,
                    "ma_21": number,
                    "rsi": number,
                    "volatility": number
                }
            },
            "history": {
                "type": "ARRAY",
                "minItems": 30,
                "maxItems": 30,
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "date": { "type": "STRING" },
                        "price": number
                    },
                    "required": ["date", "price"]
                }
            }
        },
        "required": ["ticker", "recommendation", "prediction", "reasoning", "metrics", "history"]
    })
}

/// Pull the generated JSON document out of a `generateContent` response.
fn extract_candidate_json(response: &Value) -> PredictionResult<Value> {
    if let Some(reason) = response["promptFeedback"]["blockReason"].as_str() {
        return Err(PredictionError::InvalidResponse(format!("request blocked: {reason}")));
    }

    let text = response["candidates"][0]["content"]["parts"][0]["text"]
        .as_str()
        .ok_or_else(|| {
            PredictionError::InvalidResponse("no content in generative response".to_string())
        })?;

    parse_body(strip_code_fence(text))
}

/// Models sometimes wrap JSON in markdown fences despite the mime type.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
