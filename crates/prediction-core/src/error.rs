use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PredictionError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Ticker is empty")]
    EmptyInput,
}

impl PredictionError {
    /// Human-readable text without the category prefix.
    pub fn message(&self) -> &str {
        match self {
            PredictionError::Transport(msg) | PredictionError::InvalidResponse(msg) => msg,
            PredictionError::EmptyInput => "ticker is empty",
        }
    }
}

pub type PredictionResult<T> = Result<T, PredictionError>;
