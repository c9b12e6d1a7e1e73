use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Unknown prediction source: {0} (expected http, generative or simulated)")]
    UnknownSource(String),

    #[error("Missing setting: {0}")]
    MissingSetting(&'static str),

    #[error("Invalid value for {name}: {value}")]
    InvalidSetting { name: &'static str, value: String },

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;
