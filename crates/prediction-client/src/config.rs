use std::str::FromStr;

use crate::error::{ConfigError, ConfigResult};

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Which backend answers ticker queries in this deployment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SourceKind {
    #[default]
    Http,
    Generative,
    Simulated,
}

impl FromStr for SourceKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "http" => Ok(SourceKind::Http),
            "generative" | "gemini" => Ok(SourceKind::Generative),
            "simulated" | "mock" => Ok(SourceKind::Simulated),
            other => Err(ConfigError::UnknownSource(other.to_string())),
        }
    }
}

/// Gemini settings for the generative backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerativeConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

/// Startup configuration, read once and injected into the sources.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientConfig {
    /// Prediction endpoint base. Empty means same-origin.
    pub api_base: String,
    pub source: SourceKind,
    pub generative: Option<GenerativeConfig>,
    pub simulation_seed: Option<u64>,
}

impl ClientConfig {
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup, e.g. a map in tests.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_base = lookup("API_BASE_URL")
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .unwrap_or_default();

        let source = match lookup("PREDICTION_SOURCE") {
            Some(value) => value.parse()?,
            None => SourceKind::default(),
        };

        let api_key = lookup("GEMINI_API_KEY").filter(|k| !k.trim().is_empty());
        let generative = match (source, api_key) {
            (SourceKind::Generative, None) => {
                return Err(ConfigError::MissingSetting("GEMINI_API_KEY"));
            }
            (_, Some(api_key)) => Some(GenerativeConfig {
                api_key,
                model: lookup("GEMINI_MODEL")
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
                base_url: lookup("GEMINI_BASE_URL")
                    .map(|v| v.trim().trim_end_matches('/').to_string())
                    .filter(|v| !v.is_empty())
                    .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
            }),
            (_, None) => None,
        };

        let simulation_seed = match lookup("SIMULATION_SEED") {
            Some(raw) => Some(raw.trim().parse::<u64>().map_err(|_| ConfigError::InvalidSetting {
                name: "SIMULATION_SEED",
                value: raw.clone(),
            })?),
            None => None,
        };

        Ok(Self {
            api_base,
            source,
            generative,
            simulation_seed,
        })
    }
}
