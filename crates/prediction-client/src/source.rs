use std::sync::Arc;

use prediction_core::PredictionSource;

use crate::config::{ClientConfig, SourceKind};
use crate::error::{ConfigError, ConfigResult};
use crate::{GenerativePredictionSource, HttpPredictionSource, SimulatedPredictionSource};

/// Pick the single backend this deployment talks to.
pub fn build_source(config: &ClientConfig) -> ConfigResult<Arc<dyn PredictionSource>> {
    let source: Arc<dyn PredictionSource> = match config.source {
        SourceKind::Http => {
            if config.api_base.is_empty() {
                tracing::warn!("API_BASE_URL is empty; requests resolve against the same origin");
            }
            Arc::new(HttpPredictionSource::new(config.api_base.clone())?)
        }
        SourceKind::Generative => {
            let generative = config
                .generative
                .clone()
                .ok_or(ConfigError::MissingSetting("GEMINI_API_KEY"))?;
            Arc::new(GenerativePredictionSource::new(generative)?)
        }
        SourceKind::Simulated => Arc::new(SimulatedPredictionSource::new(config.simulation_seed)),
    };

    tracing::info!(backend = source.backend_name(), "Prediction source ready");
    Ok(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GenerativeConfig;

    #[test]
    fn test_build_each_backend() {
        let http = build_source(&ClientConfig::default()).unwrap();
        assert_eq!(http.backend_name(), "http");

        let simulated = build_source(&ClientConfig {
            source: SourceKind::Simulated,
            simulation_seed: Some(1),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(simulated.backend_name(), "simulated");

        let generative = build_source(&ClientConfig {
            source: SourceKind::Generative,
            generative: Some(GenerativeConfig {
                api_key: "k".to_string(),
                model: "m".to_string(),
                base_url: "http://localhost".to_string(),
            }),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(generative.backend_name(), "generative");
    }

    #[test]
    fn test_generative_without_settings_fails() {
        let result = build_source(&ClientConfig {
            source: SourceKind::Generative,
            ..Default::default()
        });
        assert!(matches!(result, Err(ConfigError::MissingSetting("GEMINI_API_KEY"))));
    }
}
