pub mod config;
pub mod error;
pub mod generative;
pub mod http;
pub mod simulated;
pub mod source;

pub use config::{ClientConfig, GenerativeConfig, SourceKind};
pub use error::{ConfigError, ConfigResult};
pub use generative::GenerativePredictionSource;
pub use http::HttpPredictionSource;
pub use simulated::SimulatedPredictionSource;
pub use source::build_source;
