mod app_config;
mod config;
pub mod credentials;
pub mod mention;
pub mod region;

use thiserror::Error;

pub use app_config::{AppConfig, Environment, SourceCredentials};
pub use config::{load_app_config, load_app_config_from_env};
pub use credentials::{configuration_guide, validate_api_key, Readiness, SetupGuide};
pub use mention::{
    Classification, ClassificationMethod, CollectedMention, Engagement, Mention, SentimentLabel,
    SourceKind,
};
pub use region::{load_region, load_region_or_default, RegionProfile};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read region file {path}: {source}")]
    RegionFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse region file: {0}")]
    RegionFileParse(#[from] serde_yaml::Error),

    #[error("region validation failed: {0}")]
    Validation(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("unknown source: {0}")]
    UnknownSource(String),

    #[error("unknown sentiment label: {0}")]
    UnknownSentiment(String),

    #[error("unknown classification method: {0}")]
    UnknownMethod(String),

    #[error("location must be non-empty")]
    EmptyLocation,
}
