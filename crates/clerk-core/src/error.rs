//! Error types for configuration loading.

use thiserror::Error;

use crate::classify::ClassifyError;

/// Errors that can occur when working with configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to deserialize configuration.
    #[error("invalid configuration: {0}")]
    Deserialize(#[from] Box<figment::Error>),

    /// Configuration parsed but holds out-of-range classifier settings.
    #[error("invalid [classifier] section: {0}")]
    Classifier(#[from] ClassifyError),

    /// Configuration file not found after searching all locations.
    #[error("no configuration file found")]
    NotFound,
}

/// Result type alias using [`ConfigError`].
pub type ConfigResult<T> = Result<T, ConfigError>;
