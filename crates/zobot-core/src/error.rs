use thiserror::Error;

/// Top-level error type for the Zobot system.
///
/// Subsystem crates define their own error types and convert into
/// `ZobotError` where they cross into the composition root.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ZobotError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Journal error: {0}")]
    Journal(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for ZobotError {
    fn from(err: toml::de::Error) -> Self {
        ZobotError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for ZobotError {
    fn from(err: toml::ser::Error) -> Self {
        ZobotError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for ZobotError {
    fn from(err: serde_json::Error) -> Self {
        ZobotError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Zobot operations.
pub type Result<T> = std::result::Result<T, ZobotError>;
