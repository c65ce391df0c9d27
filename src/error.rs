//! Error types for each stage of the pipeline.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Failures talking to an AWS endpoint, below any service-specific meaning.
#[derive(Debug, Error)]
pub enum AwsError {
    #[error("missing AWS credentials: {0} is not set")]
    MissingCredentials(&'static str),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Anything that stops the generator from producing text.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("generation request failed: {0}")]
    Request(#[from] AwsError),

    #[error("generation service returned {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("failed to parse generation response: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("generation response is missing the `{0}` field")]
    MissingField(&'static str),
}

/// Failures writing an artifact to the blob store.
#[derive(Debug, Error)]
pub enum PublishError {
    /// The store understood the request and refused it.
    #[error("store client error {code} ({status}): {message}")]
    Client {
        status: u16,
        code: String,
        message: String,
    },

    #[error("unexpected store error: {0}")]
    Unexpected(String),
}

impl From<AwsError> for PublishError {
    fn from(err: AwsError) -> Self {
        PublishError::Unexpected(err.to_string())
    }
}

impl From<std::io::Error> for PublishError {
    fn from(err: std::io::Error) -> Self {
        PublishError::Unexpected(err.to_string())
    }
}

/// Inbound request problems. The only failure that reaches the caller.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("malformed request: {0}")]
    MalformedRequest(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
