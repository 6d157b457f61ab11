//! Error types for the external service boundaries.
//!
//! Both the feed service and the geocoder fail the same ways: the request
//! never completes, the service answers with a non-success status, or the
//! body does not have the contracted shape. Callers recover from all of
//! them locally, so the variants mostly exist to make the logs precise.

use reqwest::StatusCode;

/// Failure of a single request to the feed service or the geocoder.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected status {0}")]
    Status(StatusCode),
    #[error("malformed response: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid endpoint: {0}")]
    Endpoint(#[from] url::ParseError),
}

/// Failure while loading the YAML configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}

/// A user command line that could not be understood.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command: {0}")]
    Unknown(String),
    #[error("{0} needs an argument")]
    Missing(&'static str),
    #[error("invalid argument: {0}")]
    Invalid(String),
}
