use std::time::Duration;

use thiserror::Error;

use super::types::SiteId;

/// Failures that a check recovers from locally. They end up as the
/// `error_message` of an uptime record or the `error` of a degraded SEO record.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("request timed out after {:.2}s", .elapsed.as_secs_f64())]
    FetchTimeout { elapsed: Duration },
    #[error("network error: {0}")]
    FetchNetworkError(String),
    #[error("could not parse document: {0}")]
    ParseFailed(String),
}

/// Failures reported to the caller of a check.
#[derive(Error, Debug)]
pub enum CheckError {
    #[error("site {0} not found")]
    SiteNotFound(SiteId),
    #[error("site {0} is inactive")]
    SiteInactive(SiteId),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0}")]
    Invalid(String),
    #[error("sites file {path}: {source}")]
    SitesIo {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("sites file {path}: {message}")]
    SitesFormat { path: String, message: String },
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl From<String> for ConfigError {
    fn from(s: String) -> Self {
        ConfigError::Invalid(s)
    }
}

impl From<&str> for ConfigError {
    fn from(s: &str) -> Self {
        ConfigError::Invalid(s.to_owned())
    }
}

/// Anything that stops a command of the binary.
#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Check(#[from] CheckError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}
