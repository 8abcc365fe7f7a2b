use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{debug, warn};

use super::config::FetchConfig;
use super::error::{AnalysisError, ConfigError};

/// Result of one GET. Transport failures are values, not errors.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Success {
        status_code: u16,
        elapsed: Duration,
        body: Vec<u8>,
    },
    Timeout {
        elapsed: Duration,
    },
    NetworkError {
        message: String,
        elapsed: Duration,
    },
}

impl FetchOutcome {
    pub fn elapsed(&self) -> Duration {
        match self {
            FetchOutcome::Success { elapsed, .. }
            | FetchOutcome::Timeout { elapsed }
            | FetchOutcome::NetworkError { elapsed, .. } => *elapsed,
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            FetchOutcome::Success { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<AnalysisError> {
        match self {
            FetchOutcome::Success { .. } => None,
            FetchOutcome::Timeout { elapsed } => {
                Some(AnalysisError::FetchTimeout { elapsed: *elapsed })
            }
            FetchOutcome::NetworkError { message, .. } => {
                Some(AnalysisError::FetchNetworkError(message.clone()))
            }
        }
    }
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> FetchOutcome;
}

pub struct HttpFetcher {
    client: reqwest::Client,
    timeout: Duration,
    max_body_bytes: usize,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, ConfigError> {
        if config.accept_invalid_certs {
            warn!("TLS certificate verification is disabled");
        }

        let timeout = config.timeout();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .user_agent(config.user_agent())
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()?;

        Ok(Self {
            client,
            timeout,
            max_body_bytes: config.max_body_bytes.max(1),
        })
    }

    async fn fetch_inner(&self, url: &str, started: Instant) -> FetchOutcome {
        let mut response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(err) => return transport_failure(err, started),
        };
        let status_code = response.status().as_u16();

        let mut body = Vec::new();
        loop {
            match response.chunk().await {
                Ok(Some(chunk)) => {
                    let room = self.max_body_bytes.saturating_sub(body.len());
                    body.extend_from_slice(&chunk[..chunk.len().min(room)]);
                    if body.len() >= self.max_body_bytes {
                        debug!(url, limit = self.max_body_bytes, "body truncated");
                        break;
                    }
                }
                Ok(None) => break,
                Err(err) => return transport_failure(err, started),
            }
        }

        FetchOutcome::Success {
            status_code,
            elapsed: started.elapsed(),
            body,
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> FetchOutcome {
        let started = Instant::now();
        // The client timeout covers the request; this bounds everything else.
        let deadline = self.timeout + Duration::from_millis(500);
        match tokio::time::timeout(deadline, self.fetch_inner(url, started)).await {
            Ok(outcome) => outcome,
            Err(_) => FetchOutcome::Timeout {
                elapsed: started.elapsed(),
            },
        }
    }
}

fn transport_failure(err: reqwest::Error, started: Instant) -> FetchOutcome {
    let elapsed = started.elapsed();
    if err.is_timeout() {
        FetchOutcome::Timeout { elapsed }
    } else {
        FetchOutcome::NetworkError {
            message: err.to_string(),
            elapsed,
        }
    }
}
