use crate::{data::HttpMethod, session::ScenarioState};
use std::error::Error as StdError;
use thiserror::Error;

pub type BoxError = Box<dyn StdError + Send + Sync>;

/// A request that never produced a response: connection refused, DNS failure or timeout.
#[derive(Debug, Error)]
#[error("{method} {endpoint} failed after {attempts} attempt(s): {source}")]
pub struct TransportError {
    method: HttpMethod,
    endpoint: String,
    attempts: u32,
    #[source]
    source: BoxError,
}

impl TransportError {
    pub fn new<S: Into<String>, E: Into<BoxError>>(method: HttpMethod, endpoint: S, source: E) -> Self {
        Self {
            method,
            endpoint: endpoint.into(),
            attempts: 1,
            source: source.into(),
        }
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("no usable token for user {username}: {reason}")]
    Credential {
        username: String,
        registration_status: u16,
        login_status: Option<u16>,
        reason: String,
    },
    #[error("could not resolve an order number for product {product_name} (status {status}): {reason}")]
    OrderResolution {
        product_name: String,
        status: u16,
        reason: String,
    },
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("Invalid header name")]
    InvalidHeaderName,
    #[error("Invalid header value")]
    InvalidHeaderValue,
    #[error("failed to build the http client: {0}")]
    ClientBuild(#[from] reqwest::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("scenario cannot move from {from:?} to {to:?}")]
    InvalidScenarioTransition {
        from: ScenarioState,
        to: ScenarioState,
    },
}

impl From<reqwest::header::InvalidHeaderName> for Error {
    fn from(_: reqwest::header::InvalidHeaderName) -> Self {
        Error::InvalidHeaderName
    }
}

impl From<reqwest::header::InvalidHeaderValue> for Error {
    fn from(_: reqwest::header::InvalidHeaderValue) -> Self {
        Error::InvalidHeaderValue
    }
}
