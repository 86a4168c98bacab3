//! Error types for backend requests

use thiserror::Error;

/// Every client operation fails with this single error kind
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Request to {endpoint} failed: {cause}")]
    RequestFailed {
        endpoint: String,
        #[source]
        cause: RequestFailure,
    },
}

impl ClientError {
    pub(crate) fn failed(endpoint: impl Into<String>, cause: impl Into<RequestFailure>) -> Self {
        ClientError::RequestFailed {
            endpoint: endpoint.into(),
            cause: cause.into(),
        }
    }

    /// Endpoint the failing request was sent to
    pub fn endpoint(&self) -> &str {
        match self {
            ClientError::RequestFailed { endpoint, .. } => endpoint,
        }
    }

    pub fn cause(&self) -> &RequestFailure {
        match self {
            ClientError::RequestFailed { cause, .. } => cause,
        }
    }
}

/// Why a request failed
#[derive(Error, Debug)]
pub enum RequestFailure {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Server responded with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Response is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Unexpected response shape: {0}")]
    Shape(String),
}

pub type ClientResult<T> = Result<T, ClientError>;
