//! Console error types

use compliance_client::ClientError;
use thiserror::Error;

/// Input problems caught before any request is sent
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please choose a file to upload")]
    MissingFile,

    #[error("Select a document first")]
    NoDocumentSelected,

    #[error("Rule value cannot be empty")]
    EmptyRuleValue,

    #[error("Query cannot be empty")]
    EmptyQuery,
}

#[derive(Error, Debug)]
pub enum ConsoleError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Failed to {action}: {source}")]
    RequestFailed {
        action: &'static str,
        #[source]
        source: ClientError,
    },
}

impl ConsoleError {
    pub fn is_validation(&self) -> bool {
        matches!(self, ConsoleError::Validation(_))
    }
}

pub type ConsoleResult<T> = Result<T, ConsoleError>;
