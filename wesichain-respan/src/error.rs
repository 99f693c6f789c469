use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

/// A payload that could not be built or failed validation.
#[derive(Debug, Error, PartialEq)]
pub enum PayloadError {
    #[error("missing required field '{0}'")]
    MissingField(&'static str),
    #[error("invalid field '{field}': {reason}")]
    InvalidField { field: &'static str, reason: String },
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("ingest server error: {status}")]
    Server { status: StatusCode },
    #[error("failed to start delivery worker: {0}")]
    Worker(#[source] std::io::Error),
}

#[derive(Debug, Error)]
pub enum FlushError {
    #[error("flush timed out after {waited:?} with {pending} batches pending")]
    Timeout { waited: Duration, pending: usize },
}
