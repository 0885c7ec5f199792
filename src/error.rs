//! Folio error types

use std::time::Duration;

use crate::endpoint::EndpointType;

/// Folio error types
#[derive(Debug, thiserror::Error)]
pub enum FolioError {
    // Transport errors
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    // Payload errors
    #[error("empty payload for {0}")]
    EmptyPayload(EndpointType),

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // Configuration errors
    /// Endpoint has no entry in the service's [`EndpointRegistry`](crate::EndpointRegistry).
    ///
    /// Indicates a programming defect; never retried and never masked by a fallback.
    #[error("no request config registered for endpoint {0}")]
    UnknownEndpoint(EndpointType),

    #[error("configuration error: {0}")]
    Configuration(String),

    // Lead capture errors
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl FolioError {
    /// Whether this error is worth retrying.
    ///
    /// Connectivity loss, timeouts and 5xx (or status 0) responses are
    /// transient. Client errors and payload problems are permanent.
    pub fn is_transient(&self) -> bool {
        match self {
            FolioError::Http(_) | FolioError::Timeout(_) => true,
            FolioError::Api { status, .. } => *status >= 500 || *status == 0,
            _ => false,
        }
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            FolioError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for FolioError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FolioError::Timeout(Duration::ZERO)
        } else if let Some(status) = err.status() {
            FolioError::Api {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else if err.is_decode() {
            FolioError::InvalidPayload(err.to_string())
        } else {
            FolioError::Http(err.to_string())
        }
    }
}

/// Result type alias for Folio operations
pub type Result<T> = std::result::Result<T, FolioError>;
