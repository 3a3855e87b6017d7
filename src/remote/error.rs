//! # Remote Errors
//!
//! Failure classes surfaced by the control plane client.

use thiserror::Error;

/// Error returned by every [`ControlPlane`](super::ControlPlane) call
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    /// The addressed object does not exist
    #[error("not found: {0}")]
    NotFound(String),
    /// Worth retrying: throttling, server errors, transport failures
    #[error("transient control plane error: {0}")]
    Transient(String),
    /// Malformed or conflicting request; retrying will not help
    #[error("fatal control plane error: {0}")]
    Fatal(String),
}

impl RemoteError {
    /// Classify an HTTP error status
    ///
    /// 404 is NotFound, 400/409/422 are Fatal, everything else is Transient.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            404 => RemoteError::NotFound(message),
            400 | 409 | 422 => RemoteError::Fatal(format!("HTTP {status}: {message}")),
            _ => RemoteError::Transient(format!("HTTP {status}: {message}")),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RemoteError::NotFound(_))
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, RemoteError::Fatal(_))
    }

    /// Short label for metrics and logs
    pub fn class(&self) -> &'static str {
        match self {
            RemoteError::NotFound(_) => "not_found",
            RemoteError::Transient(_) => "transient",
            RemoteError::Fatal(_) => "fatal",
        }
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            // A body we cannot parse will not parse on retry either
            return RemoteError::Fatal(format!("invalid response body: {err}"));
        }
        match err.status() {
            Some(status) => RemoteError::from_status(status.as_u16(), err.to_string()),
            None => RemoteError::Transient(err.to_string()),
        }
    }
}
