//! Error types for the task service client.
//!
//! # Design
//! Status failures keep the raw status and body for debugging. A failure
//! inside a batch is reported separately because only the position of the
//! failing op is known, not which logical call issued it. `NotFound` is a
//! local lookup miss and never comes from the network.

use thiserror::Error;

/// Errors returned by the client, the dispatcher and the local store.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The login request was rejected.
    #[error("login rejected with HTTP {status}")]
    Auth { status: u16 },

    /// A single call returned a non-2xx status (after the 404 retry, if any).
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The op at `index` inside a batch returned a non-2xx status.
    #[error("batch op {index} failed with HTTP {status}")]
    BatchOp { index: usize, status: u16 },

    /// A lookup by title in the local store found nothing.
    #[error("no {kind} titled '{title}'")]
    NotFound { kind: &'static str, title: String },

    /// The request never produced an HTTP response.
    #[error("transport failed: {0}")]
    Transport(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The response body did not have the expected shape.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// Client configuration could not be loaded.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ApiError {
    pub(crate) fn not_found(kind: &'static str, title: &str) -> Self {
        ApiError::NotFound {
            kind,
            title: title.to_string(),
        }
    }

    /// HTTP status carried by the error, if the server produced one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Auth { status }
            | ApiError::Http { status, .. }
            | ApiError::BatchOp { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_is_reported_for_server_errors() {
        assert_eq!(ApiError::Auth { status: 401 }.status(), Some(401));
        assert_eq!(
            ApiError::Http {
                status: 404,
                body: String::new()
            }
            .status(),
            Some(404)
        );
        assert_eq!(ApiError::BatchOp { index: 1, status: 500 }.status(), Some(500));
        assert_eq!(ApiError::not_found("list", "Work").status(), None);
    }

    #[test]
    fn display_includes_context() {
        let err = ApiError::not_found("task", "Milk");
        assert_eq!(err.to_string(), "no task titled 'Milk'");
        let err = ApiError::BatchOp { index: 0, status: 500 };
        assert_eq!(err.to_string(), "batch op 0 failed with HTTP 500");
    }
}
