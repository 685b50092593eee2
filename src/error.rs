//! Crate error type.
//!
//! Internal consensus logic returns `anyhow::Result` the way the rest of
//! the ambient stack does; `RaftError` exists for the boundaries (config
//! parsing, HTTP handlers) that need a typed error to match on.

use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Errors surfaced at the edges of the crate.
#[derive(Debug, Error)]
pub enum RaftError {
    /// A peer id could not be resolved to a reachable address.
    #[error("no address configured for peer {0}")]
    InvalidPeerAddress(usize),

    /// The cluster/timing configuration is malformed.
    #[error("configuration error: {0}")]
    Config(String),

    /// The request landed on a non-leader replica. `redirect`, if
    /// known, is the absolute URL of the leader's equivalent path;
    /// `None` means the caller should retry after a short delay.
    #[error("not leader")]
    NotLeader {
        /// Absolute URL to redirect to, if the leader is known.
        redirect: Option<String>,
    },

    /// The requested key does not exist in the committed state machine.
    #[error("key not found: {0}")]
    KeyNotFound(String),
}

/// Translates a boundary error into the HTTP response `server::handlers`
/// sends to the client.
impl IntoResponse for RaftError {
    fn into_response(self) -> Response {
        match self {
            RaftError::InvalidPeerAddress(_) | RaftError::Config(_) => {
                tracing::error!(error = %self, "internal configuration error");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
            RaftError::NotLeader { redirect: Some(location) } => {
                let mut response = StatusCode::TEMPORARY_REDIRECT.into_response();
                if let Ok(value) = HeaderValue::from_str(&location) {
                    response.headers_mut().insert(axum::http::header::LOCATION, value);
                }
                response
            }
            RaftError::NotLeader { redirect: None } => {
                let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
                response
                    .headers_mut()
                    .insert(axum::http::header::RETRY_AFTER, HeaderValue::from_static("1"));
                response
            }
            RaftError::KeyNotFound(_) => StatusCode::NOT_FOUND.into_response(),
        }
    }
}
