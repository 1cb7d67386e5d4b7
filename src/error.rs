//! Error types for the Mail.tm client.

use thiserror::Error;

/// Errors that can occur during Mail.tm operations.
///
/// Rate limiting (HTTP 429) never shows up here: the client waits and
/// retries until the service lets the request through.
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed at the transport level.
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The endpoint answered with an empty body.
    #[error("<{endpoint}> returned an empty body")]
    EmptyBody {
        /// Request path, e.g. `/domains`.
        endpoint: String,
    },

    /// The endpoint answered with something that is not JSON.
    #[error("<{endpoint}> does not contain valid JSON: {source}")]
    InvalidJson {
        /// Request path, e.g. `/domains`.
        endpoint: String,
        /// Underlying parser error.
        #[source]
        source: serde_json::Error,
    },

    /// The service reported a logical failure (`detail` or `violations`).
    #[error("<{endpoint}> api error: {detail}")]
    Api {
        /// Request path, e.g. `/accounts`.
        endpoint: String,
        /// Error text reported by the service.
        detail: String,
    },

    /// The JSON payload did not have the expected structure.
    #[error("<{endpoint}> unexpected response shape: expected {expected}")]
    UnexpectedShape {
        /// Request path, e.g. `/messages`.
        endpoint: String,
        /// Human readable description of what was expected.
        expected: &'static str,
    },

    /// JSON encoding error.
    #[error("JSON encoding error: {0}")]
    Json(#[from] serde_json::Error),

    /// The service does not currently offer any active domain.
    #[error("No active domains available")]
    NoActiveDomains,

    /// A token was requested before an address and password were known.
    #[error("Missing account credentials; create an account first")]
    MissingCredentials,

    /// A message endpoint was called without a bearer token.
    #[error("Missing bearer token")]
    MissingToken,
}
