//! Error types for the CRM client.
//!
//! # Design
//! Every non-2xx response becomes a [`RequestError`] carrying the vendor error
//! code, a human message and the raw body. The CRM answers failures in several
//! shapes (a single object, an array of objects from the REST API, the OAuth
//! `error`/`error_description` pair, or an HTML page from a proxy), so parsing
//! never fails: unknown shapes fall back to [`UNKNOWN_ERROR_CODE`].

use serde::Deserialize;
use thiserror::Error;

/// Error code used when a failed response body carries no recognisable code.
pub const UNKNOWN_ERROR_CODE: &str = "UNKNOWN_ERROR";

/// Errors returned by `Client` operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The server answered with a non-2xx status.
    #[error(transparent)]
    Request(#[from] RequestError),

    /// An authenticated operation was attempted before `set_access_token`.
    #[error("no access token set on the client")]
    MissingAccessToken,

    /// A caller-supplied value cannot form a valid request, such as a blank
    /// record id.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The login URL or the token's API URL is not a valid absolute URL.
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The transport could not complete the HTTP exchange.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A success response body could not be decoded.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// A request payload could not be encoded as JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),
}

/// Failure reported by a [`Transport`](crate::Transport) before any HTTP
/// status was received (DNS, TLS, connection reset, timeout).
#[derive(Debug, Clone, Error)]
#[error("transport failed: {0}")]
pub struct TransportError(pub String);

/// A failed HTTP response decoded into the CRM's error fields.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{error_code}: {message} (HTTP {status})")]
pub struct RequestError {
    pub status: u16,
    pub error_code: String,
    pub message: String,
    /// The response body exactly as received.
    pub body: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorBody {
    Api {
        #[serde(rename = "errorCode")]
        error_code: String,
        message: String,
    },
    OAuth {
        error: String,
        #[serde(default)]
        error_description: Option<String>,
    },
}

impl RequestError {
    /// Decode a failed response body.
    pub fn from_response(status: u16, body: &str) -> Self {
        let parsed = serde_json::from_str::<ErrorBody>(body).ok().or_else(|| {
            serde_json::from_str::<Vec<ErrorBody>>(body)
                .ok()
                .and_then(|errors| errors.into_iter().next())
        });

        let (error_code, message) = match parsed {
            Some(ErrorBody::Api {
                error_code,
                message,
            }) => (error_code, message),
            Some(ErrorBody::OAuth {
                error,
                error_description,
            }) => {
                let message = error_description.unwrap_or_else(|| error.clone());
                (error, message)
            }
            None => {
                let trimmed = body.trim();
                let message = if trimmed.is_empty() {
                    format!("HTTP {status}")
                } else {
                    trimmed.to_string()
                };
                (UNKNOWN_ERROR_CODE.to_string(), message)
            }
        };

        Self {
            status,
            error_code,
            message,
            body: body.to_string(),
        }
    }
}
