//! Exchange call failures

use thiserror::Error;

/// Maximum number of body bytes kept in an error message
const MAX_BODY_LEN: usize = 500;

/// Failure of a single exchange call
///
/// These never escape a sync: the reconciler logs them and moves on to the
/// next list.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// Connection, TLS or timeout failure
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-success HTTP status
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The envelope carried a non-zero return code
    #[error("Exchange error {code}: {message}")]
    Api { code: i64, message: String },

    /// The body could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// The request could not be signed
    #[error("Signing error: {0}")]
    Signing(String),
}

impl ExchangeError {
    /// Build a status error, truncating the body
    pub fn status(status: u16, body: &str) -> Self {
        let body = match body.char_indices().nth(MAX_BODY_LEN) {
            Some((idx, _)) => &body[..idx],
            None => body,
        };
        ExchangeError::Status {
            status,
            body: body.to_string(),
        }
    }
}

impl From<serde_json::Error> for ExchangeError {
    fn from(err: serde_json::Error) -> Self {
        ExchangeError::Decode(err.to_string())
    }
}
