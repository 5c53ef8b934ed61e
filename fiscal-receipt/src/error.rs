use thiserror::Error;

/// Receipt failure
#[derive(Debug, Error)]
pub enum ReceiptError {
    /// Required fiscal settings are missing from the user's profile
    #[error("Fiscal settings are incomplete, missing: {}", .0.join(", "))]
    IncompleteProfile(Vec<&'static str>),

    /// Transport, HTTP or in-band failure reported by the provider
    #[error("{0}")]
    Provider(String),
}

impl From<reqwest::Error> for ReceiptError {
    fn from(err: reqwest::Error) -> Self {
        ReceiptError::Provider(format!("Network error: {}", err))
    }
}
