//! Adapter errors and their mapping onto the core error type.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Unexpected response {status} from {endpoint}: {body}")]
    UnexpectedStatus {
        endpoint: String,
        status: u16,
        body: String,
    },
    #[error("Trigger rejected with {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<RemoteError> for pkgmatrix_core::Error {
    fn from(err: RemoteError) -> Self {
        use pkgmatrix_core::Error;
        match err {
            RemoteError::Http(e) if e.is_decode() => Error::Decode(e.to_string()),
            RemoteError::Http(e) => Error::Network(e.to_string()),
            e @ RemoteError::UnexpectedStatus { .. } => Error::Network(e.to_string()),
            e @ RemoteError::Rejected { .. } => Error::TriggerRejected(e.to_string()),
            RemoteError::InvalidResponse(msg) => Error::Decode(msg),
        }
    }
}
