use thiserror::Error;

/// Manifest fetch failures.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("manifest request returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("manifest request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("manifest body is not a valid tool manifest: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Tool invocation failures.
///
/// A non-2xx response is not an error here; it comes back as an
/// [`Invocation`](super::Invocation) carrying the status.
#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("Tool {0} not found")]
    NotFound(String),

    #[error("tool declares an invalid HTTP method: {0}")]
    InvalidMethod(String),

    #[error("tool declares an invalid header name: {0}")]
    InvalidHeader(String),

    #[error("tool request failed: {0}")]
    Transport(#[source] reqwest::Error),
}

impl InvokeError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
