use reqwest::StatusCode;
use thiserror::Error;

/// Failure of a call through the HTTP client.
///
/// Errors are logged by the client's response stages and handed back unchanged.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server responded with a non-success status
    #[error("server responded with {status}: {body}")]
    Status { status: StatusCode, body: String },

    /// The request was sent but no response arrived (connection failure, timeout)
    #[error("no response received: {0}")]
    Network(#[source] reqwest::Error),

    /// The request could not be constructed
    #[error("invalid request: {0}")]
    Request(String),

    #[error("failed to decode response body: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Status,
    Network,
    Request,
    Decode,
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Status { .. } => ErrorKind::Status,
            ApiError::Network(_) => ErrorKind::Network,
            ApiError::Request(_) => ErrorKind::Request,
            ApiError::Decode(_) => ErrorKind::Decode,
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }

    /// Whether a query may be retried after this error
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Network(_) => true,
            ApiError::Status { status, .. } => {
                status.is_server_error()
                    || *status == StatusCode::REQUEST_TIMEOUT
                    || *status == StatusCode::TOO_MANY_REQUESTS
            }
            ApiError::Request(_) | ApiError::Decode(_) => false,
        }
    }
}
