use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What the failure handler gets to show for a request that did not
/// produce a usable fragment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestFailure {
    pub status: u16,
    pub status_text: String,
    pub url: String,
    pub description: String,
}

impl RequestFailure {
    pub fn new(
        status: u16,
        status_text: impl Into<String>,
        url: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            status,
            status_text: status_text.into(),
            url: url.into(),
            description: description.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("{url} answered {status} {status_text}")]
    Status {
        url: String,
        status: u16,
        status_text: String,
    },
    #[error("request to {url} timed out")]
    Timeout { url: String },
    #[error("request to {url} failed: {message}")]
    Network { url: String, message: String },
    #[error("malformed response from {url}: {message}")]
    Malformed { url: String, message: String },
    #[error("cannot resolve url '{url}': {message}")]
    InvalidUrl { url: String, message: String },
}

impl TransportError {
    pub fn url(&self) -> &str {
        match self {
            Self::Status { url, .. }
            | Self::Timeout { url }
            | Self::Network { url, .. }
            | Self::Malformed { url, .. }
            | Self::InvalidUrl { url, .. } => url,
        }
    }

    /// Status 0 stands for "no HTTP status", the same way an XHR reports
    /// aborted or unreachable requests.
    pub fn to_failure(&self) -> RequestFailure {
        match self {
            Self::Status {
                url,
                status,
                status_text,
            } => RequestFailure::new(*status, status_text.clone(), url.clone(), status_text.clone()),
            Self::Timeout { url } => RequestFailure::new(0, "timeout", url.clone(), "timeout"),
            Self::Network { url, message } => {
                RequestFailure::new(0, "error", url.clone(), message.clone())
            }
            Self::Malformed { url, message } => {
                RequestFailure::new(200, "parsererror", url.clone(), message.clone())
            }
            Self::InvalidUrl { url, message } => {
                RequestFailure::new(0, "error", url.clone(), message.clone())
            }
        }
    }
}

impl From<&TransportError> for RequestFailure {
    fn from(value: &TransportError) -> Self {
        value.to_failure()
    }
}
