use serde_json::Value;
use thiserror::Error;

/// Failure of a single REST call.
#[derive(Error, Debug, Clone)]
pub enum TransportError {
    /// The server answered with a non-success status.
    #[error("Server responded {status}")]
    Http { status: u16, body: Option<Value> },

    #[error("Request timed out")]
    Timeout,

    #[error("Request failed: {0}")]
    Network(String),

    #[error("Invalid response body: {0}")]
    Decode(String),
}

impl TransportError {
    /// HTTP status, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Parsed JSON error body, if any.
    pub fn response_json(&self) -> Option<&Value> {
        match self {
            Self::Http { body, .. } => body.as_ref(),
            _ => None,
        }
    }

    /// Machine-readable error code from the body (`"code"`).
    pub fn code(&self) -> Option<&str> {
        self.response_json()?.get("code")?.as_str()
    }

    /// Human-readable error message from the body (`"msg"`).
    pub fn server_message(&self) -> Option<&str> {
        self.response_json()?.get("msg")?.as_str()
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Network(e.to_string())
        }
    }
}
