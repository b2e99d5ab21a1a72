use thiserror::Error;

use parley_net::TransportError;
use parley_shared::ProtocolError;
use parley_store::StoreError;

use crate::message_list::ListId;

#[derive(Debug, Error)]
pub enum ClientError {
    /// An event arrived in a shape this client does not handle.
    #[error("Unexpected event {label}: {reason}")]
    UnexpectedEvent { label: String, reason: String },

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Request failed: {0}")]
    Transport(#[from] TransportError),

    /// Input rejected before any request was made.
    #[error("{0}")]
    Validation(String),

    #[error("Unknown message list: {0}")]
    UnknownList(ListId),

    #[error("Session lock poisoned")]
    LockPoisoned,
}

impl ClientError {
    /// Text suitable for an inline error banner.
    pub fn banner_text(&self) -> String {
        match self {
            Self::Transport(e) => e
                .server_message()
                .map(str::to_string)
                .unwrap_or_else(|| e.to_string()),
            other => other.to_string(),
        }
    }
}
