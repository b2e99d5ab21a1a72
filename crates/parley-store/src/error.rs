use thiserror::Error;

use parley_shared::types::{GroupId, MessageId, StreamId, UserId};
use parley_shared::ProtocolError;

/// Errors produced by the store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// An event referenced a user the store has never seen.
    #[error("Unknown user: {0}")]
    UnknownUser(UserId),

    #[error("Unknown stream: {0}")]
    UnknownStream(StreamId),

    #[error("Unknown user group: {0}")]
    UnknownGroup(GroupId),

    #[error("Unknown message: {0}")]
    UnknownMessage(MessageId),

    /// A wire value could not be converted into a store field.
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
