use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Invalid message id: {0}")]
    InvalidMessageId(String),

    #[error("Unknown role code: {0}")]
    UnknownRole(u16),

    #[error("Unknown {scope} property: {property}")]
    UnknownProperty { scope: &'static str, property: String },

    #[error("Invalid value for {property}: {source}")]
    InvalidValue {
        property: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unrecognized person update for user {0}")]
    UnrecognizedPersonUpdate(u64),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
