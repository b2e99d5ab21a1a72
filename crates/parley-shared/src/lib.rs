//! Types shared by every Parley crate: identifiers, the server event wire
//! format, protocol constants and retry helpers.

pub mod constants;
pub mod error;
pub mod protocol;
pub mod retry;
pub mod types;

pub use error::ProtocolError;
