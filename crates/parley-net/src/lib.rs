//! Server transport for the parley client.
//!
//! - [`channel`]: the REST [`Channel`] trait and its `reqwest` implementation
//! - [`queue`]: event queue registration and the long-poll task

pub mod channel;
pub mod error;
pub mod queue;

pub use channel::{Channel, Credentials, HttpChannel, Method, Params};
pub use error::TransportError;
pub use queue::{register_queue, spawn_event_poller, EventQueue, QueueNotification};
