//! # parley-client
//!
//! Applies the server's event stream to a [`Session`](state::Session): the
//! entity stores, the mounted message lists and the UI projection.
//!
//! - [`dispatch`] routes each decoded event to its handler
//! - [`user_events`], [`message_events`], [`live_update`] and [`condense`]
//!   mutate the stores and patch the rendered lists
//! - [`narrowed`] asks the server whether new messages belong in a
//!   server-filtered view, retrying with jittered backoff
//! - [`event_bridge`] feeds poller batches into the session and runs the
//!   resulting background work
//! - [`commands`] are user-initiated actions that report failures inline

pub mod commands;
pub mod condense;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod event_bridge;
pub mod filter;
pub mod live_update;
pub mod message_events;
pub mod message_list;
pub mod message_lists;
pub mod narrowed;
pub mod navigate;
pub mod projection;
pub mod state;
pub mod user_events;

#[cfg(test)]
mod test_support;

use tracing_subscriber::{fmt, EnvFilter};

pub use error::ClientError;
pub use state::{Session, SharedSession};

/// Install the global tracing subscriber, honouring `RUST_LOG`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("parley_client=debug,parley_net=info,parley_store=info,warn")
    });

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
