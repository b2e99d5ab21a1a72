//! # parley
//!
//! Headless Parley client: registers an event queue, keeps a session's
//! stores and message lists in sync with the server, and logs every UI
//! update it would have rendered.

use std::sync::Arc;

use anyhow::{bail, Context};
use tokio_util::sync::CancellationToken;
use tracing::info;

use parley_client::config::ClientConfig;
use parley_client::event_bridge::{run_event_loop, LoopExit};
use parley_client::projection::TracingProjector;
use parley_client::{init_tracing, Session, SharedSession};
use parley_net::{register_queue, spawn_event_poller, Channel, Credentials, HttpChannel};
use parley_store::Stores;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    info!("Starting Parley client v{}", env!("CARGO_PKG_VERSION"));

    let config = ClientConfig::from_env();
    info!(?config, "Loaded configuration");
    if !config.has_credentials() {
        bail!("PARLEY_EMAIL and PARLEY_API_KEY must be set");
    }

    let credentials = Credentials {
        email: config.email.clone(),
        api_key: config.api_key.clone(),
    };
    // Long polls get their own client so they can outlive the request timeout.
    let api: Arc<dyn Channel> =
        Arc::new(HttpChannel::new(&config.site, credentials.clone(), config.request_timeout)?);
    let poll: Arc<dyn Channel> =
        Arc::new(HttpChannel::new(&config.site, credentials, config.poll_timeout)?);

    let mut session: Option<SharedSession> = None;

    loop {
        let (queue, state) = register_queue(api.as_ref(), &config.event_types)
            .await
            .context("Failed to register event queue")?;
        let last_event_id = queue.last_event_id;
        let stores = Stores::from_initial_state(state).context("Invalid initial state")?;

        let shared = match session.take() {
            Some(shared) => {
                match shared.lock() {
                    Ok(mut guard) => guard.reset(stores, last_event_id),
                    Err(_) => bail!("Session lock poisoned"),
                }
                shared
            }
            None => {
                Session::new(stores, Box::new(TracingProjector))
                    .with_last_event_id(last_event_id)
                    .into_shared()
            }
        };
        session = Some(shared.clone());

        let cancel = CancellationToken::new();
        let rx = spawn_event_poller(poll.clone(), queue, cancel.clone());

        let exit = tokio::select! {
            exit = run_event_loop(shared, api.clone(), rx) => exit,
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down");
                cancel.cancel();
                return Ok(());
            }
        };
        cancel.cancel();

        match exit {
            LoopExit::QueueExpired => info!("Re-registering event queue"),
            LoopExit::Closed => bail!("Event poller stopped unexpectedly"),
        }
    }
}
