//! Event queue registration and long-polling.
//!
//! The poller runs in a dedicated tokio task and hands batches of raw events
//! to the application over an mpsc channel, keeping transport concerns out
//! of the dispatcher.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use parley_shared::constants::{BAD_EVENT_QUEUE_ID, EVENT_POLL_MAX_BACKOFF_MS};
use parley_shared::protocol::InitialState;
use parley_shared::retry::full_jitter_delay;

use crate::channel::Channel;
use crate::error::TransportError;

/// Base of the poller's jittered backoff, in milliseconds.
const POLL_RETRY_BASE_MS: u64 = 1000;

/// Notifications sent *from* the poller task to the application.
#[derive(Debug, Clone)]
pub enum QueueNotification {
    /// A batch of raw events, in server order.
    Events(Vec<Value>),
    /// The server forgot our queue; the client must re-register.
    QueueExpired,
}

/// Position in a registered event queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventQueue {
    pub queue_id: String,
    pub last_event_id: i64,
}

/// Register a new event queue and fetch the initial state snapshot.
pub async fn register_queue(
    channel: &dyn Channel,
    event_types: &[String],
) -> Result<(EventQueue, InitialState), TransportError> {
    let mut params = vec![("apply_markdown", "true".to_string())];
    if !event_types.is_empty() {
        let encoded = serde_json::to_string(event_types)
            .map_err(|e| TransportError::Decode(e.to_string()))?;
        params.push(("event_types", encoded));
    }

    let body = channel.post("/json/register", params).await?;
    let state: InitialState =
        serde_json::from_value(body).map_err(|e| TransportError::Decode(e.to_string()))?;

    let queue_id = state
        .queue_id
        .clone()
        .ok_or_else(|| TransportError::Decode("register response without queue_id".into()))?;

    info!(queue_id = %queue_id, last_event_id = state.last_event_id, "Registered event queue");

    Ok((
        EventQueue {
            queue_id,
            last_event_id: state.last_event_id,
        },
        state,
    ))
}

/// Spawn the long-poll loop in a background task.
///
/// The task ends when `cancel` fires, when the receiver is dropped, or after
/// reporting [`QueueNotification::QueueExpired`].
pub fn spawn_event_poller(
    channel: Arc<dyn Channel>,
    queue: EventQueue,
    cancel: CancellationToken,
) -> mpsc::Receiver<QueueNotification> {
    let (tx, rx) = mpsc::channel(64);
    tokio::spawn(async move {
        poll_loop(channel, queue, cancel, tx).await;
    });
    rx
}

async fn poll_loop(
    channel: Arc<dyn Channel>,
    mut queue: EventQueue,
    cancel: CancellationToken,
    tx: mpsc::Sender<QueueNotification>,
) {
    let mut failures: u32 = 0;
    info!(queue_id = %queue.queue_id, "Event poller started");

    loop {
        let params = vec![
            ("queue_id", queue.queue_id.clone()),
            ("last_event_id", queue.last_event_id.to_string()),
            ("dont_block", "false".to_string()),
        ];

        let result = tokio::select! {
            _ = cancel.cancelled() => break,
            result = channel.get("/json/events", params) => result,
        };

        match result {
            Ok(body) => {
                failures = 0;
                let events = body
                    .get("events")
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default();

                if let Some(max_id) = events.iter().filter_map(|e| e.get("id")?.as_i64()).max() {
                    queue.last_event_id = queue.last_event_id.max(max_id);
                }
                debug!(count = events.len(), last_event_id = queue.last_event_id, "Polled events");

                if !events.is_empty() && tx.send(QueueNotification::Events(events)).await.is_err() {
                    break;
                }
            }

            Err(e) if e.code() == Some(BAD_EVENT_QUEUE_ID) => {
                warn!(queue_id = %queue.queue_id, "Event queue expired");
                let _ = tx.send(QueueNotification::QueueExpired).await;
                break;
            }

            Err(e) => {
                failures += 1;
                let delay = {
                    let mut rng = rand::thread_rng();
                    full_jitter_delay(failures, POLL_RETRY_BASE_MS, &mut rng)
                }
                .min(Duration::from_millis(EVENT_POLL_MAX_BACKOFF_MS));
                warn!(error = %e, failures, delay_ms = delay.as_millis() as u64, "Event poll failed, backing off");

                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }
    }

    warn!(queue_id = %queue.queue_id, "Event poller ended");
}
