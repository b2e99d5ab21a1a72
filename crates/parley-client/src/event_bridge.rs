//! Bridge between the event poller and the session.
//!
//! Batches from the poller are applied under the session lock. Work the
//! handlers queued (narrow checks, flag updates) runs in spawned tasks once
//! the lock is released.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use parley_net::{Channel, QueueNotification};
use parley_shared::types::MessageId;

use crate::dispatch::handle_raw_event;
use crate::narrowed::maybe_add_narrowed_messages;
use crate::state::{lock_session, FollowUp, SharedSession};

/// Why [`run_event_loop`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// The server dropped the queue; register a new one.
    QueueExpired,
    /// The poller stopped.
    Closed,
}

/// Apply queue notifications to the session until the poller stops.
///
/// Each batch is applied under the session lock; follow-ups requested by the
/// handlers are spawned after the lock is released.
pub async fn run_event_loop(
    session: SharedSession,
    channel: Arc<dyn Channel>,
    mut rx: mpsc::Receiver<QueueNotification>,
) -> LoopExit {
    info!("Event loop started");

    while let Some(notification) = rx.recv().await {
        match notification {
            QueueNotification::Events(events) => {
                debug!(count = events.len(), "Applying event batch");
                let followups = {
                    let mut guard = match lock_session(&session) {
                        Ok(g) => g,
                        Err(e) => {
                            warn!(error = %e, "Dropping event batch");
                            continue;
                        }
                    };
                    for event in events {
                        handle_raw_event(&mut guard, event);
                    }
                    guard.take_followups()
                };
                for followup in followups {
                    spawn_followup(session.clone(), channel.clone(), followup);
                }
            }

            QueueNotification::QueueExpired => {
                warn!("Event queue expired");
                return LoopExit::QueueExpired;
            }
        }
    }

    warn!("Event loop ended");
    LoopExit::Closed
}

/// Run one follow-up in its own task.
pub fn spawn_followup(
    session: SharedSession,
    channel: Arc<dyn Channel>,
    followup: FollowUp,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        match followup {
            FollowUp::NarrowCheck { list_id, ids } => {
                let outcome = maybe_add_narrowed_messages(session, channel, ids, list_id, |added| {
                    debug!(list = %list_id, count = added.len(), "Narrowed messages added");
                })
                .await;
                debug!(list = %list_id, ?outcome, "Narrow check finished");
            }
            FollowUp::SetCollapsed { id, collapsed } => {
                set_collapsed_flag(channel.as_ref(), id, collapsed).await;
            }
        }
    })
}

async fn set_collapsed_flag(channel: &dyn Channel, id: MessageId, collapsed: bool) {
    let op = if collapsed { "add" } else { "remove" };
    let params = vec![
        ("messages", format!("[{id}]")),
        ("op", op.to_string()),
        ("flag", "collapsed".to_string()),
    ];
    if let Err(e) = channel.post("/json/messages/flags", params).await {
        warn!(message_id = %id, error = %e, "Failed to save collapsed flag");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{Filter, Term};
    use crate::test_support::{session_with_messages, ScriptedChannel};
    use parley_net::Method;
    use serde_json::json;

    #[tokio::test]
    async fn test_batches_apply_until_expired() {
        let (session, _) = session_with_messages(&[]);
        let session = session.into_shared();
        let channel = ScriptedChannel::new(Vec::new());
        let (tx, rx) = mpsc::channel(4);

        tx.send(QueueNotification::Events(vec![
            json!({"id": 0, "type": "realm", "op": "update", "property": "name", "value": "Globe"}),
            json!({"id": 1, "type": "heartbeat"}),
        ]))
        .await
        .unwrap();
        tx.send(QueueNotification::QueueExpired).await.unwrap();

        let exit = run_event_loop(session.clone(), channel, rx).await;

        assert_eq!(exit, LoopExit::QueueExpired);
        let guard = session.lock().unwrap();
        assert_eq!(guard.stores.realm.name, "Globe");
        assert_eq!(guard.last_event_id(), 1);
    }

    #[tokio::test]
    async fn test_closed_channel_ends_loop() {
        let (session, _) = session_with_messages(&[]);
        let (tx, rx) = mpsc::channel(1);
        drop(tx);
        let exit = run_event_loop(session.into_shared(), ScriptedChannel::new(Vec::new()), rx).await;
        assert_eq!(exit, LoopExit::Closed);
    }

    #[tokio::test]
    async fn test_collapse_followup_posts_flag() {
        let (session, _) = session_with_messages(&[]);
        let channel = ScriptedChannel::new(vec![Ok(json!({"result": "success"}))]);

        spawn_followup(
            session.into_shared(),
            channel.clone(),
            FollowUp::SetCollapsed { id: MessageId::from(42), collapsed: true },
        )
        .await
        .unwrap();

        let seen = channel.seen();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].method, Method::Post);
        assert_eq!(seen[0].path, "/json/messages/flags");
        assert_eq!(seen[0].param("messages"), Some("[42]"));
        assert_eq!(seen[0].param("op"), Some("add"));
        assert_eq!(seen[0].param("flag"), Some("collapsed"));
    }

    #[tokio::test]
    async fn test_narrow_followup_adds_match() {
        let (mut session, _) = session_with_messages(&[]);
        let list_id = session.narrow(Filter::new(vec![Term::Search("lunch".into())]));
        let session = session.into_shared();
        let channel = ScriptedChannel::new(vec![Ok(json!({"messages": {"100": {"match_content": "<p>lunch?</p>"}}}))]);
        let (tx, rx) = mpsc::channel(4);

        let event = json!({"id": 0, "type": "message", "flags": [], "message": {
            "id": 100, "sender_id": 10, "content": "<p>lunch?</p>", "type": "stream",
            "stream_id": 1, "subject": "general", "display_recipient": "Denmark", "timestamp": 1700000100
        }});
        tx.send(QueueNotification::Events(vec![event])).await.unwrap();
        drop(tx);
        run_event_loop(session.clone(), channel.clone(), rx).await;

        for _ in 0..50 {
            if !session.lock().unwrap().lists.current().is_empty() {
                break;
            }
            tokio::task::yield_now().await;
        }
        let guard = session.lock().unwrap();
        assert!(guard.lists.is_current_narrow(list_id));
        assert_eq!(guard.lists.current().items(), &[MessageId::from(100)]);
    }
}
