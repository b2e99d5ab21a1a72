//! Delivery of new messages into lists whose filter only the server can
//! evaluate (full-text search and the like).
//!
//! The server is asked which of the new ids match the list's narrow. The
//! request is retried with full-jitter backoff and abandoned as soon as the
//! list is no longer the current narrow.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use parley_net::{Channel, Method, Params};
use parley_shared::constants::{
    NARROW_CHECK_MAX_ATTEMPTS, NARROW_CHECK_TIMEOUT_MS, RETRY_BASE_DELAY_MS,
};
use parley_shared::retry::full_jitter_delay;
use parley_shared::types::MessageId;

use crate::message_list::ListId;
use crate::projection::UiUpdate;
use crate::state::{lock_session, SharedSession};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NarrowOutcome {
    /// The server answered; these ids were added to the list.
    Added(Vec<MessageId>),
    /// The server refused the narrow (HTTP 400).
    Rejected,
    /// Every attempt failed.
    GaveUp,
    /// The list stopped being the current narrow.
    Abandoned,
}

/// Ask the server which of `ids` belong in `list_id` and add those.
///
/// `callback` runs once, outside the session lock, with the ids that were
/// added.
pub async fn maybe_add_narrowed_messages<F>(
    session: SharedSession,
    channel: Arc<dyn Channel>,
    ids: Vec<MessageId>,
    list_id: ListId,
    callback: F,
) -> NarrowOutcome
where
    F: FnOnce(&[MessageId]) + Send,
{
    let Some((cancel, narrow)) = target(&session, list_id) else {
        debug!(list = %list_id, "Narrow check for a list that is not current");
        return NarrowOutcome::Abandoned;
    };
    let params = match encode_params(&ids, &narrow) {
        Ok(params) => params,
        Err(e) => {
            error!(list = %list_id, error = %e, "Could not encode narrow check");
            return NarrowOutcome::GaveUp;
        }
    };
    let timeout = Duration::from_millis(NARROW_CHECK_TIMEOUT_MS);

    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        if cancel.is_cancelled() || !still_current(&session, list_id) {
            debug!(list = %list_id, attempt, "Narrow changed, dropping check");
            return NarrowOutcome::Abandoned;
        }

        let result = tokio::select! {
            _ = cancel.cancelled() => return NarrowOutcome::Abandoned,
            result = channel.request(
                Method::Get,
                "/json/messages/matches_narrow",
                params.clone(),
                Some(timeout),
            ) => result,
        };

        let err = match result {
            Ok(body) => return apply_matches(&session, &cancel, list_id, &ids, &body, callback),
            Err(e) => e,
        };

        if err.status() == Some(400) {
            warn!(list = %list_id, error = %err, "Server rejected narrow check");
            return NarrowOutcome::Rejected;
        }
        if attempt >= NARROW_CHECK_MAX_ATTEMPTS {
            error!(list = %list_id, attempts = attempt, error = %err, "Giving up on narrow check");
            return NarrowOutcome::GaveUp;
        }

        let delay = {
            let mut rng = rand::thread_rng();
            full_jitter_delay(attempt, RETRY_BASE_DELAY_MS, &mut rng)
        };
        warn!(
            list = %list_id,
            attempt,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "Narrow check failed, retrying"
        );

        tokio::select! {
            _ = cancel.cancelled() => return NarrowOutcome::Abandoned,
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

fn target(session: &SharedSession, list_id: ListId) -> Option<(CancellationToken, Vec<Value>)> {
    let guard = lock_session(session).ok()?;
    if !guard.lists.is_current_narrow(list_id) {
        return None;
    }
    let list = guard.lists.current();
    Some((list.cancel_token(), list.filter().to_narrow()))
}

fn still_current(session: &SharedSession, list_id: ListId) -> bool {
    lock_session(session).is_ok_and(|guard| guard.lists.is_current_narrow(list_id))
}

fn encode_params(ids: &[MessageId], narrow: &[Value]) -> serde_json::Result<Params> {
    Ok(vec![
        ("msg_ids", serde_json::to_string(ids)?),
        ("narrow", serde_json::to_string(narrow)?),
    ])
}

/// Merge a `matches_narrow` response into the list.
///
/// The response is keyed by message id, with highlighted `match_content`
/// and `match_subject` for each match.
fn apply_matches<F>(
    session: &SharedSession,
    cancel: &CancellationToken,
    list_id: ListId,
    ids: &[MessageId],
    body: &Value,
    callback: F,
) -> NarrowOutcome
where
    F: FnOnce(&[MessageId]),
{
    let matched = {
        let Ok(mut guard) = lock_session(session) else {
            return NarrowOutcome::Abandoned;
        };
        if cancel.is_cancelled() || !guard.lists.is_current_narrow(list_id) {
            debug!(list = %list_id, "Narrow changed while checking");
            return NarrowOutcome::Abandoned;
        }

        let mut matched = Vec::new();
        let matches = body.get("messages").and_then(Value::as_object);
        for (key, info) in matches.into_iter().flatten() {
            let Ok(id) = key.parse::<MessageId>() else {
                warn!(key = %key, "Ignoring malformed id in narrow check");
                continue;
            };
            if !ids.contains(&id) {
                continue;
            }
            let Ok(message) = guard.stores.messages.get_mut(id) else {
                debug!(message_id = %id, "Matched message no longer cached");
                continue;
            };
            message.match_content = info.get("match_content").and_then(Value::as_str).map(str::to_string);
            message.match_topic = info.get("match_subject").and_then(Value::as_str).map(str::to_string);
            matched.push(id);
        }
        matched.sort();

        let session = &mut *guard;
        if let Some(list) = session.lists.get_mut(list_id) {
            list.add_messages(&matched, &session.stores);
        }
        let elsewhere: Vec<MessageId> = ids.iter().copied().filter(|id| !matched.contains(id)).collect();
        if !elsewhere.is_empty() {
            session.emit(UiUpdate::MessagesVisibleElsewhere { ids: elsewhere });
        }
        matched
    };

    debug!(list = %list_id, count = matched.len(), "Narrow check merged");
    callback(&matched);
    NarrowOutcome::Added(matched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{Filter, Term};
    use crate::test_support::{http_error, session_with_messages, ScriptedChannel};
    use async_trait::async_trait;
    use parley_net::TransportError;
    use parley_shared::retry::backoff_ceiling;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn search_session(ids: &[u64]) -> (SharedSession, ListId, crate::projection::RecordingProjector) {
        let (mut session, recorder) = session_with_messages(ids);
        let list_id = session.narrow(Filter::new(vec![Term::Search("lunch".into())]));
        (session.into_shared(), list_id, recorder)
    }

    #[tokio::test(start_paused = true)]
    async fn test_four_failures_then_success() {
        let (session, list_id, recorder) = search_session(&[7, 8]);
        let channel = ScriptedChannel::new(vec![
            Err(TransportError::Network("reset".into())),
            Err(TransportError::Timeout),
            Err(http_error(502, "Bad gateway")),
            Err(TransportError::Network("reset".into())),
            Ok(json!({"messages": {"7": {"match_content": "<p><span class=\"highlight\">lunch</span></p>", "match_subject": "general"}}})),
        ]);
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in = calls.clone();

        let outcome = maybe_add_narrowed_messages(
            session.clone(),
            channel.clone(),
            vec![MessageId::from(7), MessageId::from(8)],
            list_id,
            move |ids| {
                assert_eq!(ids, &[MessageId::from(7)]);
                calls_in.fetch_add(1, Ordering::SeqCst);
            },
        )
        .await;

        assert_eq!(outcome, NarrowOutcome::Added(vec![MessageId::from(7)]));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let seen = channel.seen();
        assert_eq!(seen.len(), 5);
        for (i, pair) in seen.windows(2).enumerate() {
            let waited = pair[1].at - pair[0].at;
            assert!(waited <= backoff_ceiling(i as u32 + 1, RETRY_BASE_DELAY_MS));
        }
        assert_eq!(seen[0].path, "/json/messages/matches_narrow");
        assert_eq!(seen[0].timeout, Some(Duration::from_millis(5000)));
        assert_eq!(seen[0].param("msg_ids"), Some("[7,8]"));

        let guard = session.lock().unwrap();
        assert_eq!(guard.lists.current().items(), &[MessageId::from(7)]);
        assert!(guard
            .stores
            .messages
            .get(MessageId::from(7))
            .unwrap()
            .match_content
            .as_deref()
            .unwrap()
            .contains("highlight"));
        drop(guard);
        assert_eq!(
            recorder.count(|u| *u == UiUpdate::MessagesVisibleElsewhere { ids: vec![MessageId::from(8)] }),
            1
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_bad_request_is_not_retried() {
        let (session, list_id, _) = search_session(&[7]);
        let channel = ScriptedChannel::new(vec![Err(http_error(400, "Invalid narrow"))]);
        let called = Arc::new(AtomicUsize::new(0));
        let called_in = called.clone();

        let outcome = maybe_add_narrowed_messages(session, channel.clone(), vec![MessageId::from(7)], list_id, move |_| {
            called_in.fetch_add(1, Ordering::SeqCst);
        })
        .await;

        assert_eq!(outcome, NarrowOutcome::Rejected);
        assert_eq!(channel.seen().len(), 1);
        assert_eq!(called.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_attempts() {
        let (session, list_id, _) = search_session(&[7]);
        let channel = ScriptedChannel::new(Vec::new());

        let outcome = maybe_add_narrowed_messages(session, channel.clone(), vec![MessageId::from(7)], list_id, |_| {
            panic!("callback must not run")
        })
        .await;

        assert_eq!(outcome, NarrowOutcome::GaveUp);
        assert_eq!(channel.seen().len(), NARROW_CHECK_MAX_ATTEMPTS as usize);
    }

    #[tokio::test]
    async fn test_not_current_list_is_abandoned() {
        let (session, list_id, _) = search_session(&[7]);
        lock_session(&session).unwrap().narrow(Filter::home());
        let channel = ScriptedChannel::new(Vec::new());

        let outcome =
            maybe_add_narrowed_messages(session, channel.clone(), vec![MessageId::from(7)], list_id, |_| {}).await;

        assert_eq!(outcome, NarrowOutcome::Abandoned);
        assert!(channel.seen().is_empty());
    }

    /// Leaves the narrow while the first request is in flight, then fails it.
    struct NavigatingChannel {
        session: SharedSession,
        requests: AtomicUsize,
    }

    #[async_trait]
    impl Channel for NavigatingChannel {
        async fn request(
            &self,
            _method: Method,
            _path: &str,
            _params: Params,
            _timeout: Option<Duration>,
        ) -> Result<Value, TransportError> {
            self.requests.fetch_add(1, Ordering::SeqCst);
            self.session.lock().unwrap().narrow(Filter::home());
            Err(TransportError::Network("reset".into()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_detach_during_backoff_abandons() {
        let (session, list_id, _) = search_session(&[7]);
        let channel = Arc::new(NavigatingChannel {
            session: session.clone(),
            requests: AtomicUsize::new(0),
        });

        let outcome =
            maybe_add_narrowed_messages(session, channel.clone(), vec![MessageId::from(7)], list_id, |_| {}).await;

        assert_eq!(outcome, NarrowOutcome::Abandoned);
        assert_eq!(channel.requests.load(Ordering::SeqCst), 1);
    }
}
