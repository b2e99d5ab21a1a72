//! Shared fixtures for the client's unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::time::Instant;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

use parley_net::{Channel, Method, Params, TransportError};
use parley_shared::protocol::{InitialState, NewMessageEvent, RawMessage};
use parley_shared::types::{StreamId, UserId};
use parley_store::{Message, Stores};

use crate::projection::RecordingProjector;
use crate::state::Session;

pub const ME: UserId = UserId(1);
pub const OTHER: UserId = UserId(10);
pub const BOT: UserId = UserId(20);
pub const DENMARK: StreamId = StreamId(1);

fn initial_state() -> InitialState {
    serde_json::from_value(json!({
        "queue_id": "fixture",
        "last_event_id": -1,
        "user_id": ME.0,
        "realm_users": [
            {"user_id": ME.0, "full_name": "Iago", "email": "iago@example.com", "role": 400},
            {"user_id": OTHER.0, "full_name": "Othello", "email": "othello@example.com", "role": 400},
            {"user_id": BOT.0, "full_name": "Notify", "email": "notify-bot@example.com", "role": 400,
             "is_bot": true, "bot_owner_id": ME.0}
        ],
        "subscriptions": [
            {"stream_id": DENMARK.0, "name": "Denmark", "color": "#76ce90", "subscribers": [ME.0, OTHER.0]}
        ],
        "never_subscribed": [{"stream_id": 2, "name": "Verona"}],
        "realm": {"name": "Shakespeare"}
    }))
    .unwrap()
}

pub fn stream_message(id: u64, sender: u64, stream_id: u64, topic: &str) -> Message {
    let raw: RawMessage = serde_json::from_value(json!({
        "id": id,
        "sender_id": sender,
        "sender_full_name": "Othello",
        "sender_email": "othello@example.com",
        "content": format!("<p>message {id}</p>"),
        "type": "stream",
        "stream_id": stream_id,
        "subject": topic,
        "display_recipient": "Denmark",
        "timestamp": 1_700_000_000 + id as i64,
    }))
    .unwrap();
    Message::from_raw(raw, &[]).unwrap()
}

pub fn stores_with_messages(ids: &[u64]) -> Stores {
    let mut stores = Stores::from_initial_state(initial_state()).unwrap();
    for &id in ids {
        stores.messages.insert(stream_message(id, OTHER.0, DENMARK.0, "general"));
    }
    stores
}

pub fn session_with_messages(ids: &[u64]) -> (Session, RecordingProjector) {
    let recorder = RecordingProjector::new();
    let session = Session::new(stores_with_messages(ids), Box::new(recorder.clone()));
    (session, recorder)
}

pub fn session_with_people() -> (Session, RecordingProjector) {
    session_with_messages(&[])
}

/// A `message` event for id 100 in Denmark > general; `extra` is merged
/// into the top level of the event.
pub fn new_message_event(extra: Value) -> NewMessageEvent {
    let mut event = json!({
        "message": {
            "id": 100,
            "sender_id": OTHER.0,
            "sender_full_name": "Othello",
            "sender_email": "othello@example.com",
            "content": "<p>lunch?</p>",
            "type": "stream",
            "stream_id": DENMARK.0,
            "subject": "general",
            "display_recipient": "Denmark",
            "timestamp": 1_700_000_100
        },
        "flags": []
    });
    if let (Some(target), Value::Object(extra)) = (event.as_object_mut(), extra) {
        target.extend(extra);
    }
    serde_json::from_value(event).unwrap()
}

/// A request seen by [`ScriptedChannel`].
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub method: Method,
    pub path: String,
    pub params: Params,
    pub timeout: Option<Duration>,
    pub at: Instant,
}

impl SeenRequest {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Answers requests from a fixed script; fails once the script runs out.
#[derive(Default)]
pub struct ScriptedChannel {
    responses: Mutex<VecDeque<Result<Value, TransportError>>>,
    seen: Mutex<Vec<SeenRequest>>,
}

impl ScriptedChannel {
    pub fn new(responses: Vec<Result<Value, TransportError>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn seen(&self) -> Vec<SeenRequest> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Channel for ScriptedChannel {
    async fn request(
        &self,
        method: Method,
        path: &str,
        params: Params,
        timeout: Option<Duration>,
    ) -> Result<Value, TransportError> {
        self.seen.lock().unwrap().push(SeenRequest {
            method,
            path: path.to_string(),
            params,
            timeout,
            at: Instant::now(),
        });
        let next = self.responses.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Err(TransportError::Network("script exhausted".into())))
    }
}

pub fn http_error(status: u16, msg: &str) -> TransportError {
    TransportError::Http {
        status,
        body: Some(json!({"result": "error", "msg": msg})),
    }
}

/// Counts `ERROR`-level events.
#[derive(Clone, Default)]
pub struct ErrorCounter {
    count: Arc<AtomicUsize>,
}

impl ErrorCounter {
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl<S: Subscriber> Layer<S> for ErrorCounter {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == Level::ERROR {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Run `f` with an [`ErrorCounter`] installed and return the error count.
pub fn count_errors<T>(f: impl FnOnce() -> T) -> (T, usize) {
    use tracing_subscriber::layer::SubscriberExt;

    let counter = ErrorCounter::default();
    let subscriber = tracing_subscriber::registry().with(counter.clone());
    let out = tracing::subscriber::with_default(subscriber, f);
    (out, counter.count())
}
