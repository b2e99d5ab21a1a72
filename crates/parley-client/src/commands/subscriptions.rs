use serde_json::json;
use tracing::info;

use parley_net::Channel;
use parley_shared::types::StreamId;
use parley_store::StoreError;

use crate::commands::report;
use crate::error::ClientError;
use crate::state::{lock_session, SharedSession};

/// Subscribe to the stream called `name`, creating it if needed.
///
/// The subscription itself shows up through the event queue.
pub async fn subscribe(
    session: &SharedSession,
    channel: &dyn Channel,
    name: &str,
) -> Result<(), ClientError> {
    let result: Result<(), ClientError> = async {
        let name = name.trim();
        if name.is_empty() {
            return Err(ClientError::Validation("A stream needs to have a name".into()));
        }
        let subscriptions = json!([{ "name": name }]).to_string();
        channel
            .post("/json/users/me/subscriptions", vec![("subscriptions", subscriptions)])
            .await?;
        info!(stream = %name, "Subscribed");
        Ok(())
    }
    .await;
    report(session, "subscribe", result)
}

pub async fn unsubscribe(
    session: &SharedSession,
    channel: &dyn Channel,
    stream_id: StreamId,
) -> Result<(), ClientError> {
    let result: Result<(), ClientError> = async {
        let name = {
            let guard = lock_session(session)?;
            guard
                .stores
                .streams
                .get(stream_id)
                .map(|s| s.name.clone())
                .ok_or(StoreError::UnknownStream(stream_id))?
        };
        let subscriptions = json!([name]).to_string();
        channel
            .del("/json/users/me/subscriptions", vec![("subscriptions", subscriptions)])
            .await?;
        info!(stream_id = %stream_id, "Unsubscribed");
        Ok(())
    }
    .await;
    report(session, "unsubscribe", result)
}
