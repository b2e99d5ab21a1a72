use tracing::info;

use parley_net::Channel;
use parley_shared::types::StreamId;

use crate::commands::report;
use crate::error::ClientError;
use crate::state::SharedSession;

pub async fn rename_stream(
    session: &SharedSession,
    channel: &dyn Channel,
    stream_id: StreamId,
    new_name: &str,
) -> Result<(), ClientError> {
    let result: Result<(), ClientError> = async {
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return Err(ClientError::Validation("A stream needs to have a name".into()));
        }
        channel
            .patch(&format!("/json/streams/{stream_id}"), vec![("new_name", new_name.to_string())])
            .await?;
        info!(stream_id = %stream_id, new_name = %new_name, "Stream renamed");
        Ok(())
    }
    .await;
    report(session, "rename_stream", result)
}

/// Descriptions are single-line.
pub async fn change_stream_description(
    session: &SharedSession,
    channel: &dyn Channel,
    stream_id: StreamId,
    description: &str,
) -> Result<(), ClientError> {
    let result: Result<(), ClientError> = async {
        if description.contains('\n') {
            return Err(ClientError::Validation(
                "Stream descriptions cannot contain line breaks".into(),
            ));
        }
        channel
            .patch(
                &format!("/json/streams/{stream_id}"),
                vec![("description", description.to_string())],
            )
            .await?;
        info!(stream_id = %stream_id, "Stream description changed");
        Ok(())
    }
    .await;
    report(session, "change_stream_description", result)
}
