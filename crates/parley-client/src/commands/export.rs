use serde_json::Value;
use tracing::info;

use parley_net::{Channel, TransportError};

use crate::commands::{announce, report};
use crate::error::ClientError;
use crate::state::{lock_session, SharedSession};

/// Ask the server to build a full export of the organization.
///
/// Only administrators may do this. Returns the export id.
pub async fn start_realm_export(
    session: &SharedSession,
    channel: &dyn Channel,
) -> Result<u64, ClientError> {
    let result: Result<u64, ClientError> = async {
        let is_admin = lock_session(session)?.stores.current_user.is_admin;
        if !is_admin {
            return Err(ClientError::Validation(
                "Only organization administrators can export data".into(),
            ));
        }
        let body = channel.post("/json/export/realm", Vec::new()).await?;
        let id = body
            .get("id")
            .and_then(Value::as_u64)
            .ok_or_else(|| TransportError::Decode("export response without id".into()))?;
        info!(export_id = id, "Realm export started");
        Ok(id)
    }
    .await;

    let id = report(session, "start_realm_export", result)?;
    announce(session, "Export started. Check back in a few minutes.");
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::{BannerLevel, UiUpdate};
    use crate::test_support::{session_with_messages, ScriptedChannel};
    use parley_shared::types::Role;
    use serde_json::json;

    #[tokio::test]
    async fn test_member_cannot_export() {
        let (session, _) = session_with_messages(&[]);
        let channel = ScriptedChannel::new(Vec::new());

        let result = start_realm_export(&session.into_shared(), channel.as_ref()).await;

        assert!(matches!(result, Err(ClientError::Validation(_))));
        assert!(channel.seen().is_empty());
    }

    #[tokio::test]
    async fn test_admin_export_returns_id() {
        let (mut session, recorder) = session_with_messages(&[]);
        session.stores.current_user.set_role(Role::Administrator);
        let channel = ScriptedChannel::new(vec![Ok(json!({"result": "success", "id": 17}))]);

        let id = start_realm_export(&session.into_shared(), channel.as_ref()).await.unwrap();

        assert_eq!(id, 17);
        assert_eq!(channel.seen()[0].path, "/json/export/realm");
        assert_eq!(
            recorder.count(|u| matches!(u, UiUpdate::Banner { level: BannerLevel::Success, .. })),
            1
        );
    }
}
