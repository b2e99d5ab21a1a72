//! UI refresh requests.
//!
//! Handlers never touch widgets directly. Anything outside the message lists
//! that needs redrawing is announced as a [`UiUpdate`] through the session's
//! [`Projector`], and the host renders it however it likes.

use std::sync::{Arc, Mutex};

use serde::Serialize;
use tracing::debug;

use parley_shared::types::{MessageId, StreamId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BannerLevel {
    Error,
    Success,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UiUpdate {
    RedrawBuddyList,
    UserRowChanged { user_id: UserId },
    /// The current user's own account settings panel.
    SettingsAccountRefresh,
    /// The current user's role changed; admin-only widgets must re-check.
    DisableOrgWidgets,
    BotTableRefresh,
    ExportConsentRefresh,
    StreamCreated { stream_id: StreamId },
    StreamAdded { stream_id: StreamId },
    StreamRemoved { stream_id: StreamId },
    StreamChanged { stream_id: StreamId },
    SubscribersChanged { stream_id: StreamId },
    GroupsChanged,
    TopicVisibilityChanged { stream_id: StreamId, topic: String },
    UserStatusChanged { user_id: UserId },
    PresenceChanged { user_id: UserId },
    TypingChanged,
    RealmSettingsChanged,
    UserSettingsChanged,
    RealmDefaultsChanged,
    UnreadCountsChanged,
    StarredCountChanged,
    /// New messages matched neither the current view nor home.
    MessagesVisibleElsewhere { ids: Vec<MessageId> },
    Banner { level: BannerLevel, text: String },
    RealmDeactivated,
    ReloadRequired { immediate: bool },
}

impl UiUpdate {
    pub fn error_banner(text: impl Into<String>) -> Self {
        Self::Banner {
            level: BannerLevel::Error,
            text: text.into(),
        }
    }

    pub fn success_banner(text: impl Into<String>) -> Self {
        Self::Banner {
            level: BannerLevel::Success,
            text: text.into(),
        }
    }
}

/// Sink for [`UiUpdate`]s.
pub trait Projector: Send {
    fn emit(&mut self, update: UiUpdate);
}

/// Logs every update; used when no host is attached.
#[derive(Debug, Default)]
pub struct TracingProjector;

impl Projector for TracingProjector {
    fn emit(&mut self, update: UiUpdate) {
        debug!(?update, "UI update");
    }
}

/// Collects updates in a shared buffer the host can drain.
#[derive(Debug, Clone, Default)]
pub struct RecordingProjector {
    updates: Arc<Mutex<Vec<UiUpdate>>>,
}

impl RecordingProjector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return everything recorded so far.
    pub fn drain(&self) -> Vec<UiUpdate> {
        match self.updates.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(_) => Vec::new(),
        }
    }

    pub fn count(&self, pred: impl Fn(&UiUpdate) -> bool) -> usize {
        match self.updates.lock() {
            Ok(guard) => guard.iter().filter(|u| pred(u)).count(),
            Err(_) => 0,
        }
    }
}

impl Projector for RecordingProjector {
    fn emit(&mut self, update: UiUpdate) {
        if let Ok(mut guard) = self.updates.lock() {
            guard.push(update);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_projector_shares_buffer() {
        let recorder = RecordingProjector::new();
        let mut sink = recorder.clone();
        sink.emit(UiUpdate::RedrawBuddyList);
        sink.emit(UiUpdate::error_banner("nope"));

        assert_eq!(recorder.count(|u| matches!(u, UiUpdate::Banner { .. })), 1);
        assert_eq!(recorder.drain().len(), 2);
        assert!(recorder.drain().is_empty());
    }

    #[test]
    fn test_updates_serialize_with_kind_tag() {
        let json = serde_json::to_value(UiUpdate::UserRowChanged { user_id: UserId(7) }).unwrap();
        assert_eq!(json["kind"], "user_row_changed");
        assert_eq!(json["user_id"], 7);
    }
}
