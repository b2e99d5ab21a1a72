//! Session state shared between the event loop and user commands.
//!
//! A [`Session`] is wrapped in `Arc<Mutex<>>` ([`SharedSession`]). Event
//! handlers run synchronously under the lock; anything that has to wait on
//! the network is queued as a [`FollowUp`] and run after the lock is
//! released.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info};

use parley_shared::types::MessageId;
use parley_store::Stores;

use crate::error::ClientError;
use crate::filter::Filter;
use crate::message_list::ListId;
use crate::message_lists::MessageLists;
use crate::projection::{Projector, UiUpdate};

pub type SharedSession = Arc<Mutex<Session>>;

/// Lock the session, mapping poisoning to [`ClientError::LockPoisoned`].
pub fn lock_session(session: &SharedSession) -> Result<MutexGuard<'_, Session>, ClientError> {
    session.lock().map_err(|_| ClientError::LockPoisoned)
}

/// Background work requested by a handler.
#[derive(Debug, Clone, PartialEq)]
pub enum FollowUp {
    /// Ask the server which of `ids` belong in the server-filtered list.
    NarrowCheck { list_id: ListId, ids: Vec<MessageId> },
    /// Persist a collapse toggle.
    SetCollapsed { id: MessageId, collapsed: bool },
}

pub struct Session {
    pub stores: Stores,
    pub lists: MessageLists,
    projector: Box<dyn Projector>,
    pub(crate) last_event_id: i64,
    followups: Vec<FollowUp>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.stores.current_user.user_id)
            .field("last_event_id", &self.last_event_id)
            .field("pending_followups", &self.followups.len())
            .finish()
    }
}

impl Session {
    pub fn new(stores: Stores, projector: Box<dyn Projector>) -> Self {
        let mut lists = MessageLists::new();
        fill_home(&mut lists, &stores);
        Self {
            stores,
            lists,
            projector,
            last_event_id: -1,
            followups: Vec::new(),
        }
    }

    /// Start deduplicating after the queue position returned by register.
    pub fn with_last_event_id(mut self, last_event_id: i64) -> Self {
        self.last_event_id = last_event_id;
        self
    }

    pub fn into_shared(self) -> SharedSession {
        Arc::new(Mutex::new(self))
    }

    /// Highest queue event id applied so far.
    pub fn last_event_id(&self) -> i64 {
        self.last_event_id
    }

    /// Replace every store after re-registering a queue.
    ///
    /// The current narrow keeps its filter but is rebuilt from the new cache.
    pub fn reset(&mut self, stores: Stores, last_event_id: i64) {
        info!(last_event_id, "Resetting session state");
        let narrow = Some(self.lists.current().filter().clone()).filter(|f| !f.is_home());
        self.lists.update_current_message_list(None);
        self.stores = stores;
        self.last_event_id = last_event_id;
        self.followups.clear();

        let home = self.lists.home_mut();
        let stale = home.items().to_vec();
        home.remove_messages(&stale);
        fill_home(&mut self.lists, &self.stores);
        if let Some(filter) = narrow {
            self.narrow(filter);
        }
    }

    pub fn emit(&mut self, update: UiUpdate) {
        self.projector.emit(update);
    }

    pub(crate) fn queue(&mut self, followup: FollowUp) {
        debug!(?followup, "Queued follow-up");
        self.followups.push(followup);
    }

    pub fn take_followups(&mut self) -> Vec<FollowUp> {
        std::mem::take(&mut self.followups)
    }

    /// Mount a new list for `filter` as the current view, or return home.
    ///
    /// Returns the new list's id.
    pub fn narrow(&mut self, filter: Filter) -> ListId {
        if filter.is_home() {
            self.lists.update_current_message_list(None);
            return ListId::HOME;
        }
        let list = self.lists.create_list(filter, &self.stores);
        let id = list.id();
        self.lists.update_current_message_list(Some(list));
        id
    }
}

/// Put every cached message into the home list.
fn fill_home(lists: &mut MessageLists, stores: &Stores) {
    let mut ids: Vec<MessageId> = stores.messages.iter().map(|m| m.id).collect();
    ids.sort();
    lists.home_mut().add_messages(&ids, stores);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Term;
    use crate::test_support::session_with_messages;
    use parley_shared::types::StreamId;

    #[test]
    fn test_narrow_and_back() {
        let (mut session, _) = session_with_messages(&[1, 2]);
        let id = session.narrow(Filter::new(vec![Term::Stream(StreamId(1))]));
        assert!(session.lists.is_current_narrow(id));
        assert_eq!(session.lists.current().view.rows().len(), 2);

        assert_eq!(session.narrow(Filter::home()), ListId::HOME);
        assert!(session.lists.is_current(ListId::HOME));
    }

    #[test]
    fn test_reset_keeps_current_narrow() {
        let (mut session, _) = session_with_messages(&[1]);
        let filter = Filter::new(vec![Term::Stream(StreamId(1))]);
        let old_id = session.narrow(filter.clone());
        let old_token = session.lists.current().cancel_token();

        let fresh = crate::test_support::stores_with_messages(&[]);
        session.reset(fresh, 40);

        assert_eq!(session.last_event_id(), 40);
        assert_eq!(session.lists.current().filter(), &filter);
        assert_ne!(session.lists.current().id(), old_id);
        assert!(old_token.is_cancelled());
        assert!(session.lists.current().is_empty());
        assert!(session.lists.home().is_empty());
    }

    #[test]
    fn test_take_followups_drains() {
        let (mut session, _) = session_with_messages(&[]);
        session.queue(FollowUp::SetCollapsed { id: MessageId::from(1), collapsed: true });
        assert_eq!(session.take_followups().len(), 1);
        assert!(session.take_followups().is_empty());
    }
}
