//! Patch cached messages and every rendered list after a change.

use tracing::debug;

use parley_shared::types::{MessageId, UserId};

use crate::projection::UiUpdate;
use crate::state::Session;

/// Re-render the rows of `ids` in every mounted list.
pub fn update_message_in_all_views(session: &mut Session, ids: &[MessageId]) {
    if ids.is_empty() {
        return;
    }
    for list in session.lists.all_rendered_message_lists_mut() {
        list.rerender_messages(ids, &session.stores);
    }
}

/// Rebuild every mounted list from scratch, for display-wide changes.
pub fn rerender_all_views(session: &mut Session) {
    for list in session.lists.all_rendered_message_lists_mut() {
        list.rerender_view(&session.stores);
    }
}

pub fn update_user_full_name(session: &mut Session, user_id: UserId, full_name: &str) {
    let ids = session.stores.messages.update_matching(
        |m| m.sender_id == user_id,
        |m| m.sender_full_name = full_name.to_string(),
    );
    debug!(user_id = %user_id, messages = ids.len(), "Updated sender name");
    update_message_in_all_views(session, &ids);
}

pub fn update_avatar(session: &mut Session, user_id: UserId, avatar_url: Option<&str>) {
    let ids = session.stores.messages.update_matching(
        |m| m.sender_id == user_id,
        |m| m.avatar_url = avatar_url.map(str::to_string),
    );
    update_message_in_all_views(session, &ids);
}

/// Apply a starred flag change to the cache and every row showing it.
pub fn update_starred_view(session: &mut Session, id: MessageId, starred: bool) {
    let Ok(message) = session.stores.messages.get_mut(id) else {
        debug!(message_id = %id, "Starred change for uncached message");
        return;
    };
    if message.flags.starred == starred {
        return;
    }
    message.flags.starred = starred;
    update_message_in_all_views(session, &[id]);
    session.emit(UiUpdate::StarredCountChanged);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{Filter, Term};
    use crate::test_support::session_with_messages;
    use parley_shared::types::StreamId;

    #[test]
    fn test_full_name_reaches_both_lists() {
        let (mut session, _) = session_with_messages(&[1, 2]);
        session.narrow(Filter::new(vec![Term::Stream(StreamId(1))]));

        update_user_full_name(&mut session, UserId(10), "Othello, Moor");
        for list in session.lists.all_rendered_message_lists() {
            assert!(list.view.rows().iter().all(|r| r.sender_name == "Othello, Moor"));
        }
        assert!(session
            .stores
            .messages
            .iter()
            .all(|m| m.sender_full_name == "Othello, Moor"));
    }

    #[test]
    fn test_starring_twice_emits_once() {
        let (mut session, recorder) = session_with_messages(&[1]);
        update_starred_view(&mut session, MessageId::from(1), true);
        update_starred_view(&mut session, MessageId::from(1), true);

        assert!(session.lists.home().view.rows()[0].starred);
        assert_eq!(recorder.count(|u| *u == UiUpdate::StarredCountChanged), 1);
    }

    #[test]
    fn test_rerender_all_views_counts() {
        let (mut session, _) = session_with_messages(&[1]);
        let before = session.lists.home().view.full_renders();
        rerender_all_views(&mut session);
        assert_eq!(session.lists.home().view.full_renders(), before + 1);
    }
}
