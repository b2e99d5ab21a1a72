//! New, edited and deleted messages.

use chrono::Utc;
use tracing::{debug, warn};

use parley_shared::protocol::{timestamp_to_datetime, NewMessageEvent, Recipient, UpdateMessageEvent};
use parley_shared::types::MessageId;
use parley_store::{Message, MessageFlags};

use crate::error::ClientError;
use crate::live_update::update_message_in_all_views;
use crate::projection::UiUpdate;
use crate::state::{FollowUp, Session};

/// Cache a new message and add it to every mounted list it belongs in.
///
/// Lists whose filter needs the server get a [`FollowUp::NarrowCheck`]
/// instead. A matching local echo is swapped for the confirmed message.
pub fn insert_new_messages(session: &mut Session, event: &NewMessageEvent) -> Result<(), ClientError> {
    let message = Message::from_raw(event.message.clone(), &event.flags)?;
    let id = message.id;
    let unread = !message.flags.read && !session.stores.is_me(message.sender_id);

    if let Some(local) = event
        .local_message_id
        .as_deref()
        .and_then(|raw| raw.parse::<MessageId>().ok())
        .filter(|local| local.is_pending() && session.stores.messages.contains(*local))
    {
        debug!(local_id = %local, message_id = %id, "Confirming local echo");
        session.stores.messages.reify(local, message)?;
        for list in session.lists.all_rendered_message_lists_mut() {
            list.replace_id(local, id, &session.stores);
        }
        // Server-filtered lists never held the echo.
        add_to_lists(session, &[id]);
        return Ok(());
    }

    if !session.stores.messages.insert(message) {
        debug!(message_id = %id, "Message already cached");
        return Ok(());
    }
    add_to_lists(session, &[id]);

    if unread {
        session.emit(UiUpdate::UnreadCountsChanged);
    }
    Ok(())
}

fn add_to_lists(session: &mut Session, ids: &[MessageId]) {
    let mut checks = Vec::new();
    let mut placed_anywhere = false;
    // The server cannot match ids it has not assigned yet.
    let confirmed: Vec<MessageId> = ids.iter().copied().filter(|id| !id.is_pending()).collect();

    for list in session.lists.all_rendered_message_lists_mut() {
        if !list.filter().can_apply_locally() {
            if !confirmed.is_empty() {
                checks.push(FollowUp::NarrowCheck { list_id: list.id(), ids: confirmed.clone() });
            }
            continue;
        }
        let matching: Vec<MessageId> = ids
            .iter()
            .copied()
            .filter(|id| {
                session
                    .stores
                    .messages
                    .get(*id)
                    .is_some_and(|m| list.filter().matches(m))
            })
            .collect();
        if !matching.is_empty() {
            placed_anywhere = true;
            list.add_messages(&matching, &session.stores);
        }
    }

    if !placed_anywhere && checks.is_empty() {
        session.emit(UiUpdate::MessagesVisibleElsewhere { ids: ids.to_vec() });
    }
    for check in checks {
        session.queue(check);
    }
}

/// Apply a content edit and/or a topic or stream move.
pub fn update_messages(session: &mut Session, event: &UpdateMessageEvent) -> Result<(), ClientError> {
    let mut touched = Vec::new();

    for id in event.affected_ids() {
        let Ok(message) = session.stores.messages.get_mut(id) else {
            debug!(message_id = %id, "Edit for uncached message");
            continue;
        };

        if id == event.message_id {
            if let Some(content) = &event.rendered_content {
                message.content = content.clone();
            }
        }
        if !event.rendering_only {
            if let Some(ts) = event.edit_timestamp {
                message.last_edit_timestamp = Some(timestamp_to_datetime(ts));
            }
            if let Recipient::Stream { stream_id, topic } = &mut message.recipient {
                if let Some(new_stream) = event.new_stream_id {
                    *stream_id = new_stream;
                }
                if let Some(new_topic) = &event.topic {
                    *topic = new_topic.clone();
                }
            }
        }
        touched.push(id);
    }

    if touched.is_empty() {
        return Ok(());
    }

    // Moves can take a message out of a narrow.
    for list in session.lists.all_rendered_message_lists_mut() {
        if !list.filter().can_apply_locally() {
            continue;
        }
        let gone: Vec<MessageId> = touched
            .iter()
            .copied()
            .filter(|id| {
                list.contains(*id)
                    && session
                        .stores
                        .messages
                        .get(*id)
                        .is_some_and(|m| !list.filter().matches(m))
            })
            .collect();
        list.remove_messages(&gone);
    }
    update_message_in_all_views(session, &touched);
    Ok(())
}

/// Drop deleted messages from the cache and every list.
pub fn remove_messages(session: &mut Session, ids: &[MessageId]) {
    let mut had_unread = false;
    for id in ids {
        if let Some(message) = session.stores.messages.remove(*id) {
            had_unread |= !message.flags.read;
        }
    }
    for list in session.lists.all_rendered_message_lists_mut() {
        list.remove_messages(ids);
    }
    if had_unread {
        session.emit(UiUpdate::UnreadCountsChanged);
    }
}

/// Optimistically show a message the user just sent.
pub fn insert_local_message(session: &mut Session, recipient: Recipient, content: &str) -> MessageId {
    let id = session.stores.messages.next_local_id();
    let me = &session.stores.current_user;
    let message = Message {
        id,
        sender_id: me.user_id,
        sender_full_name: me.full_name.clone(),
        sender_email: me.email.clone(),
        avatar_url: me.avatar_url.clone(),
        content: content.to_string(),
        recipient,
        timestamp: Utc::now(),
        flags: MessageFlags { read: true, ..MessageFlags::default() },
        condensed: None,
        reactions: Vec::new(),
        locally_echoed: true,
        last_edit_timestamp: None,
        match_content: None,
        match_topic: None,
    };
    if !session.stores.messages.insert(message) {
        warn!(local_id = %id, "Local id collided with a cached message");
    }
    add_to_lists(session, &[id]);
    id
}
