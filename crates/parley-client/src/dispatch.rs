//! Server event dispatch.
//!
//! Each event from the queue is parsed into a [`ServerEvent`] and applied to
//! the session's stores, after which the affected views are refreshed.
//! Dispatch is synchronous; anything needing the network is queued as a
//! follow-up. A malformed or unknown event is logged and dropped without
//! touching any store.

use serde_json::Value;
use tracing::{debug, error, info, warn};

use parley_shared::constants::UNKNOWN_USER_NAME;
use parley_shared::protocol::{
    FlagChange, MessageFlag, RealmEvent, RealmProperty, RealmUserEvent, ReactionData,
    ReactionEvent, ServerEvent, SettingsEvent, StreamEvent, StreamProperty, SubscriptionEvent,
    SubscriptionProperty, TypingData, TypingEvent, UpdateMessageFlagsEvent, UserGroupEvent,
    UserSettingProperty,
};
use parley_shared::types::{MessageId, StreamId, UserId};
use parley_store::typing::TypingKey;
use parley_store::{Person, Reaction, Subscription, UserGroup};

use crate::error::ClientError;
use crate::live_update::{
    rerender_all_views, update_message_in_all_views, update_starred_view, update_user_full_name,
};
use crate::message_events::{insert_new_messages, remove_messages, update_messages};
use crate::projection::UiUpdate;
use crate::state::Session;
use crate::user_events::update_person;

/// Apply one raw queue event.
///
/// Events at or below the last applied queue id are redeliveries and are
/// skipped.
pub fn handle_raw_event(session: &mut Session, raw: Value) {
    if let Some(id) = raw.get("id").and_then(Value::as_i64) {
        if id <= session.last_event_id {
            debug!(event_id = id, last_event_id = session.last_event_id, "Skipping redelivered event");
            return;
        }
        session.last_event_id = id;
    }

    match serde_json::from_value::<ServerEvent>(raw.clone()) {
        Ok(event) => dispatch_normal_event(session, &event),
        Err(e) => {
            let field = |key: &str| raw.get(key).and_then(Value::as_str).unwrap_or("-").to_string();
            error!(
                event_type = %field("type"),
                op = %field("op"),
                property = %field("property"),
                error = %e,
                "Unhandled server event"
            );
        }
    }
}

/// Apply a parsed event, logging any failure.
pub fn dispatch_normal_event(session: &mut Session, event: &ServerEvent) {
    if let Err(e) = try_dispatch(session, event) {
        error!(event = event.label(), error = %e, "Failed to apply server event");
    }
}

pub fn try_dispatch(session: &mut Session, event: &ServerEvent) -> Result<(), ClientError> {
    debug!(event = event.label(), "Dispatching event");

    match event {
        ServerEvent::RealmUser(RealmUserEvent::Add { person }) => {
            let user_id = person.user_id;
            session.stores.people.add_active_user(Person::from(person.clone()));
            session.emit(UiUpdate::RedrawBuddyList);
            session.emit(UiUpdate::UserRowChanged { user_id });
        }
        ServerEvent::RealmUser(RealmUserEvent::Update { person }) => {
            for update in person.updates() {
                update_person(session, update)?;
            }
        }
        ServerEvent::RealmUser(RealmUserEvent::Remove { person }) => {
            session.stores.people.make_inaccessible(person.user_id)?;
            update_user_full_name(session, person.user_id, UNKNOWN_USER_NAME);
            session.emit(UiUpdate::RedrawBuddyList);
        }

        ServerEvent::Stream(StreamEvent::Create { streams }) => {
            for raw in streams {
                let stream_id = raw.stream_id;
                session.stores.streams.create(Subscription::from_stream(raw.clone(), false));
                session.emit(UiUpdate::StreamCreated { stream_id });
            }
        }
        ServerEvent::Stream(StreamEvent::Update(update)) => {
            let property = StreamProperty::parse(update)?;
            session.stores.streams.update_stream_property(update.stream_id, property)?;
            session.emit(UiUpdate::StreamChanged { stream_id: update.stream_id });
        }
        ServerEvent::Stream(StreamEvent::Delete { stream_ids, streams }) => {
            for stream_id in StreamEvent::deleted_ids(stream_ids, streams) {
                if session.stores.streams.delete(stream_id).is_some() {
                    session.emit(UiUpdate::StreamRemoved { stream_id });
                }
            }
        }

        ServerEvent::Subscription(event) => apply_subscription(session, event)?,

        ServerEvent::Message(event) => insert_new_messages(session, event)?,
        ServerEvent::UpdateMessage(event) => update_messages(session, event)?,
        ServerEvent::DeleteMessage(event) => remove_messages(session, &event.ids()),

        ServerEvent::UpdateMessageFlags(UpdateMessageFlagsEvent::Add(change)) => {
            apply_flag(session, change, true)
        }
        ServerEvent::UpdateMessageFlags(UpdateMessageFlagsEvent::Remove(change)) => {
            apply_flag(session, change, false)
        }

        ServerEvent::Reaction(ReactionEvent::Add(data)) => apply_reaction(session, data, true),
        ServerEvent::Reaction(ReactionEvent::Remove(data)) => apply_reaction(session, data, false),

        ServerEvent::UserGroup(event) => {
            let groups = &mut session.stores.user_groups;
            match event {
                UserGroupEvent::Add { group } => groups.add(UserGroup::from(group.clone())),
                UserGroupEvent::Remove { group_id } => {
                    groups.remove(*group_id)?;
                }
                UserGroupEvent::AddMembers { group_id, user_ids } => {
                    groups.add_members(*group_id, user_ids)?
                }
                UserGroupEvent::RemoveMembers { group_id, user_ids } => {
                    groups.remove_members(*group_id, user_ids)?
                }
                UserGroupEvent::Update { group_id, data } => groups.update(*group_id, data.clone())?,
            }
            session.emit(UiUpdate::GroupsChanged);
        }

        ServerEvent::UserTopic(event) => {
            let changed = session.stores.user_topics.set_policy(
                event.stream_id,
                &event.topic_name,
                event.visibility_policy,
            );
            if changed {
                session.emit(UiUpdate::TopicVisibilityChanged {
                    stream_id: event.stream_id,
                    topic: event.topic_name.clone(),
                });
            }
        }

        ServerEvent::UserStatus(event) => {
            if session.stores.user_status.apply(event.user_id, &event.patch) {
                session.emit(UiUpdate::UserStatusChanged { user_id: event.user_id });
            }
        }

        ServerEvent::Presence(event) => {
            session.stores.presence.update(event.user_id, &event.presence);
            session.emit(UiUpdate::PresenceChanged { user_id: event.user_id });
        }

        ServerEvent::Typing(TypingEvent::Start(data)) => apply_typing(session, data, true)?,
        ServerEvent::Typing(TypingEvent::Stop(data)) => apply_typing(session, data, false)?,

        ServerEvent::Realm(RealmEvent::Update { property, value }) => {
            let property = RealmProperty::parse(property, value.clone())?;
            if session.stores.realm.apply(property) {
                session.emit(UiUpdate::RealmSettingsChanged);
            }
        }
        ServerEvent::Realm(RealmEvent::UpdateDict { property, data }) => {
            let mut changed = false;
            for property in RealmProperty::parse_dict(property, data.clone())? {
                changed |= session.stores.realm.apply(property);
            }
            if changed {
                session.emit(UiUpdate::RealmSettingsChanged);
            }
        }
        ServerEvent::Realm(RealmEvent::Deactivated { realm_id }) => {
            warn!(realm_id, "Realm deactivated");
            session.stores.realm.deactivated = true;
            session.emit(UiUpdate::RealmDeactivated);
        }

        ServerEvent::UserSettings(SettingsEvent::Update { property, value, .. }) => {
            let property = UserSettingProperty::parse(property, value.clone())?;
            let display_wide = matches!(
                property,
                UserSettingProperty::TwentyFourHourTime(_)
                    | UserSettingProperty::ColorScheme(_)
                    | UserSettingProperty::HighContrastMode(_)
            );
            if session.stores.user_settings.apply(property) {
                session.emit(UiUpdate::UserSettingsChanged);
                if display_wide {
                    rerender_all_views(session);
                }
            }
        }
        ServerEvent::RealmUserSettingsDefaults(SettingsEvent::Update { property, value, .. }) => {
            let property = UserSettingProperty::parse(property, value.clone())?;
            if session.stores.realm_user_settings_defaults.apply(property) {
                session.emit(UiUpdate::RealmDefaultsChanged);
            }
        }

        ServerEvent::Heartbeat {} => debug!("Heartbeat"),

        ServerEvent::Restart(event) => {
            info!(
                server_version = event.zulip_version.as_deref().unwrap_or("unknown"),
                immediate = event.immediate,
                "Server restarted"
            );
            session.emit(UiUpdate::ReloadRequired { immediate: event.immediate });
        }
    }

    Ok(())
}

fn apply_subscription(session: &mut Session, event: &SubscriptionEvent) -> Result<(), ClientError> {
    match event {
        SubscriptionEvent::Add { subscriptions } => {
            for raw in subscriptions {
                let stream_id = raw.stream.stream_id;
                session.stores.streams.subscribe(Subscription::from_subscription(raw.clone(), true));
                session.emit(UiUpdate::StreamAdded { stream_id });
            }
        }
        SubscriptionEvent::Remove { subscriptions } => {
            let me = session.stores.current_user.user_id;
            for stream in subscriptions {
                match session.stores.streams.unsubscribe(stream.stream_id, me) {
                    Ok(true) => session.emit(UiUpdate::StreamRemoved { stream_id: stream.stream_id }),
                    Ok(false) => debug!(stream_id = %stream.stream_id, "Already unsubscribed"),
                    Err(e) => warn!(stream_id = %stream.stream_id, error = %e, "Unsubscribe from unknown stream"),
                }
            }
        }
        SubscriptionEvent::Update { stream_id, property, value } => {
            let property = SubscriptionProperty::parse(property, value.clone())?;
            session.stores.streams.update_subscription_property(*stream_id, property)?;
            session.emit(UiUpdate::StreamChanged { stream_id: *stream_id });
        }
        SubscriptionEvent::PeerAdd { stream_ids, user_ids } => {
            update_peers(session, stream_ids, user_ids, true);
        }
        SubscriptionEvent::PeerRemove { stream_ids, user_ids } => {
            update_peers(session, stream_ids, user_ids, false);
        }
    }
    Ok(())
}

/// Subscriber changes for streams we do not know are skipped, not fatal.
fn update_peers(session: &mut Session, stream_ids: &[StreamId], user_ids: &[UserId], add: bool) {
    for &stream_id in stream_ids {
        let result = if add {
            session.stores.streams.add_subscribers(stream_id, user_ids)
        } else {
            session.stores.streams.remove_subscribers(stream_id, user_ids)
        };
        match result {
            Ok(()) => session.emit(UiUpdate::SubscribersChanged { stream_id }),
            Err(e) => warn!(stream_id = %stream_id, error = %e, "Peer update for unknown stream"),
        }
    }
}

fn apply_flag(session: &mut Session, change: &FlagChange, value: bool) {
    let ids: Vec<MessageId> = if change.all {
        session.stores.messages.iter().map(|m| m.id).collect()
    } else {
        change.messages.clone()
    };

    match change.flag {
        MessageFlag::Starred => {
            for id in ids {
                update_starred_view(session, id, value);
            }
        }
        MessageFlag::Read => {
            let mut changed = false;
            for id in ids {
                if let Ok(message) = session.stores.messages.get_mut(id) {
                    changed |= message.flags.read != value;
                    message.flags.read = value;
                }
            }
            if changed {
                session.emit(UiUpdate::UnreadCountsChanged);
            }
        }
        MessageFlag::Collapsed => {
            let mut changed = Vec::new();
            for id in ids {
                if let Ok(message) = session.stores.messages.get_mut(id) {
                    if message.flags.collapsed != value {
                        message.flags.collapsed = value;
                        changed.push(id);
                    }
                }
            }
            update_message_in_all_views(session, &changed);
        }
        MessageFlag::Mentioned | MessageFlag::Other => {
            debug!(flag = ?change.flag, "Ignoring flag change");
        }
    }
}

fn apply_reaction(session: &mut Session, data: &ReactionData, add: bool) {
    let reaction = Reaction {
        user_id: data.user_id,
        emoji_name: data.emoji_name.clone(),
        emoji_code: data.emoji_code.clone(),
        reaction_type: data.reaction_type.clone(),
    };
    let result = if add {
        session.stores.messages.add_reaction(data.message_id, reaction)
    } else {
        session.stores.messages.remove_reaction(data.message_id, &reaction)
    };
    match result {
        Ok(true) => update_message_in_all_views(session, &[data.message_id]),
        Ok(false) => {}
        Err(_) => debug!(message_id = %data.message_id, "Reaction on uncached message"),
    }
}

fn apply_typing(session: &mut Session, data: &TypingData, start: bool) -> Result<(), ClientError> {
    let sender = data.sender.user_id;
    if session.stores.is_me(sender) {
        return Ok(());
    }

    let is_stream = data.message_type.as_deref() == Some("stream") || data.stream_id.is_some();
    let key = if is_stream {
        let stream_id = data.stream_id.ok_or_else(|| ClientError::UnexpectedEvent {
            label: "typing".into(),
            reason: "stream typing notification without stream_id".into(),
        })?;
        TypingKey::Topic { stream_id, topic: data.topic.clone().unwrap_or_default() }
    } else {
        TypingKey::direct(data.recipients.iter().map(|u| u.user_id).collect())
    };

    let changed = if start {
        session.stores.typing.add_typist(key, sender)
    } else {
        session.stores.typing.remove_typist(&key, sender)
    };
    if changed {
        session.emit(UiUpdate::TypingChanged);
    }
    Ok(())
}
