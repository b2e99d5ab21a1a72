//! `realm_user/update`: apply one person patch to the people store, the
//! current-user mirror and every view that shows that person.

use tracing::{debug, info};

use parley_shared::protocol::{PersonUpdate, ProfileFieldValue};
use parley_shared::types::UserId;
use parley_store::StoreError;

use crate::error::ClientError;
use crate::live_update;
use crate::projection::UiUpdate;
use crate::state::Session;

pub fn update_person(session: &mut Session, update: &PersonUpdate) -> Result<(), ClientError> {
    let user_id = update.user_id();
    if !session.stores.people.contains(user_id) {
        return Err(StoreError::UnknownUser(user_id).into());
    }
    let is_me = session.stores.is_me(user_id);

    match update {
        PersonUpdate::FullName { full_name, .. } => {
            if !session.stores.people.set_full_name(user_id, full_name)? {
                return Ok(());
            }
            if is_me {
                session.stores.current_user.full_name = full_name.clone();
                session.emit(UiUpdate::SettingsAccountRefresh);
            }
            live_update::update_user_full_name(session, user_id, full_name);
            session.emit(UiUpdate::RedrawBuddyList);
            session.emit(UiUpdate::UserRowChanged { user_id });
        }

        PersonUpdate::Email { new_email, .. } => {
            if !session.stores.people.set_email(user_id, new_email)? {
                return Ok(());
            }
            if is_me {
                session.stores.current_user.email = new_email.clone();
                session.emit(UiUpdate::SettingsAccountRefresh);
            }
            let ids = session.stores.messages.update_matching(
                |m| m.sender_id == user_id,
                |m| m.sender_email = new_email.clone(),
            );
            live_update::update_message_in_all_views(session, &ids);
            session.emit(UiUpdate::UserRowChanged { user_id });
        }

        PersonUpdate::DeliveryEmail { delivery_email, .. } => {
            session.stores.people.get_mut(user_id)?.delivery_email = delivery_email.clone();
            if is_me {
                session.stores.current_user.delivery_email = delivery_email.clone();
                session.emit(UiUpdate::SettingsAccountRefresh);
            }
        }

        PersonUpdate::Avatar { avatar_url, avatar_version, .. } => {
            let person = session.stores.people.get_mut(user_id)?;
            person.avatar_url = avatar_url.clone();
            person.avatar_version = *avatar_version;
            if is_me {
                session.stores.current_user.avatar_url = avatar_url.clone();
                session.stores.current_user.avatar_version = *avatar_version;
                session.emit(UiUpdate::SettingsAccountRefresh);
            }
            live_update::update_avatar(session, user_id, avatar_url.as_deref());
            session.emit(UiUpdate::RedrawBuddyList);
        }

        PersonUpdate::Role { role, .. } => {
            let person = session.stores.people.get_mut(user_id)?;
            let changed = person.role != *role;
            person.role = *role;
            if is_me && session.stores.current_user.set_role(*role) {
                info!(role = role.code(), "Own role changed");
                session.emit(UiUpdate::DisableOrgWidgets);
            }
            if changed {
                session.emit(UiUpdate::UserRowChanged { user_id });
            } else {
                debug!(user_id = %user_id, "Role unchanged");
            }
        }

        PersonUpdate::Timezone { timezone, .. } => {
            session.stores.people.get_mut(user_id)?.timezone = timezone.clone();
            if is_me {
                session.stores.current_user.timezone = timezone.clone();
            }
            session.emit(UiUpdate::UserRowChanged { user_id });
        }

        PersonUpdate::BotOwner { bot_owner_id, .. } => {
            session.stores.people.get_mut(user_id)?.bot_owner_id = *bot_owner_id;
            session.emit(UiUpdate::BotTableRefresh);
        }

        PersonUpdate::IsActive { is_active: false, .. } => deactivate(session, user_id)?,

        PersonUpdate::IsActive { is_active: true, .. } => {
            if session.stores.people.reactivate(user_id)? {
                info!(user_id = %user_id, "User reactivated");
                session.emit(UiUpdate::RedrawBuddyList);
                emit_roster_refresh(session, user_id);
            }
        }

        PersonUpdate::IsBillingAdmin { is_billing_admin, .. } => {
            session.stores.people.get_mut(user_id)?.is_billing_admin = *is_billing_admin;
            if is_me {
                session.stores.current_user.is_billing_admin = *is_billing_admin;
                session.emit(UiUpdate::SettingsAccountRefresh);
            }
        }

        PersonUpdate::CustomProfileField { field, .. } => {
            let person = session.stores.people.get_mut(user_id)?;
            let key = field.id.to_string();
            match &field.value {
                Some(value) => {
                    person.profile_data.insert(
                        key,
                        ProfileFieldValue {
                            value: value.clone(),
                            rendered_value: field.rendered_value.clone(),
                        },
                    );
                }
                None => {
                    person.profile_data.remove(&key);
                }
            }
            session.emit(UiUpdate::UserRowChanged { user_id });
        }
    }

    Ok(())
}

fn deactivate(session: &mut Session, user_id: UserId) -> Result<(), ClientError> {
    if !session.stores.people.deactivate(user_id)? {
        debug!(user_id = %user_id, "User already inactive");
        return Ok(());
    }
    info!(user_id = %user_id, "User deactivated");

    if !session.stores.user_groups.remove_user_from_all(user_id).is_empty() {
        session.emit(UiUpdate::GroupsChanged);
    }
    let mut streams = session.stores.streams.remove_user_from_all(user_id);
    streams.sort();
    for stream_id in streams {
        session.emit(UiUpdate::SubscribersChanged { stream_id });
    }
    session.stores.presence.remove(user_id);
    session.emit(UiUpdate::RedrawBuddyList);
    emit_roster_refresh(session, user_id);
    Ok(())
}

fn emit_roster_refresh(session: &mut Session, user_id: UserId) {
    let is_bot = session
        .stores
        .people
        .get(user_id)
        .is_some_and(|p| p.is_bot);
    if is_bot {
        session.emit(UiUpdate::BotTableRefresh);
    } else {
        session.emit(UiUpdate::ExportConsentRefresh);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{session_with_people, ME, OTHER};
    use parley_shared::types::{GroupId, Role, StreamId};
    use parley_shared::protocol::PersonPatch;
    use parley_store::UserGroup;

    fn patch(value: serde_json::Value) -> PersonUpdate {
        let mut patch: PersonPatch = serde_json::from_value(value).unwrap();
        assert_eq!(patch.0.len(), 1);
        patch.0.remove(0)
    }

    #[test]
    fn test_full_name_for_self_updates_mirror() {
        let (mut session, recorder) = session_with_people();
        update_person(&mut session, &patch(serde_json::json!({"user_id": ME.0, "full_name": "New"}))).unwrap();

        assert_eq!(session.stores.people.get(ME).unwrap().full_name, "New");
        assert_eq!(session.stores.current_user.full_name, "New");
        assert_eq!(recorder.count(|u| *u == UiUpdate::SettingsAccountRefresh), 1);
        assert_eq!(recorder.count(|u| *u == UiUpdate::RedrawBuddyList), 1);
    }

    #[test]
    fn test_full_name_for_other_leaves_mirror() {
        let (mut session, recorder) = session_with_people();
        let before = session.stores.current_user.clone();
        update_person(&mut session, &patch(serde_json::json!({"user_id": OTHER.0, "full_name": "New"}))).unwrap();

        assert_eq!(session.stores.people.get(OTHER).unwrap().full_name, "New");
        assert_eq!(session.stores.current_user, before);
        assert_eq!(recorder.count(|u| *u == UiUpdate::SettingsAccountRefresh), 0);
        assert_eq!(recorder.count(|u| *u == UiUpdate::RedrawBuddyList), 1);
    }

    #[test]
    fn test_role_reapplied_fires_cascade_once() {
        let (mut session, recorder) = session_with_people();
        let admin = patch(serde_json::json!({"user_id": ME.0, "role": 200}));

        update_person(&mut session, &admin).unwrap();
        let first = session.stores.current_user.clone();
        update_person(&mut session, &admin).unwrap();

        assert_eq!(session.stores.current_user, first);
        assert!(first.is_admin && !first.is_owner && !first.is_guest);
        assert_eq!(session.stores.current_user.role, Role::Administrator);
        assert_eq!(recorder.count(|u| *u == UiUpdate::DisableOrgWidgets), 1);
    }

    #[test]
    fn test_unknown_user_mutates_nothing() {
        let (mut session, recorder) = session_with_people();
        let before = format!("{:?}", session.stores);
        let result = update_person(&mut session, &patch(serde_json::json!({"user_id": 999, "full_name": "Ghost"})));

        assert!(matches!(result, Err(ClientError::Store(StoreError::UnknownUser(UserId(999))))));
        assert_eq!(format!("{:?}", session.stores), before);
        assert!(recorder.drain().is_empty());
    }

    #[test]
    fn test_deactivation_cleans_up_once() {
        let (mut session, recorder) = session_with_people();
        session.stores.user_groups.add(UserGroup {
            id: GroupId(1),
            name: "hamlet fans".into(),
            description: String::new(),
            members: [OTHER].into_iter().collect(),
            is_system_group: false,
        });
        session.stores.streams.add_subscribers(StreamId(1), &[OTHER]).unwrap();

        let off = patch(serde_json::json!({"user_id": OTHER.0, "is_active": false}));
        update_person(&mut session, &off).unwrap();
        update_person(&mut session, &off).unwrap();

        assert!(!session.stores.people.is_active(OTHER));
        assert!(session.stores.user_groups.get(GroupId(1)).unwrap().members.is_empty());
        assert!(!session.stores.streams.get(StreamId(1)).unwrap().subscribers.contains(&OTHER));
        assert_eq!(recorder.count(|u| *u == UiUpdate::ExportConsentRefresh), 1);
        assert_eq!(recorder.count(|u| *u == UiUpdate::GroupsChanged), 1);
    }

    #[test]
    fn test_custom_profile_field_cleared() {
        let (mut session, _) = session_with_people();
        let set = patch(serde_json::json!({"user_id": OTHER.0, "custom_profile_field": {"id": 3, "value": "Denmark"}}));
        update_person(&mut session, &set).unwrap();
        assert_eq!(session.stores.people.get(OTHER).unwrap().profile_data["3"].value, "Denmark");

        let clear = patch(serde_json::json!({"user_id": OTHER.0, "custom_profile_field": {"id": 3, "value": null}}));
        update_person(&mut session, &clear).unwrap();
        assert!(session.stores.people.get(OTHER).unwrap().profile_data.is_empty());
    }
}
