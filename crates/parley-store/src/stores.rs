//! The single owner of every entity store for one session.

use tracing::{info, warn};

use parley_shared::protocol::InitialState;
use parley_shared::types::UserId;

use crate::current_user::CurrentUser;
use crate::error::{Result, StoreError};
use crate::messages::MessageStore;
use crate::models::{Person, Subscription, UserGroup};
use crate::people::PeopleStore;
use crate::presence::PresenceStore;
use crate::realm::RealmSettings;
use crate::settings::UserSettings;
use crate::streams::StreamStore;
use crate::typing::TypingStore;
use crate::user_groups::UserGroupStore;
use crate::user_status::UserStatusStore;
use crate::user_topics::UserTopicStore;

#[derive(Debug, Clone)]
pub struct Stores {
    pub people: PeopleStore,
    pub current_user: CurrentUser,
    pub streams: StreamStore,
    pub messages: MessageStore,
    pub user_groups: UserGroupStore,
    pub user_topics: UserTopicStore,
    pub user_status: UserStatusStore,
    pub presence: PresenceStore,
    pub typing: TypingStore,
    pub realm: RealmSettings,
    pub user_settings: UserSettings,
    pub realm_user_settings_defaults: UserSettings,
}

impl Stores {
    /// Empty stores around a known current user.
    pub fn new(me: Person) -> Self {
        let current_user = CurrentUser::from_person(&me);
        let mut people = PeopleStore::new();
        people.add_active_user(me);
        Self {
            people,
            current_user,
            streams: StreamStore::new(),
            messages: MessageStore::new(),
            user_groups: UserGroupStore::new(),
            user_topics: UserTopicStore::new(),
            user_status: UserStatusStore::new(),
            presence: PresenceStore::new(),
            typing: TypingStore::new(),
            realm: RealmSettings::default(),
            user_settings: UserSettings::default(),
            realm_user_settings_defaults: UserSettings::default(),
        }
    }

    /// Populate every store from a register snapshot.
    ///
    /// Fails if the snapshot does not contain the current user.
    pub fn from_initial_state(state: InitialState) -> Result<Self> {
        let me_id = state.user_id;
        let me = state
            .realm_users
            .iter()
            .find(|p| p.user_id == me_id)
            .cloned()
            .ok_or(StoreError::UnknownUser(me_id))?;

        let mut stores = Self::new(Person::from(me));

        for raw in state.realm_users {
            stores.people.add_active_user(Person::from(raw));
        }
        for raw in state.realm_non_active_users {
            stores.people.add_inactive_user(Person::from(raw));
        }
        for raw in state.subscriptions {
            stores.streams.subscribe(Subscription::from_subscription(raw, true));
        }
        for raw in state.unsubscribed {
            stores.streams.create(Subscription::from_subscription(raw, false));
        }
        for raw in state.never_subscribed {
            stores.streams.create(Subscription::from_stream(raw, false));
        }
        for raw in state.realm_user_groups {
            stores.user_groups.add(UserGroup::from(raw));
        }
        for topic in state.user_topics {
            stores
                .user_topics
                .set_policy(topic.stream_id, &topic.topic_name, topic.visibility_policy);
        }
        for (key, patch) in &state.user_status {
            match key.parse::<u64>() {
                Ok(id) => {
                    stores.user_status.apply(UserId(id), patch);
                }
                Err(_) => warn!(key = %key, "Ignoring user status with non-numeric key"),
            }
        }
        for (key, clients) in &state.presences {
            match key.parse::<u64>() {
                Ok(id) => stores.presence.update(UserId(id), clients),
                Err(_) => warn!(key = %key, "Ignoring presence with non-numeric key"),
            }
        }
        stores.realm = RealmSettings::from_snapshot(&state.realm);
        stores.user_settings = UserSettings::from_snapshot(&state.user_settings);
        stores.realm_user_settings_defaults =
            UserSettings::from_snapshot(&state.realm_user_settings_defaults);

        info!(
            users = stores.people.len(),
            streams = stores.streams.subscribed().count(),
            "Loaded initial state"
        );
        Ok(stores)
    }

    pub fn is_me(&self, user_id: UserId) -> bool {
        self.current_user.user_id == user_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_initial_state() {
        let state: InitialState = serde_json::from_value(json!({
            "queue_id": "q1",
            "last_event_id": -1,
            "user_id": 1,
            "realm_users": [
                {"user_id": 1, "full_name": "Me", "email": "me@example.com", "role": 200},
                {"user_id": 2, "full_name": "Bo", "email": "bo@example.com", "role": 400}
            ],
            "realm_non_active_users": [
                {"user_id": 3, "full_name": "Gone", "email": "gone@example.com", "role": 400}
            ],
            "subscriptions": [
                {"stream_id": 10, "name": "general", "color": "#76ce90", "subscribers": [1, 2]}
            ],
            "never_subscribed": [{"stream_id": 11, "name": "random"}],
            "user_status": {"2": {"status_text": "out"}},
            "presences": {"2": {"website": {"status": "active", "timestamp": 5}}},
            "realm": {"name": "Acme"},
            "user_settings": {"twenty_four_hour_time": true}
        }))
        .unwrap();

        let stores = Stores::from_initial_state(state).unwrap();
        assert!(stores.current_user.is_admin);
        assert!(stores.people.is_active(UserId(2)));
        assert!(!stores.people.is_active(UserId(3)));
        assert_eq!(stores.streams.subscribed().count(), 1);
        assert!(stores.streams.get(parley_shared::types::StreamId(11)).is_some());
        assert_eq!(stores.user_status.get(UserId(2)).unwrap().status_text, "out");
        assert_eq!(stores.realm.name, "Acme");
        assert!(stores.user_settings.twenty_four_hour_time);
    }

    #[test]
    fn test_initial_state_without_me_fails() {
        let state: InitialState = serde_json::from_value(json!({"user_id": 5})).unwrap();
        assert!(matches!(
            Stores::from_initial_state(state),
            Err(StoreError::UnknownUser(UserId(5)))
        ));
    }
}
