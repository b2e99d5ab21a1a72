//! Stream and subscription registry, keyed by stream id.

use std::collections::HashMap;

use tracing::debug;

use parley_shared::protocol::{StreamProperty, SubscriptionProperty};
use parley_shared::types::{StreamId, UserId};

use crate::error::{Result, StoreError};
use crate::models::Subscription;

#[derive(Debug, Clone, Default)]
pub struct StreamStore {
    subs: HashMap<StreamId, Subscription>,
}

impl StreamStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a stream the user is not subscribed to, unless already known.
    pub fn create(&mut self, sub: Subscription) {
        self.subs.entry(sub.stream_id).or_insert(sub);
    }

    /// Record a subscription, replacing any previous view of the stream.
    pub fn subscribe(&mut self, mut sub: Subscription) {
        sub.subscribed = true;
        debug!(stream_id = %sub.stream_id, name = %sub.name, "Subscribed");
        self.subs.insert(sub.stream_id, sub);
    }

    /// Mark a stream unsubscribed; the stream itself stays known.
    pub fn unsubscribe(&mut self, stream_id: StreamId, me: UserId) -> Result<bool> {
        let sub = self.get_mut(stream_id)?;
        let was = sub.subscribed;
        sub.subscribed = false;
        sub.subscribers.remove(&me);
        Ok(was)
    }

    pub fn delete(&mut self, stream_id: StreamId) -> Option<Subscription> {
        self.subs.remove(&stream_id)
    }

    pub fn get(&self, stream_id: StreamId) -> Option<&Subscription> {
        self.subs.get(&stream_id)
    }

    pub fn get_mut(&mut self, stream_id: StreamId) -> Result<&mut Subscription> {
        self.subs
            .get_mut(&stream_id)
            .ok_or(StoreError::UnknownStream(stream_id))
    }

    pub fn subscribed(&self) -> impl Iterator<Item = &Subscription> {
        self.subs.values().filter(|s| s.subscribed)
    }

    pub fn update_stream_property(
        &mut self,
        stream_id: StreamId,
        property: StreamProperty,
    ) -> Result<()> {
        let sub = self.get_mut(stream_id)?;
        match property {
            StreamProperty::Name(name) => sub.name = name,
            StreamProperty::Description { description, rendered } => {
                sub.description = description;
                if let Some(rendered) = rendered {
                    sub.rendered_description = rendered;
                }
            }
            StreamProperty::InviteOnly { invite_only, is_web_public, history_public } => {
                sub.invite_only = invite_only;
                if let Some(web_public) = is_web_public {
                    sub.is_web_public = web_public;
                }
                if let Some(history_public) = history_public {
                    sub.history_public_to_subscribers = history_public;
                }
            }
            StreamProperty::StreamPostPolicy(policy) => sub.stream_post_policy = policy,
            StreamProperty::MessageRetentionDays(days) => sub.message_retention_days = days,
        }
        Ok(())
    }

    pub fn update_subscription_property(
        &mut self,
        stream_id: StreamId,
        property: SubscriptionProperty,
    ) -> Result<()> {
        let sub = self.get_mut(stream_id)?;
        match property {
            SubscriptionProperty::Color(color) => sub.color = color,
            SubscriptionProperty::PinToTop(pin) => sub.pin_to_top = pin,
            SubscriptionProperty::IsMuted(muted) => sub.is_muted = muted,
            SubscriptionProperty::DesktopNotifications(v) => sub.desktop_notifications = v,
            SubscriptionProperty::AudibleNotifications(v) => sub.audible_notifications = v,
        }
        Ok(())
    }

    pub fn add_subscribers(&mut self, stream_id: StreamId, user_ids: &[UserId]) -> Result<()> {
        let sub = self.get_mut(stream_id)?;
        sub.subscribers.extend(user_ids.iter().copied());
        Ok(())
    }

    pub fn remove_subscribers(&mut self, stream_id: StreamId, user_ids: &[UserId]) -> Result<()> {
        let sub = self.get_mut(stream_id)?;
        for user_id in user_ids {
            sub.subscribers.remove(user_id);
        }
        Ok(())
    }

    /// Drop a deactivated user from every subscriber list.
    ///
    /// Returns the streams that actually lost a subscriber.
    pub fn remove_user_from_all(&mut self, user_id: UserId) -> Vec<StreamId> {
        self.subs
            .values_mut()
            .filter_map(|sub| sub.subscribers.remove(&user_id).then_some(sub.stream_id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_shared::protocol::RawStream;

    fn stream(id: u64, name: &str) -> Subscription {
        Subscription::from_stream(
            RawStream {
                stream_id: StreamId(id),
                name: name.to_string(),
                description: String::new(),
                rendered_description: String::new(),
                invite_only: false,
                is_web_public: false,
                stream_post_policy: 1,
                message_retention_days: None,
                history_public_to_subscribers: true,
            },
            false,
        )
    }

    #[test]
    fn test_create_does_not_clobber_subscription() {
        let mut streams = StreamStore::new();
        let mut sub = stream(1, "design");
        sub.color = "#c2c2c2".into();
        streams.subscribe(sub);
        streams.create(stream(1, "design"));

        let sub = streams.get(StreamId(1)).unwrap();
        assert!(sub.subscribed);
        assert_eq!(sub.color, "#c2c2c2");
    }

    #[test]
    fn test_rename_stream() {
        let mut streams = StreamStore::new();
        streams.create(stream(1, "design"));
        streams
            .update_stream_property(StreamId(1), StreamProperty::Name("Design team".into()))
            .unwrap();
        assert_eq!(streams.get(StreamId(1)).unwrap().name, "Design team");
    }

    #[test]
    fn test_remove_user_from_all() {
        let mut streams = StreamStore::new();
        streams.create(stream(1, "a"));
        streams.create(stream(2, "b"));
        streams.add_subscribers(StreamId(1), &[UserId(5), UserId(6)]).unwrap();
        streams.add_subscribers(StreamId(2), &[UserId(6)]).unwrap();

        let mut touched = streams.remove_user_from_all(UserId(6));
        touched.sort();
        assert_eq!(touched, vec![StreamId(1), StreamId(2)]);
        assert!(streams.remove_user_from_all(UserId(6)).is_empty());
    }

    #[test]
    fn test_unknown_stream_update() {
        let mut streams = StreamStore::new();
        assert!(matches!(
            streams.update_subscription_property(StreamId(4), SubscriptionProperty::PinToTop(true)),
            Err(StoreError::UnknownStream(StreamId(4)))
        ));
    }
}
