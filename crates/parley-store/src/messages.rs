//! Message cache, keyed by [`MessageId`].
//!
//! Messages are mutated in place (flags, edits, reactions) and only leave
//! the cache on an explicit delete.

use std::collections::HashMap;

use tracing::debug;

use parley_shared::types::MessageId;

use crate::error::{Result, StoreError};
use crate::models::{Message, Reaction};

#[derive(Debug, Clone, Default)]
pub struct MessageStore {
    messages: HashMap<MessageId, Message>,
    next_local_seq: u32,
    newest_confirmed: u64,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a message, keeping the cached copy if one already exists so
    /// that redelivery does not clobber local flag state.
    ///
    /// Returns whether the message was new.
    pub fn insert(&mut self, message: Message) -> bool {
        if let MessageId::Confirmed(id) = message.id {
            self.newest_confirmed = self.newest_confirmed.max(id);
        }
        if self.messages.contains_key(&message.id) {
            return false;
        }
        self.messages.insert(message.id, message);
        true
    }

    pub fn get(&self, id: MessageId) -> Option<&Message> {
        self.messages.get(&id)
    }

    pub fn get_mut(&mut self, id: MessageId) -> Result<&mut Message> {
        self.messages
            .get_mut(&id)
            .ok_or(StoreError::UnknownMessage(id))
    }

    pub fn contains(&self, id: MessageId) -> bool {
        self.messages.contains_key(&id)
    }

    pub fn remove(&mut self, id: MessageId) -> Option<Message> {
        self.messages.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.values()
    }

    /// Next placeholder id for an optimistic local echo.
    pub fn next_local_id(&mut self) -> MessageId {
        self.next_local_seq += 1;
        MessageId::Pending {
            after: self.newest_confirmed,
            seq: self.next_local_seq,
        }
    }

    /// Replace a locally echoed message with the server's confirmed copy.
    ///
    /// Returns `false` if the confirmed id was already cached, in which case
    /// the echo is simply dropped.
    pub fn reify(&mut self, local_id: MessageId, confirmed: Message) -> Result<bool> {
        self.messages
            .remove(&local_id)
            .ok_or(StoreError::UnknownMessage(local_id))?;
        debug!(%local_id, server_id = %confirmed.id, "Reifying local echo");
        Ok(self.insert(confirmed))
    }

    /// Apply `update` to every cached message matching `predicate`.
    ///
    /// Returns the ids of the messages that were touched.
    pub fn update_matching<P, F>(&mut self, predicate: P, mut update: F) -> Vec<MessageId>
    where
        P: Fn(&Message) -> bool,
        F: FnMut(&mut Message),
    {
        let mut touched = Vec::new();
        for message in self.messages.values_mut().filter(|m| predicate(m)) {
            update(message);
            touched.push(message.id);
        }
        touched.sort();
        touched
    }

    /// Add a reaction unless the same user already reacted with that emoji.
    pub fn add_reaction(&mut self, id: MessageId, reaction: Reaction) -> Result<bool> {
        let message = self.get_mut(id)?;
        let exists = message.reactions.iter().any(|r| {
            r.user_id == reaction.user_id
                && r.emoji_code == reaction.emoji_code
                && r.reaction_type == reaction.reaction_type
        });
        if exists {
            return Ok(false);
        }
        message.reactions.push(reaction);
        Ok(true)
    }

    pub fn remove_reaction(&mut self, id: MessageId, reaction: &Reaction) -> Result<bool> {
        let message = self.get_mut(id)?;
        let before = message.reactions.len();
        message.reactions.retain(|r| {
            !(r.user_id == reaction.user_id
                && r.emoji_code == reaction.emoji_code
                && r.reaction_type == reaction.reaction_type)
        });
        Ok(message.reactions.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MessageFlags;
    use chrono::Utc;
    use parley_shared::protocol::Recipient;
    use parley_shared::types::{StreamId, UserId};

    pub(crate) fn message(id: u64, sender: u64) -> Message {
        Message {
            id: MessageId::Confirmed(id),
            sender_id: UserId(sender),
            sender_full_name: format!("user{sender}"),
            sender_email: format!("user{sender}@example.com"),
            avatar_url: None,
            content: "<p>hello</p>".into(),
            recipient: Recipient::Stream {
                stream_id: StreamId(1),
                topic: "general".into(),
            },
            timestamp: Utc::now(),
            flags: MessageFlags::default(),
            condensed: None,
            reactions: Vec::new(),
            locally_echoed: false,
            last_edit_timestamp: None,
            match_content: None,
            match_topic: None,
        }
    }

    #[test]
    fn test_insert_is_idempotent() {
        let mut store = MessageStore::new();
        assert!(store.insert(message(1, 10)));
        store.get_mut(MessageId::Confirmed(1)).unwrap().flags.starred = true;
        assert!(!store.insert(message(1, 10)));
        assert!(store.get(MessageId::Confirmed(1)).unwrap().flags.starred);
    }

    #[test]
    fn test_update_matching_by_sender() {
        let mut store = MessageStore::new();
        store.insert(message(1, 10));
        store.insert(message(2, 11));
        store.insert(message(3, 10));

        let touched = store.update_matching(
            |m| m.sender_id == UserId(10),
            |m| m.sender_full_name = "Renamed".into(),
        );
        assert_eq!(touched, vec![MessageId::Confirmed(1), MessageId::Confirmed(3)]);
        assert_eq!(store.get(MessageId::Confirmed(2)).unwrap().sender_full_name, "user11");
    }

    #[test]
    fn test_local_ids_follow_newest_confirmed() {
        let mut store = MessageStore::new();
        store.insert(message(40, 10));
        let local = store.next_local_id();
        assert_eq!(local, MessageId::Pending { after: 40, seq: 1 });

        let mut echo = message(0, 10);
        echo.id = local;
        echo.locally_echoed = true;
        store.insert(echo);
        assert!(store.reify(local, message(41, 10)).unwrap());

        assert!(store.get(local).is_none());
        assert!(!store.get(MessageId::Confirmed(41)).unwrap().locally_echoed);
        assert_eq!(store.next_local_id(), MessageId::Pending { after: 41, seq: 2 });
        assert!(store.reify(local, message(42, 10)).is_err());
    }

    #[test]
    fn test_reactions_are_deduplicated() {
        let mut store = MessageStore::new();
        store.insert(message(1, 10));
        let reaction = Reaction {
            user_id: UserId(3),
            emoji_name: "smile".into(),
            emoji_code: "1f642".into(),
            reaction_type: "unicode_emoji".into(),
        };
        assert!(store.add_reaction(MessageId::Confirmed(1), reaction.clone()).unwrap());
        assert!(!store.add_reaction(MessageId::Confirmed(1), reaction.clone()).unwrap());
        assert!(store.remove_reaction(MessageId::Confirmed(1), &reaction).unwrap());
        assert!(!store.remove_reaction(MessageId::Confirmed(1), &reaction).unwrap());
    }
}
