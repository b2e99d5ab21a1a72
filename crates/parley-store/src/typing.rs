use std::collections::{BTreeMap, BTreeSet};

use parley_shared::types::{StreamId, UserId};

/// A conversation someone can be typing in.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TypingKey {
    Topic { stream_id: StreamId, topic: String },
    /// Sorted participant ids.
    Direct(Vec<UserId>),
}

impl TypingKey {
    pub fn direct(mut user_ids: Vec<UserId>) -> Self {
        user_ids.sort();
        user_ids.dedup();
        Self::Direct(user_ids)
    }
}

#[derive(Debug, Clone, Default)]
pub struct TypingStore {
    typists: BTreeMap<TypingKey, BTreeSet<UserId>>,
}

impl TypingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_typist(&mut self, key: TypingKey, user_id: UserId) -> bool {
        self.typists.entry(key).or_default().insert(user_id)
    }

    pub fn remove_typist(&mut self, key: &TypingKey, user_id: UserId) -> bool {
        let Some(set) = self.typists.get_mut(key) else {
            return false;
        };
        let removed = set.remove(&user_id);
        if set.is_empty() {
            self.typists.remove(key);
        }
        removed
    }

    pub fn typists(&self, key: &TypingKey) -> Vec<UserId> {
        self.typists
            .get(key)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_stop() {
        let mut typing = TypingStore::new();
        let key = TypingKey::direct(vec![UserId(3), UserId(1)]);
        assert!(typing.add_typist(key.clone(), UserId(3)));
        assert!(!typing.add_typist(key.clone(), UserId(3)));
        assert_eq!(typing.typists(&TypingKey::direct(vec![UserId(1), UserId(3)])), vec![UserId(3)]);

        assert!(typing.remove_typist(&key, UserId(3)));
        assert!(!typing.remove_typist(&key, UserId(3)));
        assert!(typing.typists(&key).is_empty());
    }
}
