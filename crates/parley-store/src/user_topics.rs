//! Per-topic visibility policies (muted, unmuted, followed).

use std::collections::HashMap;

use parley_shared::protocol::VisibilityPolicy;
use parley_shared::types::StreamId;

#[derive(Debug, Clone, Default)]
pub struct UserTopicStore {
    // Topic names compare case-insensitively.
    policies: HashMap<(StreamId, String), VisibilityPolicy>,
}

impl UserTopicStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether the stored policy changed.
    pub fn set_policy(&mut self, stream_id: StreamId, topic: &str, policy: VisibilityPolicy) -> bool {
        let key = (stream_id, topic.to_lowercase());
        let previous = if policy == VisibilityPolicy::Inherit {
            self.policies.remove(&key)
        } else {
            self.policies.insert(key, policy)
        };
        previous.unwrap_or(VisibilityPolicy::Inherit) != policy
    }

    pub fn policy(&self, stream_id: StreamId, topic: &str) -> VisibilityPolicy {
        self.policies
            .get(&(stream_id, topic.to_lowercase()))
            .copied()
            .unwrap_or(VisibilityPolicy::Inherit)
    }

    pub fn is_muted(&self, stream_id: StreamId, topic: &str) -> bool {
        self.policy(stream_id, topic) == VisibilityPolicy::Muted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_is_case_insensitive() {
        let mut topics = UserTopicStore::new();
        assert!(topics.set_policy(StreamId(1), "Lunch", VisibilityPolicy::Muted));
        assert!(topics.is_muted(StreamId(1), "lunch"));
        assert!(!topics.set_policy(StreamId(1), "LUNCH", VisibilityPolicy::Muted));
    }

    #[test]
    fn test_inherit_clears_entry() {
        let mut topics = UserTopicStore::new();
        topics.set_policy(StreamId(1), "x", VisibilityPolicy::Followed);
        assert!(topics.set_policy(StreamId(1), "x", VisibilityPolicy::Inherit));
        assert_eq!(topics.policy(StreamId(1), "x"), VisibilityPolicy::Inherit);
        assert!(!topics.set_policy(StreamId(1), "x", VisibilityPolicy::Inherit));
    }
}
