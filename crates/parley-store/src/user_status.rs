use std::collections::HashMap;

use parley_shared::protocol::StatusPatch;
use parley_shared::types::UserId;

use crate::models::UserStatus;

#[derive(Debug, Clone, Default)]
pub struct UserStatusStore {
    statuses: HashMap<UserId, UserStatus>,
}

impl UserStatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply only the fields present in `patch`. An empty status text or
    /// emoji name clears that part of the status.
    pub fn apply(&mut self, user_id: UserId, patch: &StatusPatch) -> bool {
        let status = self.statuses.entry(user_id).or_default();
        let before = status.clone();

        if let Some(away) = patch.away {
            status.away = away;
        }
        if let Some(text) = &patch.status_text {
            status.status_text = text.clone();
        }
        if let Some(name) = &patch.emoji_name {
            status.emoji_name = name.clone();
            if name.is_empty() {
                status.emoji_code.clear();
                status.reaction_type.clear();
            }
        }
        if let Some(code) = &patch.emoji_code {
            status.emoji_code = code.clone();
        }
        if let Some(kind) = &patch.reaction_type {
            status.reaction_type = kind.clone();
        }

        let changed = *status != before;
        if status.is_empty() {
            self.statuses.remove(&user_id);
        }
        changed
    }

    pub fn get(&self, user_id: UserId) -> Option<&UserStatus> {
        self.statuses.get(&user_id)
    }

    pub fn remove(&mut self, user_id: UserId) -> bool {
        self.statuses.remove(&user_id).is_some()
    }
}
