//! Presence tracking.
//!
//! Each user may be connected from several clients; the aggregate status is
//! the most active one.

use std::collections::{BTreeMap, HashMap};

use parley_shared::protocol::{ClientPresence, PresenceStatus};
use parley_shared::types::UserId;

#[derive(Debug, Clone, Default)]
pub struct PresenceStore {
    presences: HashMap<UserId, BTreeMap<String, ClientPresence>>,
}

impl PresenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge per-client presence reports. Older reports never overwrite
    /// newer ones.
    pub fn update(&mut self, user_id: UserId, clients: &BTreeMap<String, ClientPresence>) {
        let entry = self.presences.entry(user_id).or_default();
        for (client, report) in clients {
            match entry.get(client) {
                Some(existing) if existing.timestamp > report.timestamp => {}
                _ => {
                    entry.insert(client.clone(), report.clone());
                }
            }
        }
    }

    pub fn status(&self, user_id: UserId) -> PresenceStatus {
        self.presences
            .get(&user_id)
            .and_then(|clients| clients.values().map(|c| c.status).max())
            .unwrap_or(PresenceStatus::Offline)
    }

    pub fn remove(&mut self, user_id: UserId) -> bool {
        self.presences.remove(&user_id).is_some()
    }
}
