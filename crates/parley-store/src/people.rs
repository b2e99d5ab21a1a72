//! Person registry.
//!
//! Exactly one [`Person`] exists per user id. Deactivated users stay in the
//! map (their messages still need a sender), they only leave the active set.

use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use parley_shared::types::UserId;

use crate::error::{Result, StoreError};
use crate::models::Person;

#[derive(Debug, Clone, Default)]
pub struct PeopleStore {
    by_id: HashMap<UserId, Person>,
    by_email: HashMap<String, UserId>,
    active: BTreeSet<UserId>,
}

impl PeopleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a person and mark them active.
    pub fn add_active_user(&mut self, mut person: Person) {
        person.is_active = true;
        person.is_inaccessible = false;
        self.active.insert(person.user_id);
        self.insert(person);
    }

    /// Insert or replace a person known to be deactivated.
    pub fn add_inactive_user(&mut self, mut person: Person) {
        person.is_active = false;
        self.active.remove(&person.user_id);
        self.insert(person);
    }

    fn insert(&mut self, person: Person) {
        if let Some(old) = self.by_id.get(&person.user_id) {
            self.by_email.remove(&old.email.to_lowercase());
        }
        if !person.email.is_empty() {
            self.by_email.insert(person.email.to_lowercase(), person.user_id);
        }
        debug!(user_id = %person.user_id, "Tracking person");
        self.by_id.insert(person.user_id, person);
    }

    pub fn get(&self, user_id: UserId) -> Option<&Person> {
        self.by_id.get(&user_id)
    }

    pub fn get_mut(&mut self, user_id: UserId) -> Result<&mut Person> {
        self.by_id
            .get_mut(&user_id)
            .ok_or(StoreError::UnknownUser(user_id))
    }

    pub fn get_by_email(&self, email: &str) -> Option<&Person> {
        self.by_email
            .get(&email.to_lowercase())
            .and_then(|id| self.by_id.get(id))
    }

    pub fn contains(&self, user_id: UserId) -> bool {
        self.by_id.contains_key(&user_id)
    }

    pub fn is_active(&self, user_id: UserId) -> bool {
        self.active.contains(&user_id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn set_full_name(&mut self, user_id: UserId, full_name: &str) -> Result<bool> {
        let person = self.get_mut(user_id)?;
        if person.full_name == full_name {
            return Ok(false);
        }
        person.full_name = full_name.to_string();
        Ok(true)
    }

    /// Change the login email and keep the email index in sync.
    pub fn set_email(&mut self, user_id: UserId, new_email: &str) -> Result<bool> {
        let person = self.get_mut(user_id)?;
        if person.email == new_email {
            return Ok(false);
        }
        let old = std::mem::replace(&mut person.email, new_email.to_string());
        self.by_email.remove(&old.to_lowercase());
        self.by_email.insert(new_email.to_lowercase(), user_id);
        Ok(true)
    }

    pub fn deactivate(&mut self, user_id: UserId) -> Result<bool> {
        let person = self.get_mut(user_id)?;
        let was_active = person.is_active;
        person.is_active = false;
        self.active.remove(&user_id);
        Ok(was_active)
    }

    pub fn reactivate(&mut self, user_id: UserId) -> Result<bool> {
        let person = self.get_mut(user_id)?;
        let was_active = person.is_active;
        person.is_active = true;
        self.active.insert(user_id);
        Ok(!was_active)
    }

    /// Degrade a user we may no longer see into an "Unknown user" tombstone.
    pub fn make_inaccessible(&mut self, user_id: UserId) -> Result<()> {
        if !self.contains(user_id) {
            return Err(StoreError::UnknownUser(user_id));
        }
        self.active.remove(&user_id);
        self.insert(Person::tombstone(user_id));
        Ok(())
    }
}
