//! Mirror of the session's own [`Person`], with derived permission flags.

use serde::{Deserialize, Serialize};

use parley_shared::types::{Role, UserId};

use crate::models::Person;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CurrentUser {
    pub user_id: UserId,
    pub email: String,
    pub delivery_email: Option<String>,
    pub full_name: String,
    pub avatar_url: Option<String>,
    pub avatar_version: u64,
    pub timezone: String,
    pub role: Role,
    pub is_owner: bool,
    pub is_admin: bool,
    pub is_moderator: bool,
    pub is_guest: bool,
    pub is_billing_admin: bool,
}

impl CurrentUser {
    pub fn from_person(person: &Person) -> Self {
        let mut user = Self {
            user_id: person.user_id,
            email: person.email.clone(),
            delivery_email: person.delivery_email.clone(),
            full_name: person.full_name.clone(),
            avatar_url: person.avatar_url.clone(),
            avatar_version: person.avatar_version,
            timezone: person.timezone.clone(),
            role: person.role,
            is_owner: false,
            is_admin: false,
            is_moderator: false,
            is_guest: false,
            is_billing_admin: person.is_billing_admin,
        };
        user.set_role(person.role);
        user
    }

    /// Set the role and recompute the four derived flags.
    ///
    /// Returns whether the role actually changed.
    pub fn set_role(&mut self, role: Role) -> bool {
        let changed = self.role != role;
        self.role = role;
        self.is_owner = role.is_owner();
        self.is_admin = role.is_admin();
        self.is_moderator = role.is_moderator();
        self.is_guest = role.is_guest();
        changed
    }
}
