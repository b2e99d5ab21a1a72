use std::collections::HashMap;

use parley_shared::protocol::GroupUpdateData;
use parley_shared::types::{GroupId, UserId};

use crate::error::{Result, StoreError};
use crate::models::UserGroup;

#[derive(Debug, Clone, Default)]
pub struct UserGroupStore {
    groups: HashMap<GroupId, UserGroup>,
}

impl UserGroupStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, group: UserGroup) {
        self.groups.insert(group.id, group);
    }

    pub fn remove(&mut self, group_id: GroupId) -> Result<UserGroup> {
        self.groups
            .remove(&group_id)
            .ok_or(StoreError::UnknownGroup(group_id))
    }

    pub fn get(&self, group_id: GroupId) -> Option<&UserGroup> {
        self.groups.get(&group_id)
    }

    fn get_mut(&mut self, group_id: GroupId) -> Result<&mut UserGroup> {
        self.groups
            .get_mut(&group_id)
            .ok_or(StoreError::UnknownGroup(group_id))
    }

    pub fn add_members(&mut self, group_id: GroupId, user_ids: &[UserId]) -> Result<()> {
        self.get_mut(group_id)?.members.extend(user_ids.iter().copied());
        Ok(())
    }

    pub fn remove_members(&mut self, group_id: GroupId, user_ids: &[UserId]) -> Result<()> {
        let group = self.get_mut(group_id)?;
        for user_id in user_ids {
            group.members.remove(user_id);
        }
        Ok(())
    }

    pub fn update(&mut self, group_id: GroupId, data: GroupUpdateData) -> Result<()> {
        let group = self.get_mut(group_id)?;
        if let Some(name) = data.name {
            group.name = name;
        }
        if let Some(description) = data.description {
            group.description = description;
        }
        Ok(())
    }

    pub fn groups_of(&self, user_id: UserId) -> Vec<GroupId> {
        let mut ids: Vec<GroupId> = self
            .groups
            .values()
            .filter(|g| g.members.contains(&user_id))
            .map(|g| g.id)
            .collect();
        ids.sort();
        ids
    }

    /// Returns the groups the user was removed from.
    pub fn remove_user_from_all(&mut self, user_id: UserId) -> Vec<GroupId> {
        let mut touched: Vec<GroupId> = self
            .groups
            .values_mut()
            .filter_map(|g| g.members.remove(&user_id).then_some(g.id))
            .collect();
        touched.sort();
        touched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_shared::protocol::RawUserGroup;

    fn group(id: u64, members: &[u64]) -> UserGroup {
        UserGroup::from(RawUserGroup {
            id: GroupId(id),
            name: format!("group{id}"),
            description: String::new(),
            members: members.iter().copied().map(UserId).collect(),
            is_system_group: false,
        })
    }

    #[test]
    fn test_membership_changes() {
        let mut groups = UserGroupStore::new();
        groups.add(group(1, &[1, 2]));
        groups.add_members(GroupId(1), &[UserId(3)]).unwrap();
        groups.remove_members(GroupId(1), &[UserId(1)]).unwrap();

        let members: Vec<_> = groups.get(GroupId(1)).unwrap().members.iter().copied().collect();
        assert_eq!(members, vec![UserId(2), UserId(3)]);
    }

    #[test]
    fn test_partial_update() {
        let mut groups = UserGroupStore::new();
        groups.add(group(1, &[]));
        groups
            .update(GroupId(1), GroupUpdateData { name: None, description: Some("ops".into()) })
            .unwrap();
        let g = groups.get(GroupId(1)).unwrap();
        assert_eq!(g.name, "group1");
        assert_eq!(g.description, "ops");
    }

    #[test]
    fn test_remove_user_from_all() {
        let mut groups = UserGroupStore::new();
        groups.add(group(1, &[7]));
        groups.add(group(2, &[7, 8]));
        groups.add(group(3, &[8]));

        assert_eq!(groups.remove_user_from_all(UserId(7)), vec![GroupId(1), GroupId(2)]);
        assert!(groups.groups_of(UserId(7)).is_empty());
    }

    #[test]
    fn test_unknown_group() {
        let mut groups = UserGroupStore::new();
        assert!(matches!(groups.remove(GroupId(9)), Err(StoreError::UnknownGroup(_))));
    }
}
