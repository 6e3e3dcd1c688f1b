// members.rs — Principals and resolved role membership.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::RoleError;
use crate::identity::IdentityStore;

/// A grantable identity: an individual user or a group.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Principal {
    User(Uuid),
    Group(Uuid),
}

/// The resolved membership of a role: individual users unioned with groups.
///
/// No ordering guarantee; sets never contain duplicates. Group expansion
/// happens on demand via [`RoleMembers::all_unique_members`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoleMembers {
    pub users: HashSet<Uuid>,
    pub groups: HashSet<Uuid>,
}

impl RoleMembers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&mut self, user: Uuid) {
        self.users.insert(user);
    }

    pub fn add_group(&mut self, group: Uuid) {
        self.groups.insert(group);
    }

    /// No users and no groups.
    pub fn is_empty(&self) -> bool {
        self.users.is_empty() && self.groups.is_empty()
    }

    /// Expand every group through the identity store and union the result
    /// with the direct users, de-duplicated by user id.
    pub fn all_unique_members(
        &self,
        identity: &dyn IdentityStore,
    ) -> Result<HashSet<Uuid>, RoleError> {
        let mut all = self.users.clone();
        for group in &self.groups {
            all.extend(identity.expand_group(*group)?);
        }
        Ok(all)
    }

    /// Whether `user` is a direct member or reachable through any group.
    pub fn contains_user(
        &self,
        user: Uuid,
        identity: &dyn IdentityStore,
    ) -> Result<bool, RoleError> {
        if self.users.contains(&user) {
            return Ok(true);
        }
        for group in &self.groups {
            if identity.expand_group(*group)?.contains(&user) {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
