// identity.rs — Seam to the embedding identity system.
//
// The engine never owns users or groups; it resolves them through this
// trait. The in-memory implementation backs the test suites and small
// deployments.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use uuid::Uuid;

use crate::error::RoleError;

/// Read-only access to users, groups, and group membership.
pub trait IdentityStore: Send + Sync {
    /// Find a group by its exact name.
    fn group_by_name(&self, name: &str) -> Result<Option<Uuid>, RoleError>;

    /// All user ids reachable from a group, including nested groups.
    fn expand_group(&self, group: Uuid) -> Result<HashSet<Uuid>, RoleError>;

    /// Display name for a user, if known.
    fn user_display(&self, user: Uuid) -> Result<Option<String>, RoleError>;

    /// Whether the user holds repository administrator rights.
    fn is_admin(&self, user: Uuid) -> Result<bool, RoleError>;
}

#[derive(Debug, Default)]
struct GroupRecord {
    name: String,
    users: HashSet<Uuid>,
    subgroups: HashSet<Uuid>,
}

#[derive(Default)]
struct IdentityState {
    users: HashMap<Uuid, String>,
    groups: HashMap<Uuid, GroupRecord>,
    admins: HashSet<Uuid>,
}

/// In-memory identity store used by tests and embedded deployments.
pub struct InMemoryIdentity {
    state: Mutex<IdentityState>,
}

impl InMemoryIdentity {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(IdentityState::default()),
        }
    }

    /// Register a user and return its id.
    pub fn add_user(&mut self, display: impl Into<String>) -> Uuid {
        let id = Uuid::new_v4();
        self.state.lock().unwrap().users.insert(id, display.into());
        id
    }

    /// Register a group with direct user members and return its id.
    pub fn add_group(&mut self, name: impl Into<String>, users: &[Uuid]) -> Uuid {
        let id = Uuid::new_v4();
        self.state.lock().unwrap().groups.insert(
            id,
            GroupRecord {
                name: name.into(),
                users: users.iter().copied().collect(),
                subgroups: HashSet::new(),
            },
        );
        id
    }

    /// Nest `child` inside `parent`.
    pub fn add_subgroup(&mut self, parent: Uuid, child: Uuid) {
        let mut state = self.state.lock().unwrap();
        if let Some(rec) = state.groups.get_mut(&parent) {
            rec.subgroups.insert(child);
        }
    }

    /// Mark a user as repository administrator.
    pub fn add_admin(&mut self, user: Uuid) {
        self.state.lock().unwrap().admins.insert(user);
    }
}

impl Default for InMemoryIdentity {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityStore for InMemoryIdentity {
    fn group_by_name(&self, name: &str) -> Result<Option<Uuid>, RoleError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .groups
            .iter()
            .find(|(_, rec)| rec.name == name)
            .map(|(id, _)| *id))
    }

    fn expand_group(&self, group: Uuid) -> Result<HashSet<Uuid>, RoleError> {
        let state = self.state.lock().unwrap();
        if !state.groups.contains_key(&group) {
            return Err(RoleError::UnknownGroup(group));
        }
        let mut users = HashSet::new();
        let mut visited = HashSet::new();
        let mut pending = vec![group];
        // Visited set tolerates group cycles in the identity data.
        while let Some(next) = pending.pop() {
            if !visited.insert(next) {
                continue;
            }
            if let Some(rec) = state.groups.get(&next) {
                users.extend(rec.users.iter().copied());
                pending.extend(rec.subgroups.iter().copied());
            }
        }
        Ok(users)
    }

    fn user_display(&self, user: Uuid) -> Result<Option<String>, RoleError> {
        Ok(self.state.lock().unwrap().users.get(&user).cloned())
    }

    fn is_admin(&self, user: Uuid) -> Result<bool, RoleError> {
        Ok(self.state.lock().unwrap().admins.contains(&user))
    }
}
