// resolver.rs — Scope-specific role resolution.
//
// resolve(role, collection, work_item) → RoleMembers. No side effects;
// an unbound or unknown role yields an empty pool, only storage faults
// propagate.

use std::sync::Arc;

use rl_model::{Role, RoleScope};
use uuid::Uuid;

use crate::bindings::{CollectionRoleStore, WorkflowItemRoleStore};
use crate::error::RoleError;
use crate::identity::IdentityStore;
use crate::members::RoleMembers;

/// Resolves a role declaration into a concrete candidate pool.
pub struct RoleResolver {
    identity: Arc<dyn IdentityStore>,
    collection_roles: Arc<CollectionRoleStore>,
    item_roles: Arc<WorkflowItemRoleStore>,
}

impl RoleResolver {
    pub fn new(
        identity: Arc<dyn IdentityStore>,
        collection_roles: Arc<CollectionRoleStore>,
        item_roles: Arc<WorkflowItemRoleStore>,
    ) -> Self {
        Self {
            identity,
            collection_roles,
            item_roles,
        }
    }

    pub fn identity(&self) -> &Arc<dyn IdentityStore> {
        &self.identity
    }

    /// Produce the candidate pool for `role` on `work_item`.
    pub fn resolve(
        &self,
        role: &Role,
        collection: Uuid,
        work_item: Uuid,
    ) -> Result<RoleMembers, RoleError> {
        let mut members = RoleMembers::new();
        match role.scope {
            RoleScope::Repository => {
                // Empty when the named group does not exist; not an error.
                if let Some(group) = self.identity.group_by_name(&role.name)? {
                    members.add_group(group);
                }
            }
            RoleScope::Collection => {
                if let Some(group) = self.collection_roles.lookup(collection, &role.id) {
                    members.add_group(group);
                }
            }
            RoleScope::Item => {
                for row in self.item_roles.find(work_item, &role.id) {
                    if let Some(user) = row.user {
                        members.add_user(user);
                    }
                    if let Some(group) = row.group {
                        members.add_group(group);
                    }
                }
            }
        }
        tracing::debug!(
            role = %role.id,
            scope = %role.scope,
            users = members.users.len(),
            groups = members.groups.len(),
            "role resolved"
        );
        Ok(members)
    }
}
