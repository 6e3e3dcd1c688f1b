// bindings.rs — Persistent role bindings.
//
// CollectionRoleStore: administrative (collection, role-id) → group
// bindings, independent of any single work-item.
//
// WorkflowItemRoleStore: per-work-item role assignments to users or
// groups, deleted when the item leaves the workflow.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// (collection, role-id) → group bindings for collection-scope roles.
#[derive(Default)]
pub struct CollectionRoleStore {
    bindings: Mutex<HashMap<(Uuid, String), Uuid>>,
}

impl CollectionRoleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a role to a group for one collection (overwrites).
    pub fn bind(&self, collection: Uuid, role_id: impl Into<String>, group: Uuid) {
        self.bindings
            .lock()
            .unwrap()
            .insert((collection, role_id.into()), group);
    }

    /// Remove a binding; no-op when absent.
    pub fn unbind(&self, collection: Uuid, role_id: &str) {
        self.bindings
            .lock()
            .unwrap()
            .remove(&(collection, role_id.to_string()));
    }

    /// The bound group, if any.
    pub fn lookup(&self, collection: Uuid, role_id: &str) -> Option<Uuid> {
        self.bindings
            .lock()
            .unwrap()
            .get(&(collection, role_id.to_string()))
            .copied()
    }

    /// Drop every binding for a collection (collection deletion).
    pub fn delete_for_collection(&self, collection: Uuid) {
        self.bindings
            .lock()
            .unwrap()
            .retain(|(coll, _), _| *coll != collection);
    }
}

/// One per-work-item role assignment; user xor group, never both.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkflowItemRole {
    pub role_id: String,
    pub user: Option<Uuid>,
    pub group: Option<Uuid>,
}

/// Per-work-item role assignments for item-scope roles.
#[derive(Default)]
pub struct WorkflowItemRoleStore {
    assignments: Mutex<HashMap<Uuid, Vec<WorkflowItemRole>>>,
}

impl WorkflowItemRoleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assign_user(&self, work_item: Uuid, role_id: impl Into<String>, user: Uuid) {
        self.assignments
            .lock()
            .unwrap()
            .entry(work_item)
            .or_default()
            .push(WorkflowItemRole {
                role_id: role_id.into(),
                user: Some(user),
                group: None,
            });
    }

    pub fn assign_group(&self, work_item: Uuid, role_id: impl Into<String>, group: Uuid) {
        self.assignments
            .lock()
            .unwrap()
            .entry(work_item)
            .or_default()
            .push(WorkflowItemRole {
                role_id: role_id.into(),
                user: None,
                group: Some(group),
            });
    }

    /// All assignments of one role for a work-item.
    pub fn find(&self, work_item: Uuid, role_id: &str) -> Vec<WorkflowItemRole> {
        self.assignments
            .lock()
            .unwrap()
            .get(&work_item)
            .map(|rows| {
                rows.iter()
                    .filter(|r| r.role_id == role_id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Remove every assignment when the item leaves the workflow.
    pub fn delete_for_item(&self, work_item: Uuid) {
        self.assignments.lock().unwrap().remove(&work_item);
    }
}
