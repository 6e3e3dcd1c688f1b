// item.rs — The in-workflow wrapper around a submitted work-item.
//
// While a work-item is under review it has exactly one WorkflowItem
// record. The record disappears when the item is archived, returned to
// its author, or aborted.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::LedgerError;

/// A work-item currently routed through a workflow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkflowItem {
    /// Identity of this workflow wrapper.
    pub id: Uuid,
    /// The underlying content item.
    pub item: Uuid,
    /// The collection the item was submitted to.
    pub collection: Uuid,
    /// The original submitter, if still known.
    pub submitter: Option<Uuid>,
}

/// Store of in-workflow items.
#[derive(Default)]
pub struct WorkflowItemStore {
    items: Mutex<HashMap<Uuid, WorkflowItem>>,
}

impl WorkflowItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an item entering a workflow.
    pub fn create(&self, item: Uuid, collection: Uuid, submitter: Option<Uuid>) -> WorkflowItem {
        let wfi = WorkflowItem {
            id: Uuid::new_v4(),
            item,
            collection,
            submitter,
        };
        self.items.lock().unwrap().insert(wfi.id, wfi.clone());
        wfi
    }

    pub fn find(&self, id: Uuid) -> Result<WorkflowItem, LedgerError> {
        self.items
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(LedgerError::UnknownWorkItem(id))
    }

    /// Remove the wrapper when the item leaves the workflow.
    pub fn remove(&self, id: Uuid) {
        self.items.lock().unwrap().remove(&id);
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.items.lock().unwrap().contains_key(&id)
    }
}
