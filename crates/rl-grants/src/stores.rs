// stores.rs — Seams to the embedding access-control and content systems.
//
// The engine owns no content and no policy rows; it drives both through
// these traits. The in-memory implementations back the test suites and
// record enough state for the invariants to be asserted against.

use std::collections::HashMap;
use std::sync::Mutex;

use rl_roles::Principal;
use uuid::Uuid;

use crate::capability::{Capability, GrantRecord, GrantTarget, PolicyType};
use crate::error::GrantError;

/// Grant/revoke contract of the policy store.
pub trait AccessControlStore: Send + Sync {
    /// Add one grant row. Callers are responsible for duplicate checks.
    fn grant(&self, record: GrantRecord) -> Result<(), GrantError>;

    /// Remove every grant a principal holds on a target.
    fn revoke_all_for_principal(
        &self,
        principal: Principal,
        target: GrantTarget,
    ) -> Result<(), GrantError>;

    /// All grant rows on a target.
    fn list_grants(&self, target: GrantTarget) -> Result<Vec<GrantRecord>, GrantError>;

    /// Remove every grant of one policy type on a target.
    fn revoke_by_type(&self, target: GrantTarget, policy_type: PolicyType)
        -> Result<(), GrantError>;
}

/// Content persistence contract: structure, submitter, and the two exits.
pub trait ContentStore: Send + Sync {
    /// The item's original submitter, if still known.
    fn submitter(&self, item: Uuid) -> Result<Option<Uuid>, GrantError>;

    /// Content bundles of an item, in storage order.
    fn bundles(&self, item: Uuid) -> Result<Vec<Uuid>, GrantError>;

    /// Bitstreams within a bundle.
    fn bitstreams(&self, bundle: Uuid) -> Result<Vec<Uuid>, GrantError>;

    /// Display title, if any.
    fn item_title(&self, item: Uuid) -> Result<Option<String>, GrantError>;

    /// Append a provenance statement to the item's metadata.
    fn append_provenance(&self, item: Uuid, text: &str) -> Result<(), GrantError>;

    /// Strip routing bookkeeping metadata from the item.
    fn clear_workflow_metadata(&self, item: Uuid) -> Result<(), GrantError>;

    /// Commit the item to final storage.
    fn install_to_archive(&self, item: Uuid) -> Result<(), GrantError>;

    /// Return the item to the author's personal workspace.
    fn return_to_workspace(&self, item: Uuid) -> Result<(), GrantError>;

    /// Delete the item outright.
    fn delete_item(&self, item: Uuid) -> Result<(), GrantError>;
}

/// In-memory access-control store.
#[derive(Default)]
pub struct InMemoryAccessControl {
    grants: Mutex<Vec<GrantRecord>>,
}

impl InMemoryAccessControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capabilities a principal holds on a target (test helper).
    pub fn capabilities(&self, principal: Principal, target: GrantTarget) -> Vec<Capability> {
        self.grants
            .lock()
            .unwrap()
            .iter()
            .filter(|g| g.principal == principal && g.target == target)
            .map(|g| g.capability)
            .collect()
    }
}

impl AccessControlStore for InMemoryAccessControl {
    fn grant(&self, record: GrantRecord) -> Result<(), GrantError> {
        self.grants.lock().unwrap().push(record);
        Ok(())
    }

    fn revoke_all_for_principal(
        &self,
        principal: Principal,
        target: GrantTarget,
    ) -> Result<(), GrantError> {
        self.grants
            .lock()
            .unwrap()
            .retain(|g| !(g.principal == principal && g.target == target));
        Ok(())
    }

    fn list_grants(&self, target: GrantTarget) -> Result<Vec<GrantRecord>, GrantError> {
        Ok(self
            .grants
            .lock()
            .unwrap()
            .iter()
            .filter(|g| g.target == target)
            .cloned()
            .collect())
    }

    fn revoke_by_type(
        &self,
        target: GrantTarget,
        policy_type: PolicyType,
    ) -> Result<(), GrantError> {
        self.grants
            .lock()
            .unwrap()
            .retain(|g| !(g.target == target && g.policy_type == policy_type));
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ItemDisposition {
    InWorkflow,
    Archived,
    Workspace,
    Deleted,
}

struct ItemRecord {
    submitter: Option<Uuid>,
    title: Option<String>,
    bundles: Vec<Uuid>,
    provenance: Vec<String>,
    workflow_metadata: bool,
    disposition: ItemDisposition,
}

/// In-memory content store.
#[derive(Default)]
pub struct InMemoryContent {
    items: Mutex<HashMap<Uuid, ItemRecord>>,
    bundle_bits: Mutex<HashMap<Uuid, Vec<Uuid>>>,
}

impl InMemoryContent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an item and return its id.
    pub fn add_item(&self, submitter: Option<Uuid>, title: Option<&str>) -> Uuid {
        let id = Uuid::new_v4();
        self.items.lock().unwrap().insert(
            id,
            ItemRecord {
                submitter,
                title: title.map(str::to_string),
                bundles: Vec::new(),
                provenance: Vec::new(),
                workflow_metadata: true,
                disposition: ItemDisposition::InWorkflow,
            },
        );
        id
    }

    /// Attach a new bundle to an item and return its id.
    pub fn add_bundle(&self, item: Uuid) -> Uuid {
        let id = Uuid::new_v4();
        if let Some(rec) = self.items.lock().unwrap().get_mut(&item) {
            rec.bundles.push(id);
        }
        self.bundle_bits.lock().unwrap().insert(id, Vec::new());
        id
    }

    /// Attach a new bitstream to a bundle and return its id.
    pub fn add_bitstream(&self, bundle: Uuid) -> Uuid {
        let id = Uuid::new_v4();
        self.bundle_bits
            .lock()
            .unwrap()
            .entry(bundle)
            .or_default()
            .push(id);
        id
    }

    pub fn is_archived(&self, item: Uuid) -> bool {
        self.items
            .lock()
            .unwrap()
            .get(&item)
            .is_some_and(|r| r.disposition == ItemDisposition::Archived)
    }

    pub fn is_in_workspace(&self, item: Uuid) -> bool {
        self.items
            .lock()
            .unwrap()
            .get(&item)
            .is_some_and(|r| r.disposition == ItemDisposition::Workspace)
    }

    pub fn provenance(&self, item: Uuid) -> Vec<String> {
        self.items
            .lock()
            .unwrap()
            .get(&item)
            .map(|r| r.provenance.clone())
            .unwrap_or_default()
    }

    pub fn has_workflow_metadata(&self, item: Uuid) -> bool {
        self.items
            .lock()
            .unwrap()
            .get(&item)
            .is_some_and(|r| r.workflow_metadata)
    }
}

impl ContentStore for InMemoryContent {
    fn submitter(&self, item: Uuid) -> Result<Option<Uuid>, GrantError> {
        self.items
            .lock()
            .unwrap()
            .get(&item)
            .map(|r| r.submitter)
            .ok_or(GrantError::UnknownItem(item))
    }

    fn bundles(&self, item: Uuid) -> Result<Vec<Uuid>, GrantError> {
        self.items
            .lock()
            .unwrap()
            .get(&item)
            .map(|r| r.bundles.clone())
            .ok_or(GrantError::UnknownItem(item))
    }

    fn bitstreams(&self, bundle: Uuid) -> Result<Vec<Uuid>, GrantError> {
        Ok(self
            .bundle_bits
            .lock()
            .unwrap()
            .get(&bundle)
            .cloned()
            .unwrap_or_default())
    }

    fn item_title(&self, item: Uuid) -> Result<Option<String>, GrantError> {
        Ok(self
            .items
            .lock()
            .unwrap()
            .get(&item)
            .and_then(|r| r.title.clone()))
    }

    fn append_provenance(&self, item: Uuid, text: &str) -> Result<(), GrantError> {
        let mut items = self.items.lock().unwrap();
        let rec = items.get_mut(&item).ok_or(GrantError::UnknownItem(item))?;
        rec.provenance.push(text.to_string());
        Ok(())
    }

    fn clear_workflow_metadata(&self, item: Uuid) -> Result<(), GrantError> {
        let mut items = self.items.lock().unwrap();
        let rec = items.get_mut(&item).ok_or(GrantError::UnknownItem(item))?;
        rec.workflow_metadata = false;
        Ok(())
    }

    fn install_to_archive(&self, item: Uuid) -> Result<(), GrantError> {
        let mut items = self.items.lock().unwrap();
        let rec = items.get_mut(&item).ok_or(GrantError::UnknownItem(item))?;
        rec.disposition = ItemDisposition::Archived;
        Ok(())
    }

    fn return_to_workspace(&self, item: Uuid) -> Result<(), GrantError> {
        let mut items = self.items.lock().unwrap();
        let rec = items.get_mut(&item).ok_or(GrantError::UnknownItem(item))?;
        rec.disposition = ItemDisposition::Workspace;
        Ok(())
    }

    fn delete_item(&self, item: Uuid) -> Result<(), GrantError> {
        let mut items = self.items.lock().unwrap();
        let rec = items.get_mut(&item).ok_or(GrantError::UnknownItem(item))?;
        rec.disposition = ItemDisposition::Deleted;
        Ok(())
    }
}
