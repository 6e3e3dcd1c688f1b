// sync.rs — Grant synchronization cascades.
//
// Granting and revoking walk the same traversal: the item, then each
// bundle, then each bitstream within the bundle. Grants are idempotent —
// a capability the principal already holds is never duplicated. Revoking
// a submitter's grants always restores their read floor.

use std::sync::Arc;

use rl_roles::Principal;
use uuid::Uuid;

use crate::capability::{Capability, GrantRecord, GrantTarget, PolicyType, ALL_CAPABILITIES};
use crate::error::GrantError;
use crate::stores::{AccessControlStore, ContentStore};

/// Issues and revokes task-ownership capabilities on a work-item's content.
pub struct GrantSynchronizer {
    acl: Arc<dyn AccessControlStore>,
    content: Arc<dyn ContentStore>,
}

impl GrantSynchronizer {
    pub fn new(acl: Arc<dyn AccessControlStore>, content: Arc<dyn ContentStore>) -> Self {
        Self { acl, content }
    }

    pub fn content(&self) -> &Arc<dyn ContentStore> {
        &self.content
    }

    /// The item plus every content part underneath it.
    fn targets(&self, item: Uuid) -> Result<Vec<GrantTarget>, GrantError> {
        let mut targets = vec![GrantTarget::Item(item)];
        for bundle in self.content.bundles(item)? {
            targets.push(GrantTarget::Bundle(bundle));
            for bit in self.content.bitstreams(bundle)? {
                targets.push(GrantTarget::Bitstream(bit));
            }
        }
        Ok(targets)
    }

    fn grant_missing(
        &self,
        principal: Principal,
        target: GrantTarget,
        capabilities: &[Capability],
        policy_type: PolicyType,
    ) -> Result<(), GrantError> {
        let held: Vec<Capability> = self
            .acl
            .list_grants(target)?
            .into_iter()
            .filter(|g| g.principal == principal)
            .map(|g| g.capability)
            .collect();
        for &capability in capabilities {
            if !held.contains(&capability) {
                self.acl.grant(GrantRecord {
                    principal,
                    capability,
                    target,
                    policy_type,
                })?;
            }
        }
        Ok(())
    }

    /// Grant the full capability set on the item and all its content parts.
    pub fn grant_all(
        &self,
        item: Uuid,
        principal: Principal,
        policy_type: PolicyType,
    ) -> Result<(), GrantError> {
        tracing::debug!(item = %item, principal = ?principal, "granting full capability set");
        for target in self.targets(item)? {
            self.grant_missing(principal, target, &ALL_CAPABILITIES, policy_type)?;
        }
        Ok(())
    }

    /// Remove every grant the principal holds on the item and its content
    /// parts. The item's submitter never loses read access this way.
    pub fn revoke_all(&self, item: Uuid, principal: Principal) -> Result<(), GrantError> {
        for target in self.targets(item)? {
            self.acl.revoke_all_for_principal(principal, target)?;
        }
        if let Principal::User(user) = principal {
            if self.content.submitter(item)? == Some(user) {
                self.grant_submitter_read(item)?;
            }
        }
        Ok(())
    }

    /// Ensure the submitter holds read access on the item and its parts.
    pub fn grant_submitter_read(&self, item: Uuid) -> Result<(), GrantError> {
        if let Some(submitter) = self.content.submitter(item)? {
            for target in self.targets(item)? {
                self.grant_missing(
                    Principal::User(submitter),
                    target,
                    &[Capability::Read],
                    PolicyType::Submission,
                )?;
            }
        }
        Ok(())
    }

    /// Sweep every workflow-created grant from the item and its parts,
    /// regardless of principal. Submission-time policies survive.
    pub fn revoke_workflow_grants(&self, item: Uuid) -> Result<(), GrantError> {
        tracing::debug!(item = %item, "sweeping workflow grants");
        for target in self.targets(item)? {
            self.acl.revoke_by_type(target, PolicyType::Workflow)?;
        }
        Ok(())
    }

    /// Whether a principal currently holds the full capability set on the item.
    pub fn holds_full_grant(&self, item: Uuid, principal: Principal) -> Result<bool, GrantError> {
        let held: Vec<Capability> = self
            .acl
            .list_grants(GrantTarget::Item(item))?
            .into_iter()
            .filter(|g| g.principal == principal)
            .map(|g| g.capability)
            .collect();
        Ok(ALL_CAPABILITIES.iter().all(|c| held.contains(c)))
    }
}
