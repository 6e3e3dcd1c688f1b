// capability.rs — The grant model.
//
// A grant gives a principal one capability on one target, labelled with
// the policy type that created it. Workflow-created grants can then be
// swept without touching submission-time policies.

use rl_roles::Principal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single access capability on a content object.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Read,
    Write,
    Add,
    Remove,
    Delete,
}

/// The full capability set granted to task holders.
pub const ALL_CAPABILITIES: [Capability; 5] = [
    Capability::Read,
    Capability::Write,
    Capability::Add,
    Capability::Remove,
    Capability::Delete,
];

/// Why a grant exists; used for scoped cleanup.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PolicyType {
    /// Created by task routing; swept when the item leaves the workflow.
    Workflow,
    /// Created at submission time; survives workflow churn.
    Submission,
}

/// What a grant applies to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "target", content = "id", rename_all = "snake_case")]
pub enum GrantTarget {
    Item(Uuid),
    Bundle(Uuid),
    Bitstream(Uuid),
}

/// One grant row in the access-control store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GrantRecord {
    pub principal: Principal,
    pub capability: Capability,
    pub target: GrantTarget,
    pub policy_type: PolicyType,
}
