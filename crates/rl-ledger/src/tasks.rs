// tasks.rs — Ledger row types.

use rl_roles::Principal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A candidate assignment not yet committed to a specific user.
///
/// Carries either a candidate user or a candidate group, never both:
/// one row per eligible user and one per eligible group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PoolTask {
    pub id: Uuid,
    pub work_item: Uuid,
    pub workflow_id: String,
    pub step_id: String,
    pub action_id: String,
    pub candidate: Principal,
}

/// An assignment committed to exactly one user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClaimedTask {
    pub id: Uuid,
    pub work_item: Uuid,
    pub workflow_id: String,
    pub step_id: String,
    pub action_id: String,
    pub owner: Uuid,
}

/// A user who has claimed the current step, and whether they finished.
/// Both states count toward the step's quorum.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InProgressUser {
    pub work_item: Uuid,
    pub user: Uuid,
    pub finished: bool,
}
