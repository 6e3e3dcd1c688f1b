// error.rs — Error types for the task ledger.

use thiserror::Error;
use uuid::Uuid;

/// Errors raised by task pool / claim ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Grant synchronization failed; propagated unchanged.
    #[error(transparent)]
    Grant(#[from] rl_grants::GrantError),

    /// The user already holds a claim on this step.
    #[error("user {user} has already claimed a task on work-item {work_item}")]
    AlreadyClaimed { work_item: Uuid, user: Uuid },

    /// The referenced work-item is not in any workflow.
    #[error("work-item {0} is not in a workflow")]
    UnknownWorkItem(Uuid),
}
