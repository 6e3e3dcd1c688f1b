//! # rl-ledger
//!
//! The mutable per-work-item task state for Reviewline: unclaimed candidate
//! tasks, claimed (owned) tasks, and the set of users who have acted on the
//! current step.
//!
//! Quorum rule: claim slots are exhausted once
//! `in-progress + finished >= required_users`; reaching quorum clears the
//! remaining candidate pool, and the step itself is satisfied only when
//! every claimant has finished. Every task mutation keeps access-control
//! grants synchronized through [`rl_grants::GrantSynchronizer`].
//!
//! ## Key components
//!
//! - [`WorkflowItem`] / [`WorkflowItemStore`] — the in-workflow wrapper
//! - [`PoolTask`] / [`ClaimedTask`] / [`InProgressUser`] — ledger rows
//! - [`TaskLedger`] — claim/unclaim/finish operations with grant cascades

pub mod error;
pub mod item;
pub mod ledger;
pub mod tasks;

pub use error::LedgerError;
pub use item::{WorkflowItem, WorkflowItemStore};
pub use ledger::TaskLedger;
pub use tasks::{ClaimedTask, InProgressUser, PoolTask};
