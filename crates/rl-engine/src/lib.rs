//! # rl-engine
//!
//! The Reviewline routing engine: enters a work-item into its collection's
//! workflow, pools candidate tasks per step, tracks claims, and dispatches
//! every action outcome — staying on the step, chaining automatic actions,
//! advancing along an outcome edge, returning the item to its author, or
//! committing it to the archive.
//!
//! Audit events and task notifications are side channels: they are emitted
//! after a transition commits and their sinks may fail without failing the
//! transition.
//!
//! ## Key components
//!
//! - [`WorkflowEngine`] — the public surface: `start`, `claim`, `unclaim`,
//!   `perform`, `abort`, `delete_workflow_item`
//! - [`Action`] / [`ActionRegistry`] — behaviors behind action ids
//! - [`WorkflowEventSink`] / [`NotificationSink`] — observer seams

pub mod action;
pub mod engine;
pub mod error;
pub mod events;
pub mod notify;

pub use action::{Action, ActionRegistry, AutoApproveAction, ReviewAction};
pub use engine::{Disposition, WorkflowEngine};
pub use error::EngineError;
pub use events::{EventLog, JsonlEventSink, LogEventSink, TransitionPoint, WorkflowEvent, WorkflowEventSink};
pub use notify::{NotificationSink, Notifier, TaskNotification};
