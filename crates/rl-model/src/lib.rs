//! # rl-model
//!
//! Workflow definition model and registry for Reviewline.
//!
//! A [`Workflow`] is an immutable, named directed graph of [`Step`]s. Each
//! step names a reviewer role, an ordered list of actions, a task-assignment
//! strategy, a required-approver count, and an outcome → next-step map.
//! Definitions arrive as already-parsed [`WorkflowDef`] values (the
//! configuration syntax lives with the embedding application) and are
//! validated once into shared, read-only [`Workflow`] values.
//!
//! ## Key components
//!
//! - [`WorkflowDef`] — the raw, serde-friendly definition form
//! - [`Workflow`] / [`Step`] / [`ActionConfig`] — the validated model
//! - [`Role`] — a reviewer role declaration with a membership scope
//! - [`WorkflowRegistry`] — per-collection workflow resolution with an
//!   explicit build cache and invalidation

pub mod action;
pub mod def;
pub mod error;
pub mod registry;
pub mod role;
pub mod step;
pub mod workflow;

pub use action::{ActionConfig, ActionResult, OUTCOME_COMPLETE};
pub use def::{ActionDef, OutcomeDef, RoleDef, StepDef, WorkflowDef};
pub use error::ConfigError;
pub use registry::WorkflowRegistry;
pub use role::{Role, RoleScope};
pub use step::{Step, TaskAssignment};
pub use workflow::Workflow;
