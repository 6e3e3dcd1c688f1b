//! # rl-roles
//!
//! Role membership for Reviewline: who may act on a workflow step.
//!
//! A workflow step names a [`rl_model::Role`]; this crate turns that
//! declaration plus a work-item into a concrete [`RoleMembers`] candidate
//! pool, using the scope-specific lookup:
//!
//! - repository scope — a named group in the identity store
//! - collection scope — a [`CollectionRoleStore`] binding
//! - item scope — per-work-item [`WorkflowItemRoleStore`] assignments
//!
//! ## Key components
//!
//! - [`Principal`] — a user or a group
//! - [`RoleMembers`] — users ∪ groups with de-duplicated expansion
//! - [`IdentityStore`] — seam to the embedding identity system
//! - [`RoleResolver`] — the scope dispatch, side-effect free

pub mod bindings;
pub mod error;
pub mod identity;
pub mod members;
pub mod resolver;

pub use bindings::{CollectionRoleStore, WorkflowItemRole, WorkflowItemRoleStore};
pub use error::RoleError;
pub use identity::{IdentityStore, InMemoryIdentity};
pub use members::{Principal, RoleMembers};
pub use resolver::RoleResolver;
