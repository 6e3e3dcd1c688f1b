//! # rl-grants
//!
//! Keeps access-control capabilities on a work-item aligned with current
//! task ownership.
//!
//! Pooled and claimed reviewers hold the full capability set
//! (read/write/add/remove/delete) on the item and, transitively, on every
//! content part (bundles, then bitstreams). When tasks churn, grants are
//! revoked in the same cascade — except that the item's original submitter
//! always keeps read access.
//!
//! ## Key components
//!
//! - [`Capability`] / [`PolicyType`] / [`GrantTarget`] — the grant model
//! - [`AccessControlStore`] — seam to the embedding policy store
//! - [`ContentStore`] — seam to the embedding content system
//! - [`GrantSynchronizer`] — grant/revoke cascades with the submitter floor

pub mod capability;
pub mod error;
pub mod stores;
pub mod sync;

pub use capability::{Capability, GrantRecord, GrantTarget, PolicyType, ALL_CAPABILITIES};
pub use error::GrantError;
pub use stores::{AccessControlStore, ContentStore, InMemoryAccessControl, InMemoryContent};
pub use sync::GrantSynchronizer;
