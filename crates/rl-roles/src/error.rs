// error.rs — Error types for role resolution.

use thiserror::Error;
use uuid::Uuid;

/// Errors raised while resolving role membership.
///
/// Resolution itself never fails on "empty" — an unbound role is an empty
/// pool, not an error. Only lower-level storage faults surface here.
#[derive(Debug, Error)]
pub enum RoleError {
    /// The identity store failed; propagated unchanged, never retried here.
    #[error("identity store error: {0}")]
    IdentityStore(String),

    /// A group referenced by a binding does not exist in the identity store.
    #[error("unknown group {0}")]
    UnknownGroup(Uuid),
}
