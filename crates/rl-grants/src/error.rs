// error.rs — Error types for grant synchronization.

use thiserror::Error;
use uuid::Uuid;

/// Errors raised while synchronizing grants with task ownership.
#[derive(Debug, Error)]
pub enum GrantError {
    /// The access-control store failed; propagated unchanged.
    #[error("access-control store error: {0}")]
    AccessControlStore(String),

    /// The content store failed; propagated unchanged.
    #[error("content store error: {0}")]
    ContentStore(String),

    /// An item referenced by a grant operation does not exist.
    #[error("unknown item {0}")]
    UnknownItem(Uuid),
}
