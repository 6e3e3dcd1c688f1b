// role.rs — Reviewer role declarations.
//
// A Role names *who* may act on a step, without naming concrete people:
// membership is resolved lazily against the scope-specific lookup
// (rl-roles). Roles are immutable once the owning workflow is built.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Where a role's membership is looked up.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RoleScope {
    /// A single repository-wide group, found by the role's name.
    Repository,
    /// A per-collection role → group binding.
    Collection,
    /// Per-work-item role assignments.
    Item,
}

impl fmt::Display for RoleScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoleScope::Repository => write!(f, "repository"),
            RoleScope::Collection => write!(f, "collection"),
            RoleScope::Item => write!(f, "item"),
        }
    }
}

impl FromStr for RoleScope {
    type Err = String;

    /// Parse a scope string. Anything outside {item, collection, repository}
    /// is a configuration error reported by the caller with role context.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "repository" => Ok(RoleScope::Repository),
            "collection" => Ok(RoleScope::Collection),
            "item" => Ok(RoleScope::Item),
            other => Err(other.to_string()),
        }
    }
}

/// A reviewer role declared by a workflow definition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Role {
    /// Identity within the owning workflow.
    pub id: String,
    /// Display name; doubles as the group name for repository-scope roles.
    pub name: String,
    /// Optional description shown to administrators.
    pub description: Option<String>,
    /// Internal roles are not exposed for end-user configuration.
    pub internal: bool,
    /// Where membership is resolved.
    pub scope: RoleScope,
}

impl Role {
    /// Validate a raw scope string into a [`Role`].
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: Option<String>,
        internal: bool,
        scope: &str,
    ) -> Result<Self, ConfigError> {
        let id = id.into();
        let scope = scope
            .parse::<RoleScope>()
            .map_err(|scope| ConfigError::InvalidRoleScope {
                role: id.clone(),
                scope,
            })?;
        Ok(Self {
            id,
            name: name.into(),
            description,
            internal,
            scope,
        })
    }
}
