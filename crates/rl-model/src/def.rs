// def.rs — Raw workflow definition input.
//
// The configuration *syntax* (XML/TOML/JSON) belongs to the embedding
// application; what arrives here is the already-parsed shape. Everything
// is plain serde structs so embedders can deserialize straight into them.
// Validation into the immutable model happens in `Workflow::build`.

use serde::{Deserialize, Serialize};

/// Raw definition of a whole workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDef {
    pub id: String,
    /// Id of the step where items enter the workflow.
    pub first_step: String,
    #[serde(default)]
    pub roles: Vec<RoleDef>,
    pub steps: Vec<StepDef>,
}

/// Raw definition of a reviewer role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleDef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub internal: bool,
    /// One of "repository", "collection", "item".
    pub scope: String,
}

/// Raw definition of a step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepDef {
    pub id: String,
    /// Role whose members receive this step's tasks; `None` for automatic steps.
    #[serde(default)]
    pub role: Option<String>,
    pub actions: Vec<ActionDef>,
    #[serde(default)]
    pub outcomes: Vec<OutcomeDef>,
    /// Quorum: distinct actors required before the step can complete.
    #[serde(default = "default_required_users")]
    pub required_users: i64,
    /// Task-assignment strategy: "claim" (single pool) or "assign" (per user).
    #[serde(default = "default_assignment")]
    pub assignment: String,
}

fn default_required_users() -> i64 {
    1
}

fn default_assignment() -> String {
    "claim".to_string()
}

/// Raw definition of an action within a step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionDef {
    pub id: String,
    #[serde(default)]
    pub requires_ui: bool,
}

/// One outcome edge: status code → next step id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeDef {
    pub code: i64,
    pub step: String,
}
