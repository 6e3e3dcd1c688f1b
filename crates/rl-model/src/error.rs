// error.rs — Error types for workflow definition loading.

use thiserror::Error;

/// Errors raised while validating or resolving workflow definitions.
///
/// Every variant is a configuration defect: fatal for the operation that
/// tried to load the workflow, never silently defaulted, and not retryable
/// until the definition is fixed.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A role declared a membership scope outside {item, collection, repository}.
    #[error("invalid role scope '{scope}' for role '{role}'")]
    InvalidRoleScope { role: String, scope: String },

    /// A step id was referenced but never defined.
    #[error("step '{step}' not found in workflow '{workflow}'")]
    StepNotFound { workflow: String, step: String },

    /// A step referenced a role that the workflow never declared.
    #[error("role '{role}' not found in workflow '{workflow}'")]
    RoleNotFound { workflow: String, role: String },

    /// Two steps share the same id.
    #[error("duplicate step id '{step}' in workflow '{workflow}'")]
    DuplicateStep { workflow: String, step: String },

    /// Two roles share the same id.
    #[error("duplicate role id '{role}' in workflow '{workflow}'")]
    DuplicateRole { workflow: String, role: String },

    /// A step declared no actions.
    #[error("step '{step}' in workflow '{workflow}' declares no actions")]
    EmptyStep { workflow: String, step: String },

    /// Outcome status codes must be ≥ 0.
    #[error("negative outcome code {code} on step '{step}'")]
    NegativeOutcomeCode { step: String, code: i64 },

    /// Outcome status codes must fit the dispatcher's 32-bit code space.
    #[error("outcome code {code} on step '{step}' is out of range")]
    OutcomeCodeOutOfRange { step: String, code: i64 },

    /// The required-approver count must be ≥ 0.
    #[error("invalid required_users {value} on step '{step}'")]
    InvalidRequiredUsers { step: String, value: i64 },

    /// An unknown task-assignment strategy string.
    #[error("invalid task assignment '{assignment}' on step '{step}'")]
    InvalidAssignment { step: String, assignment: String },

    /// The requested workflow id is not registered.
    #[error("workflow '{0}' is not registered")]
    WorkflowNotFound(String),

    /// No collection mapping matched and no default workflow is configured.
    #[error("no workflow mapped for collection {0} and no default is configured")]
    NoDefaultWorkflow(uuid::Uuid),
}
