// error.rs — Error types for the routing engine.
//
// Configuration, role, grant, and ledger errors from the lower crates
// propagate unchanged. The engine adds the authorization and
// invalid-state conditions of outcome dispatch; none of these leave
// partial task or grant state behind.

use thiserror::Error;
use uuid::Uuid;

/// Errors raised by workflow entry, claiming, and outcome dispatch.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] rl_model::ConfigError),

    #[error(transparent)]
    Role(#[from] rl_roles::RoleError),

    #[error(transparent)]
    Grant(#[from] rl_grants::GrantError),

    #[error(transparent)]
    Ledger(#[from] rl_ledger::LedgerError),

    /// The actor holds no task that permits this operation. Nothing was
    /// mutated.
    #[error("user {user} is not authorized to act on work-item {work_item}")]
    NotAuthorized { work_item: Uuid, user: Uuid },

    /// No action behavior is registered under this id.
    #[error("no action registered under id {0:?}")]
    UnknownAction(String),

    /// A claimed task names an action the step does not carry.
    #[error("step {step:?} has no action {action:?}")]
    ActionNotInStep { step: String, action: String },

    /// A non-complete outcome reached the end of a step with no alternate
    /// edge configured for its code.
    #[error("no alternate step found in workflow {workflow:?} for outcome code {code}")]
    NoAlternateStep { workflow: String, code: i32 },

    /// An automatic action chain exceeded the recursion bound; the step
    /// graph cycles without reaching a human or a terminal.
    #[error("automatic action chain in workflow {workflow:?} exceeded {depth} transitions at step {step:?}")]
    CyclicWorkflow {
        workflow: String,
        step: String,
        depth: usize,
    },

    /// An event sink failed to persist an event.
    #[error("event sink error on {path}: {source}")]
    EventSink {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A notification sink failed to deliver.
    #[error("notification sink error: {0}")]
    Notification(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
