// action.rs — Action behaviors and their registry.
//
// A step's configuration names actions by id; the behavior behind an id
// is registered here. `activate` prepares state when the action becomes
// current; `execute` performs it and returns the tagged result the
// dispatcher consumes. Automatic actions are executed with `user = None`.

use std::collections::HashMap;
use std::sync::Arc;

use rl_ledger::WorkflowItem;
use rl_model::{ActionResult, Step};
use serde_json::Value;
use uuid::Uuid;

use crate::engine::WorkflowEngine;
use crate::error::EngineError;

/// Behavior behind an action id.
pub trait Action: Send + Sync {
    /// Called when the action becomes the current one for a work-item.
    fn activate(
        &self,
        engine: &WorkflowEngine,
        wfi: &WorkflowItem,
        step: &Step,
    ) -> Result<(), EngineError> {
        let _ = (engine, wfi, step);
        Ok(())
    }

    /// Perform the action. `input` carries the actor's form data; automatic
    /// actions receive `Value::Null` and no user.
    fn execute(
        &self,
        engine: &WorkflowEngine,
        wfi: &WorkflowItem,
        step: &Step,
        user: Option<Uuid>,
        input: &Value,
    ) -> Result<ActionResult, EngineError>;
}

/// Approves unconditionally; used for automatic continuation steps.
pub struct AutoApproveAction;

impl Action for AutoApproveAction {
    fn execute(
        &self,
        _engine: &WorkflowEngine,
        _wfi: &WorkflowItem,
        _step: &Step,
        _user: Option<Uuid>,
        _input: &Value,
    ) -> Result<ActionResult, EngineError> {
        Ok(ActionResult::complete())
    }
}

/// Accept/reject decision driven by a human reviewer.
///
/// Input: `{"decision": "approve"}` completes; `{"decision": "reject",
/// "reason": "..."}` returns the item to its author (a reason is
/// required); `{"decision": "cancel"}` backs out. Anything else
/// re-renders the page.
pub struct ReviewAction;

impl Action for ReviewAction {
    fn execute(
        &self,
        engine: &WorkflowEngine,
        wfi: &WorkflowItem,
        _step: &Step,
        user: Option<Uuid>,
        input: &Value,
    ) -> Result<ActionResult, EngineError> {
        match input.get("decision").and_then(Value::as_str) {
            Some("approve") => Ok(ActionResult::complete()),
            Some("reject") => match input.get("reason").and_then(Value::as_str) {
                Some(reason) if !reason.trim().is_empty() => {
                    engine.return_to_author(wfi, user, reason)?;
                    Ok(ActionResult::SubmissionPage)
                }
                _ => Ok(ActionResult::Page),
            },
            Some("cancel") => Ok(ActionResult::Cancel),
            _ => Ok(ActionResult::Page),
        }
    }
}

/// Action behaviors keyed by the ids workflow definitions use.
pub struct ActionRegistry {
    actions: HashMap<String, Arc<dyn Action>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self {
            actions: HashMap::new(),
        }
    }

    /// Registry pre-loaded with the built-in behaviors.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("autoapprove", Arc::new(AutoApproveAction));
        registry.register("reviewaction", Arc::new(ReviewAction));
        registry
    }

    pub fn register(&mut self, id: impl Into<String>, action: Arc<dyn Action>) {
        self.actions.insert(id.into(), action);
    }

    pub fn get(&self, id: &str) -> Result<Arc<dyn Action>, EngineError> {
        self.actions
            .get(id)
            .cloned()
            .ok_or_else(|| EngineError::UnknownAction(id.to_string()))
    }
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_registered() {
        let registry = ActionRegistry::with_defaults();
        assert!(registry.get("autoapprove").is_ok());
        assert!(registry.get("reviewaction").is_ok());
    }

    #[test]
    fn unknown_action_is_an_error() {
        let registry = ActionRegistry::new();
        assert!(matches!(
            registry.get("ghost"),
            Err(EngineError::UnknownAction(ref id)) if id == "ghost"
        ));
    }
}
