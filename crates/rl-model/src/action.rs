// action.rs — Action configuration and action results.
//
// An ActionConfig describes one unit of work inside a step: its id and
// whether a human must drive it through a user interface. The behavior
// behind an id is supplied by the embedding application (rl-engine's
// action registry); the model only carries configuration.

use serde::{Deserialize, Serialize};

/// The outcome code that completes an action and moves toward the next
/// action or step. All other codes select alternate outcome edges.
pub const OUTCOME_COMPLETE: i32 = 0;

/// Configuration for a single action within a step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActionConfig {
    /// Identity of the action; resolved to behavior by the engine.
    pub id: String,
    /// Whether a human must drive this action through a UI.
    pub requires_ui: bool,
}

/// The tagged result of executing an action.
///
/// Only `Outcome` carries a status code that is looked up in the owning
/// step's outcome map; the other tags short-circuit outcome processing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "code", rename_all = "snake_case")]
pub enum ActionResult {
    /// Re-render the current action (more input needed).
    Page,
    /// The action failed in a way the same page should report.
    Error,
    /// The user backed out; no state change.
    Cancel,
    /// Route the actor back to the author's workspace view.
    SubmissionPage,
    /// A coded outcome to be resolved against the step's outcome map.
    Outcome(i32),
}

impl ActionResult {
    /// Shorthand for the completing outcome.
    pub fn complete() -> Self {
        ActionResult::Outcome(OUTCOME_COMPLETE)
    }

    /// Whether this is `Outcome(OUTCOME_COMPLETE)`.
    pub fn is_complete(&self) -> bool {
        matches!(self, ActionResult::Outcome(code) if *code == OUTCOME_COMPLETE)
    }
}
