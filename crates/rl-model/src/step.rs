// step.rs — A validated workflow step.
//
// A Step binds a role to an ordered list of actions, a quorum, a
// task-assignment strategy, and an outcome-code → next-step-id map.
// Absent outcome entry ⇒ terminal outcome for that code.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::action::ActionConfig;

/// How a role's members become a task pool when a step activates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskAssignment {
    /// One shared pool; any eligible member may claim a slot.
    ClaimPool,
    /// Every eligible member is assigned an owned task directly.
    AssignAll,
}

impl FromStr for TaskAssignment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "claim" => Ok(TaskAssignment::ClaimPool),
            "assign" => Ok(TaskAssignment::AssignAll),
            other => Err(other.to_string()),
        }
    }
}

/// One stage of a workflow. Immutable once the workflow is built.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Step {
    pub id: String,
    /// Role whose members act on this step; `None` for automatic steps.
    pub role: Option<String>,
    /// Ordered actions; the first is the step's entry action.
    pub actions: Vec<ActionConfig>,
    /// Outcome code → next step id. No entry means the outcome is terminal.
    pub outcomes: BTreeMap<i32, String>,
    /// Distinct actors that must act before the step is complete.
    pub required_users: u32,
    pub assignment: TaskAssignment,
}

impl Step {
    /// The first action of the step — run when the step activates.
    pub fn entry_action(&self) -> &ActionConfig {
        // Validation guarantees at least one action.
        &self.actions[0]
    }

    /// Look up an action config by id.
    pub fn action(&self, id: &str) -> Option<&ActionConfig> {
        self.actions.iter().find(|a| a.id == id)
    }

    /// The action that follows `current_id` in this step's ordered list,
    /// or `None` when `current_id` is the last (or unknown) action.
    pub fn next_action(&self, current_id: &str) -> Option<&ActionConfig> {
        let pos = self.actions.iter().position(|a| a.id == current_id)?;
        self.actions.get(pos + 1)
    }

    /// The next step id for an outcome code; `None` ⇒ terminal outcome.
    pub fn outcome_step(&self, code: i32) -> Option<&str> {
        self.outcomes.get(&code).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step_with_actions(ids: &[&str]) -> Step {
        Step {
            id: "review".to_string(),
            role: None,
            actions: ids
                .iter()
                .map(|id| ActionConfig {
                    id: id.to_string(),
                    requires_ui: false,
                })
                .collect(),
            outcomes: BTreeMap::new(),
            required_users: 1,
            assignment: TaskAssignment::ClaimPool,
        }
    }

    #[test]
    fn next_action_walks_the_ordered_list() {
        let step = step_with_actions(&["a", "b", "c"]);
        assert_eq!(step.next_action("a").unwrap().id, "b");
        assert_eq!(step.next_action("b").unwrap().id, "c");
        assert!(step.next_action("c").is_none());
        assert!(step.next_action("unknown").is_none());
    }

    #[test]
    fn entry_action_is_first() {
        let step = step_with_actions(&["a", "b"]);
        assert_eq!(step.entry_action().id, "a");
    }

    #[test]
    fn missing_outcome_entry_is_terminal() {
        let mut step = step_with_actions(&["a"]);
        step.outcomes.insert(0, "next".to_string());
        assert_eq!(step.outcome_step(0), Some("next"));
        assert_eq!(step.outcome_step(1), None);
    }

    #[test]
    fn assignment_parses() {
        assert_eq!("claim".parse(), Ok(TaskAssignment::ClaimPool));
        assert_eq!("assign".parse(), Ok(TaskAssignment::AssignAll));
        assert!("pool".parse::<TaskAssignment>().is_err());
    }
}
