// workflow.rs — The validated, immutable workflow graph.
//
// Built once from a WorkflowDef and shared read-only (Arc) across every
// work-item that uses it. Step insertion order is preserved so first-step
// selection is deterministic.

use std::collections::{BTreeMap, HashMap};

use crate::action::ActionConfig;
use crate::def::WorkflowDef;
use crate::error::ConfigError;
use crate::role::Role;
use crate::step::{Step, TaskAssignment};

/// A named directed graph of steps.
#[derive(Debug)]
pub struct Workflow {
    id: String,
    first_step: String,
    /// Steps in definition order.
    steps: Vec<Step>,
    index: HashMap<String, usize>,
    roles: HashMap<String, Role>,
}

impl Workflow {
    /// Validate a raw definition into an immutable workflow.
    ///
    /// Any missing or malformed required attribute aborts construction:
    /// unknown role scopes, missing start steps, dangling outcome targets,
    /// negative outcome codes, and negative quorums are all fatal here
    /// rather than at routing time.
    pub fn build(def: &WorkflowDef) -> Result<Self, ConfigError> {
        let workflow_id = def.id.clone();

        let mut roles = HashMap::new();
        for raw in &def.roles {
            let role = Role::new(
                &raw.id,
                &raw.name,
                raw.description.clone(),
                raw.internal,
                &raw.scope,
            )?;
            if roles.insert(role.id.clone(), role).is_some() {
                return Err(ConfigError::DuplicateRole {
                    workflow: workflow_id,
                    role: raw.id.clone(),
                });
            }
        }

        let mut steps = Vec::with_capacity(def.steps.len());
        let mut index = HashMap::new();
        for raw in &def.steps {
            if raw.actions.is_empty() {
                return Err(ConfigError::EmptyStep {
                    workflow: workflow_id,
                    step: raw.id.clone(),
                });
            }
            if raw.required_users < 0 {
                return Err(ConfigError::InvalidRequiredUsers {
                    step: raw.id.clone(),
                    value: raw.required_users,
                });
            }
            if let Some(role_id) = &raw.role {
                if !roles.contains_key(role_id) {
                    return Err(ConfigError::RoleNotFound {
                        workflow: workflow_id,
                        role: role_id.clone(),
                    });
                }
            }
            let assignment = raw.assignment.parse::<TaskAssignment>().map_err(|s| {
                ConfigError::InvalidAssignment {
                    step: raw.id.clone(),
                    assignment: s,
                }
            })?;

            let mut outcomes = BTreeMap::new();
            for edge in &raw.outcomes {
                if edge.code < 0 {
                    return Err(ConfigError::NegativeOutcomeCode {
                        step: raw.id.clone(),
                        code: edge.code,
                    });
                }
                let code =
                    i32::try_from(edge.code).map_err(|_| ConfigError::OutcomeCodeOutOfRange {
                        step: raw.id.clone(),
                        code: edge.code,
                    })?;
                outcomes.insert(code, edge.step.clone());
            }

            let step = Step {
                id: raw.id.clone(),
                role: raw.role.clone(),
                actions: raw
                    .actions
                    .iter()
                    .map(|a| ActionConfig {
                        id: a.id.clone(),
                        requires_ui: a.requires_ui,
                    })
                    .collect(),
                outcomes,
                required_users: raw.required_users as u32,
                assignment,
            };
            if index.insert(step.id.clone(), steps.len()).is_some() {
                return Err(ConfigError::DuplicateStep {
                    workflow: workflow_id,
                    step: raw.id.clone(),
                });
            }
            steps.push(step);
        }

        // Every outcome edge and the first step must point at a real step.
        if !index.contains_key(&def.first_step) {
            return Err(ConfigError::StepNotFound {
                workflow: workflow_id,
                step: def.first_step.clone(),
            });
        }
        for step in &steps {
            for target in step.outcomes.values() {
                if !index.contains_key(target) {
                    return Err(ConfigError::StepNotFound {
                        workflow: workflow_id,
                        step: target.clone(),
                    });
                }
            }
        }

        Ok(Self {
            id: workflow_id,
            first_step: def.first_step.clone(),
            steps,
            index,
            roles,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The designated entry step.
    pub fn first_step(&self) -> &Step {
        // Validated at build time.
        &self.steps[self.index[&self.first_step]]
    }

    /// Look up a step by id.
    pub fn step(&self, id: &str) -> Result<&Step, ConfigError> {
        self.index
            .get(id)
            .map(|&i| &self.steps[i])
            .ok_or_else(|| ConfigError::StepNotFound {
                workflow: self.id.clone(),
                step: id.to_string(),
            })
    }

    /// Resolve the step that follows `current` for an outcome code.
    /// `None` means the outcome is terminal for this step.
    pub fn next_step(&self, current: &Step, code: i32) -> Option<&Step> {
        current
            .outcome_step(code)
            .and_then(|id| self.index.get(id))
            .map(|&i| &self.steps[i])
    }

    /// Look up a role declaration by id.
    pub fn role(&self, id: &str) -> Option<&Role> {
        self.roles.get(id)
    }

    /// All steps in definition order.
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }
}
