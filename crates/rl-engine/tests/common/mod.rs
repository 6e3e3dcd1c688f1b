// common/mod.rs — Shared fixtures for the engine integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use serde_json::Value;
use uuid::Uuid;

use rl_engine::{Action, EngineError, NotificationSink, TaskNotification, WorkflowEngine};
use rl_grants::{GrantSynchronizer, InMemoryAccessControl, InMemoryContent};
use rl_ledger::{TaskLedger, WorkflowItem, WorkflowItemStore};
use rl_model::{
    ActionDef, ActionResult, OutcomeDef, RoleDef, Step, StepDef, WorkflowDef, WorkflowRegistry,
};
use rl_roles::{CollectionRoleStore, InMemoryIdentity, RoleResolver, WorkflowItemRoleStore};

pub struct Harness {
    pub acl: Arc<InMemoryAccessControl>,
    pub content: Arc<InMemoryContent>,
    pub items: Arc<WorkflowItemStore>,
    pub ledger: Arc<TaskLedger>,
    pub collection_roles: Arc<CollectionRoleStore>,
    pub item_roles: Arc<WorkflowItemRoleStore>,
    pub engine: WorkflowEngine,
    pub collection: Uuid,
}

/// Wire the full stack over in-memory stores. The identity store must be
/// fully populated up front; the resolver takes it read-only.
pub fn harness(identity: InMemoryIdentity, defs: Vec<WorkflowDef>, default: &str) -> Harness {
    let mut registry = WorkflowRegistry::new();
    for def in defs {
        registry.add_definition(def);
    }
    registry.set_default(default);

    let acl = Arc::new(InMemoryAccessControl::new());
    let content = Arc::new(InMemoryContent::new());
    let grants = Arc::new(GrantSynchronizer::new(acl.clone(), content.clone()));
    let ledger = Arc::new(TaskLedger::new(grants.clone()));
    let items = Arc::new(WorkflowItemStore::new());
    let collection_roles = Arc::new(CollectionRoleStore::new());
    let item_roles = Arc::new(WorkflowItemRoleStore::new());
    let resolver = Arc::new(RoleResolver::new(
        Arc::new(identity),
        collection_roles.clone(),
        item_roles.clone(),
    ));

    let engine = WorkflowEngine::new(
        Arc::new(registry),
        resolver,
        grants,
        ledger.clone(),
        items.clone(),
        item_roles.clone(),
    );

    Harness {
        acl,
        content,
        items,
        ledger,
        collection_roles,
        item_roles,
        engine,
        collection: Uuid::new_v4(),
    }
}

fn action(id: &str, requires_ui: bool) -> ActionDef {
    ActionDef {
        id: id.to_string(),
        requires_ui,
    }
}

fn reviewer_role() -> RoleDef {
    RoleDef {
        id: "reviewer".to_string(),
        name: "Reviewer".to_string(),
        description: None,
        internal: false,
        scope: "collection".to_string(),
    }
}

/// One human review step (collection-scope "reviewer" role, quorum as
/// given) whose completion flows into an automatic final step that
/// archives the item.
pub fn review_def(id: &str, required_users: i64) -> WorkflowDef {
    WorkflowDef {
        id: id.to_string(),
        first_step: "review".to_string(),
        roles: vec![reviewer_role()],
        steps: vec![
            StepDef {
                id: "review".to_string(),
                role: Some("reviewer".to_string()),
                actions: vec![action("reviewaction", true)],
                outcomes: vec![OutcomeDef {
                    code: 0,
                    step: "final".to_string(),
                }],
                required_users,
                assignment: "claim".to_string(),
            },
            StepDef {
                id: "final".to_string(),
                role: None,
                actions: vec![action("autoapprove", false)],
                outcomes: vec![],
                required_users: 1,
                assignment: "claim".to_string(),
            },
        ],
    }
}

/// Approve/reject input helpers.
pub fn approve() -> Value {
    serde_json::json!({ "decision": "approve" })
}

pub fn reject(reason: &str) -> Value {
    serde_json::json!({ "decision": "reject", "reason": reason })
}

/// Records every delivered notification.
#[derive(Default)]
pub struct RecordingSink {
    pub delivered: Mutex<Vec<TaskNotification>>,
}

impl NotificationSink for RecordingSink {
    fn deliver(&self, notification: &TaskNotification) -> Result<(), EngineError> {
        self.delivered.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

impl RecordingSink {
    pub fn templates(&self) -> Vec<String> {
        self.delivered
            .lock()
            .unwrap()
            .iter()
            .map(|n| n.template.clone())
            .collect()
    }
}

/// Returns `Outcome(score)` from the input, for alternate-edge tests.
pub struct ScoreAction;

impl Action for ScoreAction {
    fn execute(
        &self,
        _engine: &WorkflowEngine,
        _wfi: &WorkflowItem,
        _step: &Step,
        _user: Option<Uuid>,
        input: &Value,
    ) -> Result<ActionResult, EngineError> {
        Ok(input
            .get("score")
            .and_then(Value::as_i64)
            .map(|score| ActionResult::Outcome(score as i32))
            .unwrap_or(ActionResult::Page))
    }
}
