// engine.rs — The work-item routing engine.
//
// Entry (start), claiming (claim/unclaim), acting (perform), and the two
// administrative exits (abort, delete_workflow_item) are the public
// surface. Outcome dispatch is the recursive core: given an action's
// result it decides whether to stay on the step, chain into the next
// action, pool the next step, or leave the workflow (archive or return).
//
// All mutations for one work-item are serialized behind a per-item lock
// so the quorum transition (pool deletion) happens at most once per step
// activation. Audit events are emitted after a transition has committed,
// never from inside the recursion.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use rl_grants::{GrantSynchronizer, PolicyType};
use rl_ledger::{ClaimedTask, PoolTask, TaskLedger, WorkflowItem, WorkflowItemStore};
use rl_model::{
    ActionConfig, ActionResult, ConfigError, Step, TaskAssignment, Workflow, WorkflowRegistry,
    OUTCOME_COMPLETE,
};
use rl_roles::{Principal, RoleMembers, RoleResolver, WorkflowItemRoleStore};
use serde_json::Value;
use uuid::Uuid;

use crate::action::ActionRegistry;
use crate::error::EngineError;
use crate::events::{EventLog, TransitionPoint, WorkflowEvent, WorkflowEventSink};
use crate::notify::{NotificationSink, Notifier, TaskNotification};

/// Upper bound on chained automatic transitions for one triggering
/// action. A well-formed graph stays far below this; exceeding it means
/// the automatic actions cycle without reaching a human or a terminal.
const MAX_AUTOMATIC_TRANSITIONS: usize = 64;

/// Where a work-item stands after an engine operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// An action now awaits a human — not necessarily the acting user.
    Pending { step: String, action: String },
    /// Nothing pending for the actor; the item remains under review.
    InReview,
    /// The item was committed to the archive.
    Archived,
    /// The item went back to the author's workspace.
    Returned,
}

/// Result of one dispatch pass, used for the audit event.
struct Transition {
    pending: Option<TransitionPoint>,
    archived: bool,
}

impl Transition {
    fn halted(pending: Option<TransitionPoint>) -> Self {
        Self {
            pending,
            archived: false,
        }
    }
}

/// The routing engine over one set of stores.
pub struct WorkflowEngine {
    registry: Arc<WorkflowRegistry>,
    resolver: Arc<RoleResolver>,
    grants: Arc<GrantSynchronizer>,
    ledger: Arc<TaskLedger>,
    items: Arc<WorkflowItemStore>,
    item_roles: Arc<WorkflowItemRoleStore>,
    actions: ActionRegistry,
    notifier: Notifier,
    events: EventLog,
    locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl WorkflowEngine {
    pub fn new(
        registry: Arc<WorkflowRegistry>,
        resolver: Arc<RoleResolver>,
        grants: Arc<GrantSynchronizer>,
        ledger: Arc<TaskLedger>,
        items: Arc<WorkflowItemStore>,
        item_roles: Arc<WorkflowItemRoleStore>,
    ) -> Self {
        Self {
            registry,
            resolver,
            grants,
            ledger,
            items,
            item_roles,
            actions: ActionRegistry::with_defaults(),
            notifier: Notifier::new(),
            events: EventLog::new(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn register_action(&mut self, id: impl Into<String>, action: Arc<dyn crate::action::Action>) {
        self.actions.register(id, action);
    }

    pub fn set_notification_sink(&mut self, sink: Arc<dyn NotificationSink>) {
        self.notifier.set_sink(sink);
    }

    pub fn add_event_sink(&mut self, sink: Box<dyn WorkflowEventSink>) {
        self.events.add_sink(sink);
    }

    pub fn items(&self) -> &Arc<WorkflowItemStore> {
        &self.items
    }

    pub fn ledger(&self) -> &Arc<TaskLedger> {
        &self.ledger
    }

    // ------------------------------------------------------------------
    // Workflow entry

    /// Enter an item into its collection's workflow.
    ///
    /// The first step activates, then a provenance statement is recorded
    /// and the submitter's edit grants are narrowed to the read floor.
    /// An invalid first step (its role resolves to nobody) falls through
    /// its completion edge; with no edge the item archives immediately.
    pub fn start(&self, item: Uuid, collection: Uuid) -> Result<WorkflowItem, EngineError> {
        let workflow = self.registry.workflow_for(collection)?;
        let submitter = self.grants.content().submitter(item)?;
        let wfi = self.items.create(item, collection, submitter);
        let lock = self.item_lock(wfi.id);
        let _guard = lock.lock().unwrap();

        // Provenance and the submitter's grant churn wait until the entry
        // dispatch succeeds; a failed start must leave the item untouched.
        let transition = match self.enter(&workflow, &wfi) {
            Ok(transition) => transition,
            Err(err) => {
                self.ledger.delete_all_tasks(&wfi)?;
                self.ledger.clear_in_progress_users(&wfi);
                self.grants.revoke_workflow_grants(wfi.item)?;
                self.retire(&wfi);
                return Err(err);
            }
        };

        if let Some(user) = submitter {
            let who = self.display(user)?;
            self.grants.content().append_provenance(
                item,
                &format!("Submitted by {} on {}", who, Utc::now().to_rfc3339()),
            )?;
            // Full edit rights return only when the item leaves review.
            self.grants.revoke_all(item, Principal::User(user))?;
            // A submitter who entered the first step's pool keeps the
            // task grant the narrowing just swept.
            if self.ledger.pool_task_for(&wfi, Principal::User(user)).is_some()
                || self.ledger.claimed_task_for(&wfi, user).is_some()
            {
                self.grants
                    .grant_all(item, Principal::User(user), PolicyType::Workflow)?;
            }
        }

        tracing::info!(work_item = %wfi.id, workflow = %workflow.id(), "workflow started");
        self.emit_event(&workflow, &wfi, None, None, &transition);
        Ok(wfi)
    }

    /// Dispatch into the first step. An invalid entry step (role resolves
    /// to nobody) falls through its completion edge.
    fn enter(&self, workflow: &Workflow, wfi: &WorkflowItem) -> Result<Transition, EngineError> {
        let first = workflow.first_step();
        let entry = if self.step_is_valid(workflow, first, wfi)? {
            Some(first)
        } else {
            workflow.next_step(first, OUTCOME_COMPLETE)
        };
        self.process_next_step(None, workflow, OUTCOME_COMPLETE, wfi, entry, 0)
    }

    /// [`WorkflowEngine::start`] with task-activation notifications muted
    /// for this item (bulk ingest).
    pub fn start_without_notify(
        &self,
        item: Uuid,
        collection: Uuid,
    ) -> Result<WorkflowItem, EngineError> {
        self.notifier.mute(item);
        let result = self.start(item, collection);
        self.notifier.unmute(item);
        result
    }

    // ------------------------------------------------------------------
    // Claiming

    /// Claim a pooled task, personally or through group membership.
    pub fn claim(&self, work_item: Uuid, user: Uuid) -> Result<ClaimedTask, EngineError> {
        let lock = self.item_lock(work_item);
        let _guard = lock.lock().unwrap();
        let wfi = self.items.find(work_item)?;
        let task = self.eligible_pool_task(&wfi, user)?;
        let workflow = self.registry.workflow(&task.workflow_id)?;
        let step = workflow.step(&task.step_id)?;

        self.ledger.add_claimed_user(&wfi, step, user)?;
        let owned =
            self.ledger
                .create_owned_task(&wfi, &task.workflow_id, &task.step_id, &task.action_id, user)?;
        tracing::info!(work_item = %wfi.id, step = %step.id, user = %user, "task claimed");
        Ok(owned)
    }

    /// Give a claimed task back to the pool.
    pub fn unclaim(&self, work_item: Uuid, user: Uuid) -> Result<(), EngineError> {
        let lock = self.item_lock(work_item);
        let _guard = lock.lock().unwrap();
        let wfi = self.items.find(work_item)?;
        let task = self
            .ledger
            .claimed_task_for(&wfi, user)
            .ok_or(EngineError::NotAuthorized {
                work_item: wfi.id,
                user,
            })?;
        let workflow = self.registry.workflow(&task.workflow_id)?;
        let step = workflow.step(&task.step_id)?;
        let candidates = self.step_candidates(&workflow, step, &wfi)?;
        self.ledger
            .remove_claimed_user(&wfi, user, &task.workflow_id, step, &candidates)?;
        tracing::info!(work_item = %wfi.id, step = %step.id, user = %user, "task unclaimed");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Acting

    /// Execute the actor's claimed action and dispatch its outcome.
    ///
    /// Authorization is the claimed task itself: no claim, no action,
    /// no mutation. On success one audit event covers the whole
    /// transition, including any automatic actions chained behind it.
    pub fn perform(
        &self,
        work_item: Uuid,
        user: Uuid,
        input: &Value,
    ) -> Result<Disposition, EngineError> {
        let lock = self.item_lock(work_item);
        let _guard = lock.lock().unwrap();
        let wfi = self.items.find(work_item)?;
        let task = self
            .ledger
            .claimed_task_for(&wfi, user)
            .ok_or(EngineError::NotAuthorized {
                work_item: wfi.id,
                user,
            })?;
        let workflow = self.registry.workflow(&task.workflow_id)?;
        let step = workflow.step(&task.step_id)?;
        let action_cfg = step
            .action(&task.action_id)
            .ok_or_else(|| EngineError::ActionNotInStep {
                step: task.step_id.clone(),
                action: task.action_id.clone(),
            })?
            .clone();

        let behavior = self.actions.get(&task.action_id)?;
        let result = behavior.execute(self, &wfi, step, Some(user), input)?;
        let transition =
            self.process_outcome(Some(user), &workflow, step, &action_cfg, result, &wfi, false, 0)?;

        let previous = Some(TransitionPoint {
            step: task.step_id.clone(),
            action: task.action_id.clone(),
        });
        self.emit_event(&workflow, &wfi, Some(user), previous, &transition);
        Ok(self.disposition(&wfi, &transition))
    }

    // ------------------------------------------------------------------
    // Exits

    /// Send the item back to its author's workspace.
    ///
    /// Records provenance, deletes every task and item role, sweeps the
    /// workflow grants, restores the submitter's full submission rights,
    /// and notifies them. Called by rejecting actions during
    /// [`WorkflowEngine::perform`]; callers outside an action must not
    /// hold the item lock themselves.
    pub fn return_to_author(
        &self,
        wfi: &WorkflowItem,
        actor: Option<Uuid>,
        reason: &str,
    ) -> Result<(), EngineError> {
        let who = match actor {
            Some(user) => self.display(user)?,
            None => "system".to_string(),
        };
        self.grants.content().append_provenance(
            wfi.item,
            &format!(
                "Rejected by {}, reason: {} on {}",
                who,
                reason,
                Utc::now().to_rfc3339()
            ),
        )?;
        self.release_item(wfi)?;
        if let Some(submitter) = wfi.submitter {
            self.grants
                .grant_all(wfi.item, Principal::User(submitter), PolicyType::Submission)?;
        }
        self.grants.content().return_to_workspace(wfi.item)?;
        self.notify_submitter(wfi, "item_returned", vec![reason.to_string()])?;
        self.retire(wfi);
        tracing::info!(work_item = %wfi.id, "item returned to author");
        Ok(())
    }

    /// Administrator-only forced return of an in-workflow item.
    pub fn abort(&self, work_item: Uuid, admin: Uuid) -> Result<(), EngineError> {
        self.require_admin(work_item, admin)?;
        let lock = self.item_lock(work_item);
        let _guard = lock.lock().unwrap();
        let wfi = self.items.find(work_item)?;
        self.release_item(&wfi)?;
        if let Some(submitter) = wfi.submitter {
            self.grants
                .grant_all(wfi.item, Principal::User(submitter), PolicyType::Submission)?;
        }
        self.grants.content().return_to_workspace(wfi.item)?;
        self.retire(&wfi);
        tracing::info!(work_item = %wfi.id, admin = %admin, "workflow aborted");
        Ok(())
    }

    /// Administrator-only deletion of an in-workflow item.
    pub fn delete_workflow_item(&self, work_item: Uuid, admin: Uuid) -> Result<(), EngineError> {
        self.require_admin(work_item, admin)?;
        let lock = self.item_lock(work_item);
        let _guard = lock.lock().unwrap();
        let wfi = self.items.find(work_item)?;
        self.release_item(&wfi)?;
        self.grants.content().delete_item(wfi.item)?;
        self.retire(&wfi);
        tracing::info!(work_item = %wfi.id, admin = %admin, "workflow item deleted");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Outcome dispatch

    #[allow(clippy::too_many_arguments)]
    fn process_outcome(
        &self,
        user: Option<Uuid>,
        workflow: &Workflow,
        step: &Step,
        action: &ActionConfig,
        outcome: ActionResult,
        wfi: &WorkflowItem,
        entered_new_step: bool,
        depth: usize,
    ) -> Result<Transition, EngineError> {
        if depth > MAX_AUTOMATIC_TRANSITIONS {
            return Err(EngineError::CyclicWorkflow {
                workflow: workflow.id().to_string(),
                step: step.id.clone(),
                depth,
            });
        }
        let code = match outcome {
            // More input needed on the same page.
            ActionResult::Page | ActionResult::Error => {
                return Ok(Transition::halted(Some(TransitionPoint {
                    step: step.id.clone(),
                    action: action.id.clone(),
                })));
            }
            // Back to the actor's workspace view; no routing change here.
            ActionResult::Cancel | ActionResult::SubmissionPage => {
                return Ok(Transition::halted(None));
            }
            ActionResult::Outcome(code) => code,
        };

        let next_action = if code == OUTCOME_COMPLETE {
            step.next_action(&action.id)
        } else {
            None
        };

        if let Some(next_action) = next_action {
            let behavior = self.actions.get(&next_action.id)?;
            behavior.activate(self, wfi, step)?;
            if next_action.requires_ui {
                return match user {
                    // The acting user carries straight on to the next action.
                    Some(user) if !entered_new_step => {
                        self.ledger.create_owned_task(
                            wfi,
                            workflow.id(),
                            &step.id,
                            &next_action.id,
                            user,
                        )?;
                        Ok(Transition::halted(Some(TransitionPoint {
                            step: step.id.clone(),
                            action: next_action.id.clone(),
                        })))
                    }
                    // Freshly-entered step: the task pool carries the UI
                    // action; the triggering actor is done.
                    _ => Ok(Transition::halted(None)),
                };
            }
            let result = behavior.execute(self, wfi, step, None, &Value::Null)?;
            return self.process_outcome(
                user,
                workflow,
                step,
                next_action,
                result,
                wfi,
                entered_new_step,
                depth + 1,
            );
        }

        match user {
            Some(user) if !entered_new_step => {
                // Resolve the edge before touching the ledger: a missing
                // mapping must leave every claim and quorum row as it was.
                let next_step = workflow.next_step(step, code);
                if next_step.is_none() && code != OUTCOME_COMPLETE {
                    return Err(EngineError::NoAlternateStep {
                        workflow: workflow.id().to_string(),
                        code,
                    });
                }
                // The actor finished their part of the step.
                self.ledger.add_finished_user(wfi, user);
                let advance = self.ledger.step_finished(wfi, step) && code == OUTCOME_COMPLETE
                    || code != OUTCOME_COMPLETE;
                if advance {
                    self.ledger.clear_in_progress_users(wfi);
                    self.ledger.delete_all_tasks(wfi)?;
                    self.process_next_step(Some(user), workflow, code, wfi, next_step, depth + 1)
                } else {
                    // Quorum outstanding: only this user's claim retires.
                    self.ledger.delete_claimed_task(wfi, user)?;
                    Ok(Transition::halted(None))
                }
            }
            _ => {
                // Automatic completion of a freshly-entered step.
                let next_step = workflow.next_step(step, code);
                self.process_next_step(user, workflow, code, wfi, next_step, depth + 1)
            }
        }
    }

    fn process_next_step(
        &self,
        user: Option<Uuid>,
        workflow: &Workflow,
        outcome_code: i32,
        wfi: &WorkflowItem,
        next: Option<&Step>,
        depth: usize,
    ) -> Result<Transition, EngineError> {
        let Some(step) = next else {
            if outcome_code != OUTCOME_COMPLETE {
                return Err(EngineError::NoAlternateStep {
                    workflow: workflow.id().to_string(),
                    code: outcome_code,
                });
            }
            self.archive(wfi)?;
            return Ok(Transition {
                pending: None,
                archived: true,
            });
        };

        let candidates = self.activate_step(workflow, step, wfi)?;
        let entry = step.entry_action();
        if entry.requires_ui {
            self.alert_step_activated(step, wfi, &candidates)?;
            return Ok(Transition::halted(Some(TransitionPoint {
                step: step.id.clone(),
                action: entry.id.clone(),
            })));
        }
        let behavior = self.actions.get(&entry.id)?;
        behavior.activate(self, wfi, step)?;
        let result = behavior.execute(self, wfi, step, None, &Value::Null)?;
        self.process_outcome(user, workflow, step, entry, result, wfi, true, depth + 1)
    }

    /// Resolve the step's role and materialize its tasks.
    fn activate_step(
        &self,
        workflow: &Workflow,
        step: &Step,
        wfi: &WorkflowItem,
    ) -> Result<RoleMembers, EngineError> {
        let candidates = self.step_candidates(workflow, step, wfi)?;
        if candidates.is_empty() {
            return Ok(candidates);
        }
        let entry = step.entry_action();
        match step.assignment {
            TaskAssignment::ClaimPool => {
                self.ledger
                    .create_pool_tasks(wfi, &candidates, workflow.id(), step, &entry.id)?;
            }
            TaskAssignment::AssignAll => {
                for user in candidates.all_unique_members(self.resolver.identity().as_ref())? {
                    self.ledger
                        .create_owned_task(wfi, workflow.id(), &step.id, &entry.id, user)?;
                }
            }
        }
        tracing::info!(work_item = %wfi.id, step = %step.id, "step activated");
        Ok(candidates)
    }

    fn step_candidates(
        &self,
        workflow: &Workflow,
        step: &Step,
        wfi: &WorkflowItem,
    ) -> Result<RoleMembers, EngineError> {
        let Some(role_id) = &step.role else {
            return Ok(RoleMembers::new());
        };
        let role = workflow
            .role(role_id)
            .ok_or_else(|| ConfigError::RoleNotFound {
                workflow: workflow.id().to_string(),
                role: role_id.clone(),
            })?;
        Ok(self.resolver.resolve(role, wfi.collection, wfi.id)?)
    }

    /// A step is a valid entry point when it has no role (automatic) or
    /// its role resolves to at least one candidate.
    fn step_is_valid(
        &self,
        workflow: &Workflow,
        step: &Step,
        wfi: &WorkflowItem,
    ) -> Result<bool, EngineError> {
        if step.role.is_none() {
            return Ok(true);
        }
        Ok(!self.step_candidates(workflow, step, wfi)?.is_empty())
    }

    /// Commit the item to the archive and retire the work-item.
    fn archive(&self, wfi: &WorkflowItem) -> Result<(), EngineError> {
        self.release_item(wfi)?;
        self.grants.content().install_to_archive(wfi.item)?;
        self.grants.content().clear_workflow_metadata(wfi.item)?;
        self.notify_submitter(wfi, "item_archived", vec![])?;
        self.retire(wfi);
        tracing::info!(work_item = %wfi.id, item = %wfi.item, "item archived");
        Ok(())
    }

    /// Shared exit cleanup: tasks, quorum rows, item roles, and every
    /// workflow-created grant. Submission-time grants survive.
    fn release_item(&self, wfi: &WorkflowItem) -> Result<(), EngineError> {
        self.ledger.delete_all_tasks(wfi)?;
        self.ledger.clear_in_progress_users(wfi);
        self.item_roles.delete_for_item(wfi.id);
        self.grants.revoke_workflow_grants(wfi.item)?;
        self.grants.grant_submitter_read(wfi.item)?;
        Ok(())
    }

    fn retire(&self, wfi: &WorkflowItem) {
        self.items.remove(wfi.id);
        self.locks.lock().unwrap().remove(&wfi.id);
    }

    // ------------------------------------------------------------------
    // Helpers

    fn item_lock(&self, work_item: Uuid) -> Arc<Mutex<()>> {
        self.locks
            .lock()
            .unwrap()
            .entry(work_item)
            .or_default()
            .clone()
    }

    fn require_admin(&self, work_item: Uuid, user: Uuid) -> Result<(), EngineError> {
        if self.resolver.identity().is_admin(user)? {
            Ok(())
        } else {
            Err(EngineError::NotAuthorized { work_item, user })
        }
    }

    /// The pooled task this user may claim: their personal row, else any
    /// group row whose membership reaches them.
    fn eligible_pool_task(&self, wfi: &WorkflowItem, user: Uuid) -> Result<PoolTask, EngineError> {
        if let Some(task) = self.ledger.pool_task_for(wfi, Principal::User(user)) {
            return Ok(task);
        }
        for task in self.ledger.pool_tasks(wfi) {
            if let Principal::Group(group) = task.candidate {
                if self.resolver.identity().expand_group(group)?.contains(&user) {
                    return Ok(task);
                }
            }
        }
        Err(EngineError::NotAuthorized {
            work_item: wfi.id,
            user,
        })
    }

    fn alert_step_activated(
        &self,
        step: &Step,
        wfi: &WorkflowItem,
        candidates: &RoleMembers,
    ) -> Result<(), EngineError> {
        let recipients: Vec<Uuid> = candidates
            .all_unique_members(self.resolver.identity().as_ref())?
            .into_iter()
            .collect();
        let title = self.item_title(wfi)?;
        self.notifier.notify(
            wfi.item,
            TaskNotification {
                template: "task_activated".to_string(),
                recipients,
                arguments: vec![title, step.id.clone()],
            },
        );
        Ok(())
    }

    fn notify_submitter(
        &self,
        wfi: &WorkflowItem,
        template: &str,
        mut arguments: Vec<String>,
    ) -> Result<(), EngineError> {
        let Some(submitter) = wfi.submitter else {
            return Ok(());
        };
        arguments.insert(0, self.item_title(wfi)?);
        self.notifier.notify(
            wfi.item,
            TaskNotification {
                template: template.to_string(),
                recipients: vec![submitter],
                arguments,
            },
        );
        Ok(())
    }

    fn item_title(&self, wfi: &WorkflowItem) -> Result<String, EngineError> {
        Ok(self
            .grants
            .content()
            .item_title(wfi.item)?
            .unwrap_or_else(|| "untitled".to_string()))
    }

    fn display(&self, user: Uuid) -> Result<String, EngineError> {
        Ok(self
            .resolver
            .identity()
            .user_display(user)?
            .unwrap_or_else(|| user.to_string()))
    }

    fn disposition(&self, wfi: &WorkflowItem, transition: &Transition) -> Disposition {
        if transition.archived {
            return Disposition::Archived;
        }
        if let Some(point) = &transition.pending {
            return Disposition::Pending {
                step: point.step.clone(),
                action: point.action.clone(),
            };
        }
        if !self.items.contains(wfi.id) {
            return Disposition::Returned;
        }
        Disposition::InReview
    }

    fn emit_event(
        &self,
        workflow: &Workflow,
        wfi: &WorkflowItem,
        actor: Option<Uuid>,
        previous: Option<TransitionPoint>,
        transition: &Transition,
    ) {
        let task_owners = self
            .ledger
            .claimed_tasks(wfi)
            .into_iter()
            .map(|t| t.owner)
            .collect();
        let group_owners = self
            .ledger
            .pool_tasks(wfi)
            .into_iter()
            .filter_map(|t| match t.candidate {
                Principal::Group(group) => Some(group),
                Principal::User(_) => None,
            })
            .collect();
        self.events.emit(&WorkflowEvent {
            workflow_id: workflow.id().to_string(),
            work_item: wfi.id,
            item: wfi.item,
            actor,
            previous,
            current: transition.pending.clone(),
            task_owners,
            group_owners,
            timestamp: Utc::now(),
        });
    }
}
