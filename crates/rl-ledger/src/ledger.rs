// ledger.rs — Task pool / claim ledger operations.
//
// Every mutation that changes who holds a task also synchronizes grants,
// so that a user holds full capability on a work-item if and only if they
// currently hold a pooled or claimed task on it (or submitted it — the
// read floor lives in rl-grants).
//
// Quorum bookkeeping: claiming inserts an InProgressUser row; finishing
// flips it. Once in-progress + finished reaches the step's required_users
// the remaining candidate pool is cleared — no more candidates needed.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use rl_grants::{GrantSynchronizer, PolicyType};
use rl_model::Step;
use rl_roles::{Principal, RoleMembers};
use uuid::Uuid;

use crate::error::LedgerError;
use crate::item::WorkflowItem;
use crate::tasks::{ClaimedTask, InProgressUser, PoolTask};

#[derive(Default)]
struct LedgerState {
    pool: Vec<PoolTask>,
    claimed: Vec<ClaimedTask>,
    in_progress: HashMap<Uuid, Vec<InProgressUser>>,
}

/// The mutable per-work-item task state, with grant synchronization.
pub struct TaskLedger {
    state: Mutex<LedgerState>,
    grants: Arc<GrantSynchronizer>,
}

impl TaskLedger {
    pub fn new(grants: Arc<GrantSynchronizer>) -> Self {
        Self {
            state: Mutex::new(LedgerState::default()),
            grants,
        }
    }

    pub fn grants(&self) -> &Arc<GrantSynchronizer> {
        &self.grants
    }

    // ------------------------------------------------------------------
    // Pool tasks

    /// Insert one candidate task per eligible user and one per eligible
    /// group, granting each the full capability set. Existing candidate
    /// rows are never duplicated.
    pub fn create_pool_tasks(
        &self,
        wfi: &WorkflowItem,
        candidates: &RoleMembers,
        workflow_id: &str,
        step: &Step,
        action_id: &str,
    ) -> Result<(), LedgerError> {
        let principals: Vec<Principal> = candidates
            .users
            .iter()
            .map(|&u| Principal::User(u))
            .chain(candidates.groups.iter().map(|&g| Principal::Group(g)))
            .collect();
        for candidate in principals {
            let exists = {
                let state = self.state.lock().unwrap();
                state.pool.iter().any(|t| {
                    t.work_item == wfi.id && t.step_id == step.id && t.candidate == candidate
                })
            };
            if exists {
                continue;
            }
            self.state.lock().unwrap().pool.push(PoolTask {
                id: Uuid::new_v4(),
                work_item: wfi.id,
                workflow_id: workflow_id.to_string(),
                step_id: step.id.clone(),
                action_id: action_id.to_string(),
                candidate,
            });
            self.grants
                .grant_all(wfi.item, candidate, PolicyType::Workflow)?;
        }
        Ok(())
    }

    /// Delete one pooled task and revoke its candidate's grants.
    /// Deleting a task that no longer exists is a no-op.
    pub fn delete_pooled_task(&self, wfi: &WorkflowItem, task_id: Uuid) -> Result<(), LedgerError> {
        let removed = {
            let mut state = self.state.lock().unwrap();
            let pos = state
                .pool
                .iter()
                .position(|t| t.id == task_id && t.work_item == wfi.id);
            pos.map(|p| state.pool.remove(p))
        };
        if let Some(task) = removed {
            self.grants.revoke_all(wfi.item, task.candidate)?;
        }
        Ok(())
    }

    /// Delete every pooled task for the work-item, revoking as we go.
    pub fn delete_all_pooled_tasks(&self, wfi: &WorkflowItem) -> Result<(), LedgerError> {
        let removed: Vec<PoolTask> = {
            let mut state = self.state.lock().unwrap();
            let (gone, keep) = state.pool.drain(..).partition(|t| t.work_item == wfi.id);
            state.pool = keep;
            gone
        };
        for task in removed {
            self.grants.revoke_all(wfi.item, task.candidate)?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Claimed tasks

    /// Commit an assignment to a user, replacing any previous claim row
    /// they held on this work-item, and grant the full capability set.
    pub fn create_owned_task(
        &self,
        wfi: &WorkflowItem,
        workflow_id: &str,
        step_id: &str,
        action_id: &str,
        owner: Uuid,
    ) -> Result<ClaimedTask, LedgerError> {
        let task = ClaimedTask {
            id: Uuid::new_v4(),
            work_item: wfi.id,
            workflow_id: workflow_id.to_string(),
            step_id: step_id.to_string(),
            action_id: action_id.to_string(),
            owner,
        };
        {
            let mut state = self.state.lock().unwrap();
            state
                .claimed
                .retain(|t| !(t.work_item == wfi.id && t.owner == owner));
            state.claimed.push(task.clone());
        }
        self.grants
            .grant_all(wfi.item, Principal::User(owner), PolicyType::Workflow)?;
        Ok(task)
    }

    /// Delete a user's claimed task and revoke their grants.
    /// A missing task is a no-op (no error, no grant change).
    pub fn delete_claimed_task(&self, wfi: &WorkflowItem, owner: Uuid) -> Result<(), LedgerError> {
        let removed = {
            let mut state = self.state.lock().unwrap();
            let before = state.claimed.len();
            state
                .claimed
                .retain(|t| !(t.work_item == wfi.id && t.owner == owner));
            state.claimed.len() != before
        };
        if removed {
            self.grants.revoke_all(wfi.item, Principal::User(owner))?;
        }
        Ok(())
    }

    /// Delete every pooled and claimed task for the work-item.
    pub fn delete_all_tasks(&self, wfi: &WorkflowItem) -> Result<(), LedgerError> {
        self.delete_all_pooled_tasks(wfi)?;
        let owners: Vec<Uuid> = {
            let state = self.state.lock().unwrap();
            state
                .claimed
                .iter()
                .filter(|t| t.work_item == wfi.id)
                .map(|t| t.owner)
                .collect()
        };
        for owner in owners {
            self.delete_claimed_task(wfi, owner)?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Quorum bookkeeping

    /// Record that a user has claimed the current step.
    ///
    /// Consumes the user's personal pool row (their grant carries over to
    /// the claim), marks them in-progress, and — when quorum is reached —
    /// clears the remaining candidate pool.
    pub fn add_claimed_user(
        &self,
        wfi: &WorkflowItem,
        step: &Step,
        user: Uuid,
    ) -> Result<(), LedgerError> {
        {
            let mut state = self.state.lock().unwrap();
            let rows = state.in_progress.entry(wfi.id).or_default();
            if rows.iter().any(|r| r.user == user) {
                return Err(LedgerError::AlreadyClaimed {
                    work_item: wfi.id,
                    user,
                });
            }
            // The claim consumes the candidate slot; grants stay with the
            // user through the claim, so no revoke here.
            state.pool.retain(|t| {
                !(t.work_item == wfi.id
                    && t.step_id == step.id
                    && t.candidate == Principal::User(user))
            });
            state
                .in_progress
                .entry(wfi.id)
                .or_default()
                .push(InProgressUser {
                    work_item: wfi.id,
                    user,
                    finished: false,
                });
        }
        self.grants
            .grant_all(wfi.item, Principal::User(user), PolicyType::Workflow)?;

        if self.quorum_reached(wfi, step) {
            tracing::debug!(work_item = %wfi.id, step = %step.id, "quorum reached, clearing task pool");
            self.delete_all_pooled_tasks(wfi)?;
        }
        Ok(())
    }

    /// Undo a user's claim.
    ///
    /// If quorum had been reached (the pool was already cleared), the pool
    /// is regenerated for every currently-eligible candidate except those
    /// still in-progress or finished. Below quorum only the unclaiming
    /// user's personal candidate row needs to come back — group-sourced
    /// rows were never removed.
    pub fn remove_claimed_user(
        &self,
        wfi: &WorkflowItem,
        user: Uuid,
        workflow_id: &str,
        step: &Step,
        candidates: &RoleMembers,
    ) -> Result<(), LedgerError> {
        let quorum_was_met = self.quorum_reached(wfi, step);
        {
            let mut state = self.state.lock().unwrap();
            if let Some(rows) = state.in_progress.get_mut(&wfi.id) {
                rows.retain(|r| r.user != user);
            }
        }
        self.delete_claimed_task(wfi, user)?;

        if quorum_was_met {
            let acting: Vec<Uuid> = self
                .in_progress_users(wfi)
                .into_iter()
                .map(|r| r.user)
                .collect();
            let mut regenerate = candidates.clone();
            regenerate.users.retain(|u| !acting.contains(u));
            let entry = step.entry_action().id.clone();
            self.create_pool_tasks(wfi, &regenerate, workflow_id, step, &entry)?;
        } else if candidates.users.contains(&user) {
            let mut personal = RoleMembers::new();
            personal.add_user(user);
            let entry = step.entry_action().id.clone();
            self.create_pool_tasks(wfi, &personal, workflow_id, step, &entry)?;
        }
        Ok(())
    }

    /// Flip a user's in-progress row to finished. Finished still counts
    /// toward quorum, so the counts do not change. Automatic continuations
    /// may finish a user who never claimed; that inserts a finished row.
    pub fn add_finished_user(&self, wfi: &WorkflowItem, user: Uuid) {
        let mut state = self.state.lock().unwrap();
        let rows = state.in_progress.entry(wfi.id).or_default();
        match rows.iter_mut().find(|r| r.user == user) {
            Some(row) => row.finished = true,
            None => rows.push(InProgressUser {
                work_item: wfi.id,
                user,
                finished: true,
            }),
        }
    }

    /// Delete every in-progress row for the work-item (step completed or
    /// item left the workflow).
    pub fn clear_in_progress_users(&self, wfi: &WorkflowItem) {
        self.state.lock().unwrap().in_progress.remove(&wfi.id);
    }

    /// Whether in-progress + finished has reached the step's quorum.
    /// Reaching it clears the candidate pool; it does not yet mean the
    /// step is complete.
    pub fn quorum_reached(&self, wfi: &WorkflowItem, step: &Step) -> bool {
        let state = self.state.lock().unwrap();
        let count = state
            .in_progress
            .get(&wfi.id)
            .map(|rows| rows.len())
            .unwrap_or(0);
        count as u32 >= step.required_users
    }

    /// Whether every actor has finished and the quorum is satisfied.
    /// Only then does a completing outcome advance the step.
    pub fn step_finished(&self, wfi: &WorkflowItem, step: &Step) -> bool {
        let state = self.state.lock().unwrap();
        let rows = state.in_progress.get(&wfi.id);
        let finished = rows
            .map(|rows| rows.iter().filter(|r| r.finished).count())
            .unwrap_or(0);
        let unfinished = rows
            .map(|rows| rows.iter().filter(|r| !r.finished).count())
            .unwrap_or(0);
        unfinished == 0 && finished as u32 >= step.required_users
    }

    // ------------------------------------------------------------------
    // Queries

    pub fn pool_tasks(&self, wfi: &WorkflowItem) -> Vec<PoolTask> {
        self.state
            .lock()
            .unwrap()
            .pool
            .iter()
            .filter(|t| t.work_item == wfi.id)
            .cloned()
            .collect()
    }

    /// The pooled task carrying this exact candidate, if any.
    pub fn pool_task_for(&self, wfi: &WorkflowItem, candidate: Principal) -> Option<PoolTask> {
        self.state
            .lock()
            .unwrap()
            .pool
            .iter()
            .find(|t| t.work_item == wfi.id && t.candidate == candidate)
            .cloned()
    }

    pub fn claimed_tasks(&self, wfi: &WorkflowItem) -> Vec<ClaimedTask> {
        self.state
            .lock()
            .unwrap()
            .claimed
            .iter()
            .filter(|t| t.work_item == wfi.id)
            .cloned()
            .collect()
    }

    pub fn claimed_task_for(&self, wfi: &WorkflowItem, owner: Uuid) -> Option<ClaimedTask> {
        self.state
            .lock()
            .unwrap()
            .claimed
            .iter()
            .find(|t| t.work_item == wfi.id && t.owner == owner)
            .cloned()
    }

    pub fn in_progress_users(&self, wfi: &WorkflowItem) -> Vec<InProgressUser> {
        self.state
            .lock()
            .unwrap()
            .in_progress
            .get(&wfi.id)
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use rl_grants::{InMemoryAccessControl, InMemoryContent};
    use rl_model::{ActionConfig, TaskAssignment};

    use super::*;

    struct Fixture {
        acl: Arc<InMemoryAccessControl>,
        content: Arc<InMemoryContent>,
        ledger: TaskLedger,
    }

    fn fixture() -> Fixture {
        let acl = Arc::new(InMemoryAccessControl::new());
        let content = Arc::new(InMemoryContent::new());
        let grants = Arc::new(GrantSynchronizer::new(acl.clone(), content.clone()));
        Fixture {
            acl,
            content,
            ledger: TaskLedger::new(grants),
        }
    }

    fn step(required_users: u32) -> Step {
        Step {
            id: "review".to_string(),
            role: Some("reviewer".to_string()),
            actions: vec![ActionConfig {
                id: "reviewaction".to_string(),
                requires_ui: true,
            }],
            outcomes: BTreeMap::new(),
            required_users,
            assignment: TaskAssignment::ClaimPool,
        }
    }

    fn work_item(fx: &Fixture, submitter: Option<Uuid>) -> WorkflowItem {
        let item = fx.content.add_item(submitter, None);
        WorkflowItem {
            id: Uuid::new_v4(),
            item,
            collection: Uuid::new_v4(),
            submitter,
        }
    }

    fn members(users: &[Uuid]) -> RoleMembers {
        let mut m = RoleMembers::new();
        for &u in users {
            m.add_user(u);
        }
        m
    }

    #[test]
    fn pool_tasks_grant_candidates() {
        let fx = fixture();
        let wfi = work_item(&fx, None);
        let user = Uuid::new_v4();
        let group = Uuid::new_v4();
        let mut m = members(&[user]);
        m.add_group(group);

        fx.ledger
            .create_pool_tasks(&wfi, &m, "default", &step(1), "reviewaction")
            .unwrap();

        assert_eq!(fx.ledger.pool_tasks(&wfi).len(), 2);
        assert!(fx
            .ledger
            .pool_task_for(&wfi, Principal::User(user))
            .is_some());
        assert_eq!(
            fx.acl
                .capabilities(Principal::Group(group), rl_grants::GrantTarget::Item(wfi.item))
                .len(),
            5
        );
    }

    #[test]
    fn pool_tasks_do_not_duplicate() {
        let fx = fixture();
        let wfi = work_item(&fx, None);
        let m = members(&[Uuid::new_v4()]);
        let s = step(1);

        fx.ledger
            .create_pool_tasks(&wfi, &m, "default", &s, "reviewaction")
            .unwrap();
        fx.ledger
            .create_pool_tasks(&wfi, &m, "default", &s, "reviewaction")
            .unwrap();

        assert_eq!(fx.ledger.pool_tasks(&wfi).len(), 1);
    }

    #[test]
    fn claim_consumes_personal_slot_and_reaches_quorum() {
        let fx = fixture();
        let wfi = work_item(&fx, None);
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let s = step(1);
        fx.ledger
            .create_pool_tasks(&wfi, &members(&[a, b, c]), "default", &s, "reviewaction")
            .unwrap();

        fx.ledger.add_claimed_user(&wfi, &s, a).unwrap();

        // Quorum 1 reached: the whole pool is gone, not just a's row.
        assert!(fx.ledger.pool_tasks(&wfi).is_empty());
        assert_eq!(fx.ledger.in_progress_users(&wfi).len(), 1);
        // a keeps full capability; b and c lost theirs with the pool.
        assert!(fx
            .ledger
            .grants()
            .holds_full_grant(wfi.item, Principal::User(a))
            .unwrap());
        assert!(!fx
            .ledger
            .grants()
            .holds_full_grant(wfi.item, Principal::User(b))
            .unwrap());
    }

    #[test]
    fn below_quorum_pool_remains_for_others() {
        let fx = fixture();
        let wfi = work_item(&fx, None);
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let s = step(2);
        fx.ledger
            .create_pool_tasks(&wfi, &members(&[a, b]), "default", &s, "reviewaction")
            .unwrap();

        fx.ledger.add_claimed_user(&wfi, &s, a).unwrap();
        assert_eq!(fx.ledger.pool_tasks(&wfi).len(), 1);
        assert!(!fx.ledger.quorum_reached(&wfi, &s));

        fx.ledger.add_claimed_user(&wfi, &s, b).unwrap();
        assert!(fx.ledger.pool_tasks(&wfi).is_empty());
        assert!(fx.ledger.quorum_reached(&wfi, &s));
        // Nobody has finished yet, so the step itself is not complete.
        assert!(!fx.ledger.step_finished(&wfi, &s));
    }

    #[test]
    fn double_claim_is_rejected() {
        let fx = fixture();
        let wfi = work_item(&fx, None);
        let a = Uuid::new_v4();
        let s = step(2);
        fx.ledger
            .create_pool_tasks(&wfi, &members(&[a]), "default", &s, "reviewaction")
            .unwrap();

        fx.ledger.add_claimed_user(&wfi, &s, a).unwrap();
        assert!(matches!(
            fx.ledger.add_claimed_user(&wfi, &s, a),
            Err(LedgerError::AlreadyClaimed { .. })
        ));
    }

    #[test]
    fn finished_still_counts_toward_quorum() {
        let fx = fixture();
        let wfi = work_item(&fx, None);
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let s = step(2);
        fx.ledger
            .create_pool_tasks(&wfi, &members(&[a, b]), "default", &s, "reviewaction")
            .unwrap();
        fx.ledger.add_claimed_user(&wfi, &s, a).unwrap();
        fx.ledger.add_finished_user(&wfi, a);

        assert!(!fx.ledger.quorum_reached(&wfi, &s));
        fx.ledger.add_claimed_user(&wfi, &s, b).unwrap();
        assert!(fx.ledger.quorum_reached(&wfi, &s));
        // b is still working, so the step waits on them.
        assert!(!fx.ledger.step_finished(&wfi, &s));
        fx.ledger.add_finished_user(&wfi, b);
        assert!(fx.ledger.step_finished(&wfi, &s));
        let rows = fx.ledger.in_progress_users(&wfi);
        assert!(rows.iter().any(|r| r.user == a && r.finished));
        assert!(rows.iter().any(|r| r.user == b && r.finished));
    }

    #[test]
    fn unclaim_below_quorum_restores_only_personal_row() {
        let fx = fixture();
        let wfi = work_item(&fx, None);
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let s = step(2);
        let cands = members(&[a, b]);
        fx.ledger
            .create_pool_tasks(&wfi, &cands, "default", &s, "reviewaction")
            .unwrap();
        fx.ledger.add_claimed_user(&wfi, &s, a).unwrap();

        fx.ledger
            .remove_claimed_user(&wfi, a, "default", &s, &cands)
            .unwrap();

        let pool = fx.ledger.pool_tasks(&wfi);
        assert_eq!(pool.len(), 2);
        assert!(fx.ledger.in_progress_users(&wfi).is_empty());
    }

    #[test]
    fn unclaim_after_quorum_regenerates_pool_minus_actors() {
        let fx = fixture();
        let wfi = work_item(&fx, None);
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let s = step(2);
        let cands = members(&[a, b, c]);
        fx.ledger
            .create_pool_tasks(&wfi, &cands, "default", &s, "reviewaction")
            .unwrap();
        fx.ledger.add_claimed_user(&wfi, &s, a).unwrap();
        fx.ledger.add_claimed_user(&wfi, &s, b).unwrap();
        assert!(fx.ledger.pool_tasks(&wfi).is_empty());

        fx.ledger
            .remove_claimed_user(&wfi, b, "default", &s, &cands)
            .unwrap();

        // a is still in progress, so the regenerated pool holds b and c.
        let pool = fx.ledger.pool_tasks(&wfi);
        let candidates: Vec<Principal> = pool.iter().map(|t| t.candidate).collect();
        assert_eq!(pool.len(), 2);
        assert!(candidates.contains(&Principal::User(b)));
        assert!(candidates.contains(&Principal::User(c)));
        assert!(!candidates.contains(&Principal::User(a)));
    }

    #[test]
    fn deleting_missing_tasks_is_a_noop() {
        let fx = fixture();
        let wfi = work_item(&fx, None);
        fx.ledger.delete_pooled_task(&wfi, Uuid::new_v4()).unwrap();
        fx.ledger.delete_claimed_task(&wfi, Uuid::new_v4()).unwrap();
        fx.ledger.delete_all_tasks(&wfi).unwrap();
    }

    #[test]
    fn delete_all_tasks_revokes_everyone_but_submitter_floor() {
        let fx = fixture();
        let submitter = Uuid::new_v4();
        let wfi = work_item(&fx, Some(submitter));
        let s = step(2);
        let cands = members(&[submitter, Uuid::new_v4()]);
        fx.ledger
            .create_pool_tasks(&wfi, &cands, "default", &s, "reviewaction")
            .unwrap();

        fx.ledger.delete_all_tasks(&wfi).unwrap();

        assert!(fx.ledger.pool_tasks(&wfi).is_empty());
        // Submitter retains the read floor.
        let caps = fx.acl.capabilities(
            Principal::User(submitter),
            rl_grants::GrantTarget::Item(wfi.item),
        );
        assert_eq!(caps, vec![rl_grants::Capability::Read]);
    }
}
