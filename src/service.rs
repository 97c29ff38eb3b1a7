//! Service façade.
//!
//! `TaskService` wires the store, claim coordinator, activity log, change
//! feed, and notification engine into one surface. Every mutation follows
//! the same shape: resolve the acting member, run the lifecycle guard
//! inside the store's conditional write, then append activity, publish to
//! the feed, and synthesize notifications. The post-commit steps never
//! unwind the write and never fail the operation; a failure there is
//! logged and the record stays committed.

use chrono::Utc;
use uuid::Uuid;

use crate::activity::{ActivityEvent, ActivityLog};
use crate::claim::ClaimCoordinator;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::feed::{ChangeEvent, ChangeFeed, Subscription};
use crate::household::Member;
use crate::lifecycle::{self, TaskTransition};
use crate::notify::{Notification, NotificationEngine};
use crate::query::{sort_by_due_date, TaskFilter};
use crate::storage::Storage;
use crate::store::{TaskStore, TaskWrite};
use crate::task::{Task, TaskDraft};
use ulid::Ulid;

/// Coordinated entry point for all task operations
pub struct TaskService {
    storage: Storage,
    config: Config,
    store: TaskStore,
    claims: ClaimCoordinator,
    activity: ActivityLog,
    feed: ChangeFeed,
    notifications: NotificationEngine,
}

impl TaskService {
    pub fn new(storage: Storage, config: Config) -> Result<Self> {
        let store = TaskStore::new(storage.clone());
        let claims = ClaimCoordinator::new(store.clone(), config.claims.ttl_duration()?);
        let activity = ActivityLog::new(storage.clone());
        let notifications = NotificationEngine::new(
            storage.clone(),
            config.notifications.cap,
            config.notifications.dedup_window_duration()?,
        );

        Ok(Self {
            storage,
            config,
            store,
            claims,
            activity,
            feed: ChangeFeed::new(),
            notifications,
        })
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Resolve a member and check household membership
    fn member(&self, household: Uuid, member: Uuid) -> Result<Member> {
        let registry = self.storage.read_registry()?;
        let member = registry.member(member)?.clone();
        if member.household_id != household {
            return Err(Error::Forbidden(format!(
                "{} is not a member of this household",
                member.name
            )));
        }
        Ok(member)
    }

    fn members(&self, household: Uuid) -> Result<Vec<Member>> {
        let registry = self.storage.read_registry()?;
        Ok(registry.members_of(household).into_iter().cloned().collect())
    }

    /// Post-commit pipeline: activity, feed, notifications.
    ///
    /// Runs only after a successful write and never unwinds it: the record
    /// is already committed, so a failure here is logged, not surfaced as
    /// an error against an operation that succeeded.
    fn after_commit(&self, write: &TaskWrite, actor: Uuid) {
        if let Err(e) = self.activity.record(write, actor) {
            tracing::warn!(error = %e, task = %write.task.id, "activity append failed");
        }
        self.feed.publish(ChangeEvent::from_write(write));

        match self.members(write.task.household_id) {
            Ok(members) => {
                if let Err(e) = self.notifications.observe(write, actor, &members) {
                    tracing::warn!(error = %e, task = %write.task.id, "notification synthesis failed");
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, task = %write.task.id, "member lookup failed");
            }
        }
    }

    /// Run a lifecycle transition through the conditional-write path
    fn transition(
        &self,
        household: Uuid,
        task: Uuid,
        actor_id: Uuid,
        transition: TaskTransition,
    ) -> Result<Task> {
        let actor = self.member(household, actor_id)?;
        let current = self.store.get(household, task)?;
        let now = Utc::now();

        let write = self
            .store
            .update(household, task, current.version, move |task| {
                lifecycle::apply(task, &transition, &actor, now)
            })?;

        self.after_commit(&write, actor_id);
        Ok(write.task)
    }

    // =========================================================================
    // Operations
    // =========================================================================

    pub fn create_task(&self, household: Uuid, actor: Uuid, draft: TaskDraft) -> Result<Task> {
        let member = self.member(household, actor)?;
        if !member.capabilities.can_edit_tasks {
            return Err(Error::Forbidden(format!(
                "{} cannot create tasks",
                member.name
            )));
        }
        self.storage.init_household_dir(household)?;

        let write = self.store.create(
            household,
            draft,
            actor,
            &self.config.tasks.default_currency,
        )?;
        self.after_commit(&write, actor);
        Ok(write.task)
    }

    pub fn claim_task(&self, household: Uuid, actor: Uuid, task: Uuid) -> Result<Task> {
        let member = self.member(household, actor)?;
        let write = self.claims.claim(household, task, &member)?;
        self.after_commit(&write, actor);
        Ok(write.task)
    }

    pub fn unclaim_task(&self, household: Uuid, actor: Uuid, task: Uuid) -> Result<Task> {
        let member = self.member(household, actor)?;
        let write = self.claims.release(household, task, &member)?;
        self.after_commit(&write, actor);
        Ok(write.task)
    }

    pub fn start_task(&self, household: Uuid, actor: Uuid, task: Uuid) -> Result<Task> {
        self.transition(household, task, actor, TaskTransition::Start)
    }

    pub fn complete_task(
        &self,
        household: Uuid,
        actor: Uuid,
        task: Uuid,
        notes: Option<String>,
    ) -> Result<Task> {
        self.transition(household, task, actor, TaskTransition::Complete { notes })
    }

    pub fn cancel_task(&self, household: Uuid, actor: Uuid, task: Uuid) -> Result<Task> {
        self.transition(household, task, actor, TaskTransition::Cancel)
    }

    pub fn reopen_task(&self, household: Uuid, actor: Uuid, task: Uuid) -> Result<Task> {
        self.transition(household, task, actor, TaskTransition::Reopen)
    }

    /// Suggest an owner. Assignment is advisory; the claim stays exclusive.
    pub fn assign_task(
        &self,
        household: Uuid,
        actor: Uuid,
        task: Uuid,
        assignee: Option<Uuid>,
    ) -> Result<Task> {
        let member = self.member(household, actor)?;
        if !member.capabilities.can_edit_tasks {
            return Err(Error::Forbidden(format!(
                "{} cannot assign tasks",
                member.name
            )));
        }
        if let Some(assignee) = assignee {
            self.member(household, assignee)?;
        }

        let current = self.store.get(household, task)?;
        let now = Utc::now();
        let write = self
            .store
            .update(household, task, current.version, move |task| {
                let mut next = task.clone();
                next.assigned_to = assignee;
                next.updated_at = now;
                Ok(next)
            })?;

        self.after_commit(&write, actor);
        Ok(write.task)
    }

    /// Attach a comment; recorded in the activity log, no task write
    pub fn comment_task(
        &self,
        household: Uuid,
        actor: Uuid,
        task: Uuid,
        text: &str,
    ) -> Result<ActivityEvent> {
        self.member(household, actor)?;
        if text.trim().is_empty() {
            return Err(Error::InvalidArgument(
                "comment cannot be empty".to_string(),
            ));
        }
        let task = self.store.get(household, task)?;
        self.activity.record_comment(&task, actor, text.trim())
    }

    pub fn get_task(&self, household: Uuid, task: Uuid) -> Result<Task> {
        self.store.get(household, task)
    }

    /// Filtered listing, sorted by due date
    pub fn list_tasks(&self, household: Uuid, filter: &TaskFilter) -> Result<Vec<Task>> {
        let mut tasks = filter.apply(self.store.list(household)?);
        sort_by_due_date(&mut tasks);
        Ok(tasks)
    }

    pub fn task_activity(&self, household: Uuid, task: Uuid) -> Result<Vec<ActivityEvent>> {
        self.activity.events_for_task(household, task)
    }

    /// Live change subscription for one household
    pub fn subscribe(&self, household: Uuid) -> Subscription {
        self.feed.subscribe(household)
    }

    pub fn notifications(&self, household: Uuid, member: Uuid) -> Result<Vec<Notification>> {
        self.member(household, member)?;
        self.notifications.inbox(household, member)
    }

    pub fn mark_read(&self, household: Uuid, member: Uuid, id: Ulid) -> Result<Notification> {
        self.member(household, member)?;
        self.notifications.mark_read(household, member, id)
    }

    /// Flag overdue tasks for every member
    pub fn sweep_overdue(&self, household: Uuid) -> Result<Vec<Notification>> {
        let tasks = self.store.list(household)?;
        let members = self.members(household)?;
        self.notifications
            .sweep_overdue(household, &tasks, &members, Utc::now())
    }
}
