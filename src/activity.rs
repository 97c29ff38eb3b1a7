//! Activity log.
//!
//! Every accepted task write produces exactly one activity event, appended
//! to the household's `activity.jsonl`. The log is the audit trail: events
//! are never mutated or deleted. The action is derived from the before and
//! after records, so callers cannot mislabel what happened.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;
use uuid::Uuid;

use crate::error::Result;
use crate::store::TaskWrite;
use crate::storage::Storage;
use crate::task::{Task, TaskStatus};

/// What a task write amounted to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityAction {
    Created,
    Claimed,
    Unclaimed,
    Completed,
    Reopened,
    Assigned,
    Updated,
    Commented,
}

impl fmt::Display for ActivityAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivityAction::Created => write!(f, "created"),
            ActivityAction::Claimed => write!(f, "claimed"),
            ActivityAction::Unclaimed => write!(f, "unclaimed"),
            ActivityAction::Completed => write!(f, "completed"),
            ActivityAction::Reopened => write!(f, "reopened"),
            ActivityAction::Assigned => write!(f, "assigned"),
            ActivityAction::Updated => write!(f, "updated"),
            ActivityAction::Commented => write!(f, "commented"),
        }
    }
}

/// Derive the action from a before/after pair.
///
/// Deterministic and total: every possible pair maps to exactly one action.
/// Checks run in precedence order; the first match wins.
pub fn derive_action(previous: &Task, current: &Task) -> ActivityAction {
    if previous.claimed_by.is_none() && current.claimed_by.is_some() {
        return ActivityAction::Claimed;
    }
    if previous.claimed_by.is_some() && current.claimed_by.is_none() {
        if previous.status == TaskStatus::Completed && current.status == TaskStatus::Open {
            return ActivityAction::Reopened;
        }
        return ActivityAction::Unclaimed;
    }
    if previous.status != TaskStatus::Completed && current.status == TaskStatus::Completed {
        return ActivityAction::Completed;
    }
    if previous.status == TaskStatus::Completed && current.status == TaskStatus::Open {
        return ActivityAction::Reopened;
    }
    if previous.assigned_to != current.assigned_to {
        return ActivityAction::Assigned;
    }
    ActivityAction::Updated
}

/// One entry in the activity log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEvent {
    /// Lexically time-ordered event id
    pub id: Ulid,
    pub task_id: Uuid,
    pub household_id: Uuid,
    /// Member whose operation produced this event
    pub actor: Uuid,
    pub action: ActivityAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

impl ActivityEvent {
    pub fn new(
        task_id: Uuid,
        household_id: Uuid,
        actor: Uuid,
        action: ActivityAction,
        details: Option<serde_json::Value>,
    ) -> Self {
        Self {
            id: Ulid::new(),
            task_id,
            household_id,
            actor,
            action,
            details,
            timestamp: Utc::now(),
        }
    }
}

/// Append-only activity log backed by per-household JSONL files
#[derive(Debug, Clone)]
pub struct ActivityLog {
    storage: Storage,
}

impl ActivityLog {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// Record the event for an accepted write, deriving the action
    pub fn record(&self, write: &TaskWrite, actor: Uuid) -> Result<ActivityEvent> {
        let action = match &write.previous {
            None => ActivityAction::Created,
            Some(previous) => derive_action(previous, &write.task),
        };
        self.append(
            write.task.household_id,
            ActivityEvent::new(write.task.id, write.task.household_id, actor, action, None),
        )
    }

    /// Record a comment against a task
    pub fn record_comment(&self, task: &Task, actor: Uuid, text: &str) -> Result<ActivityEvent> {
        self.append(
            task.household_id,
            ActivityEvent::new(
                task.id,
                task.household_id,
                actor,
                ActivityAction::Commented,
                Some(serde_json::json!({ "comment": text })),
            ),
        )
    }

    fn append(&self, household: Uuid, event: ActivityEvent) -> Result<ActivityEvent> {
        let path = self.storage.activity_file(household);
        self.storage.append_jsonl(&path, &event)?;
        tracing::debug!(
            event = %event.id,
            task = %event.task_id,
            action = %event.action,
            "activity recorded"
        );
        Ok(event)
    }

    /// All events for a household, in append order
    pub fn events(&self, household: Uuid) -> Result<Vec<ActivityEvent>> {
        self.storage.read_jsonl(&self.storage.activity_file(household))
    }

    /// Events for a single task, in append order
    pub fn events_for_task(&self, household: Uuid, task: Uuid) -> Result<Vec<ActivityEvent>> {
        Ok(self
            .events(household)?
            .into_iter()
            .filter(|e| e.task_id == task)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskDraft;
    use tempfile::TempDir;

    fn task_pair() -> (Task, Task) {
        let task = TaskDraft::new("Chore")
            .into_task(Uuid::new_v4(), Uuid::new_v4(), "USD")
            .unwrap();
        (task.clone(), task)
    }

    #[test]
    fn claim_set_derives_claimed() {
        let (previous, mut current) = task_pair();
        current.status = TaskStatus::Claimed;
        current.claimed_by = Some(Uuid::new_v4());
        assert_eq!(derive_action(&previous, &current), ActivityAction::Claimed);
    }

    #[test]
    fn claim_cleared_derives_unclaimed() {
        let (mut previous, current) = task_pair();
        previous.status = TaskStatus::Claimed;
        previous.claimed_by = Some(Uuid::new_v4());
        assert_eq!(
            derive_action(&previous, &current),
            ActivityAction::Unclaimed
        );
    }

    #[test]
    fn completion_derives_completed() {
        let (mut previous, mut current) = task_pair();
        let member = Uuid::new_v4();
        previous.status = TaskStatus::InProgress;
        previous.claimed_by = Some(member);
        current.status = TaskStatus::Completed;
        current.claimed_by = Some(member);
        current.completed_at = Some(Utc::now());
        assert_eq!(
            derive_action(&previous, &current),
            ActivityAction::Completed
        );
    }

    #[test]
    fn completed_to_open_derives_reopened() {
        let (mut previous, current) = task_pair();
        previous.status = TaskStatus::Completed;
        previous.claimed_by = Some(Uuid::new_v4());
        previous.completed_at = Some(Utc::now());
        assert_eq!(derive_action(&previous, &current), ActivityAction::Reopened);
    }

    #[test]
    fn assignment_change_derives_assigned() {
        let (previous, mut current) = task_pair();
        current.assigned_to = Some(Uuid::new_v4());
        assert_eq!(derive_action(&previous, &current), ActivityAction::Assigned);
    }

    #[test]
    fn anything_else_derives_updated() {
        let (previous, mut current) = task_pair();
        current.notes = Some("new notes".to_string());
        assert_eq!(derive_action(&previous, &current), ActivityAction::Updated);

        // Cancellation is a plain update in the log
        let (previous, mut current) = task_pair();
        current.status = TaskStatus::Cancelled;
        assert_eq!(derive_action(&previous, &current), ActivityAction::Updated);
    }

    #[test]
    fn log_appends_in_order() {
        let temp = TempDir::new().unwrap();
        let storage = Storage::new(temp.path().join(".hearth"));
        storage.init().unwrap();
        let household = Uuid::new_v4();
        storage.init_household_dir(household).unwrap();

        let log = ActivityLog::new(storage);
        let actor = Uuid::new_v4();
        let task = TaskDraft::new("Chore")
            .into_task(household, actor, "USD")
            .unwrap();

        log.record(
            &TaskWrite {
                previous: None,
                task: task.clone(),
            },
            actor,
        )
        .unwrap();
        log.record_comment(&task, actor, "on it tonight").unwrap();

        let events = log.events_for_task(household, task.id).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].action, ActivityAction::Created);
        assert_eq!(events[1].action, ActivityAction::Commented);
        assert_eq!(
            events[1].details.as_ref().unwrap()["comment"],
            "on it tonight"
        );
        // Ulids are lexically ordered by creation time
        assert!(events[0].id < events[1].id);
    }
}
