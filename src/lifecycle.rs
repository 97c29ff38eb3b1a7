//! Task lifecycle state machine.
//!
//! Transition table:
//!
//! ```text
//! open        --claim-->    claimed      (any member with claim capability)
//! claimed     --start-->    in_progress  (claimant, or admin)
//! claimed     --unclaim-->  open         (claimant, or admin force-release)
//! in_progress --complete--> completed    (claimant, or admin)
//! claimed     --complete--> completed    (claimant, or admin)
//! completed   --reopen-->   open         (admin/owner only)
//! any non-terminal --cancel--> cancelled (creator, or admin)
//! ```
//!
//! Guards run before any store write: a rejected transition leaves the
//! record untouched. `apply` returns the mutated copy; committing it is the
//! store's job.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};
use crate::household::Member;
use crate::task::{Task, TaskStatus};

/// Lifecycle transition requested against a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "transition")]
pub enum TaskTransition {
    Claim,
    Unclaim,
    Start,
    Complete {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        notes: Option<String>,
    },
    Cancel,
    Reopen,
}

impl TaskTransition {
    /// Short name used in errors and logs
    pub fn name(&self) -> &'static str {
        match self {
            TaskTransition::Claim => "claim",
            TaskTransition::Unclaim => "unclaim",
            TaskTransition::Start => "start",
            TaskTransition::Complete { .. } => "complete",
            TaskTransition::Cancel => "cancel",
            TaskTransition::Reopen => "reopen",
        }
    }
}

impl fmt::Display for TaskTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

fn invalid(task: &Task, transition: &TaskTransition) -> Error {
    Error::InvalidTransition {
        task: task.id,
        from: task.status.to_string(),
        event: transition.name().to_string(),
    }
}

/// True when the actor holds the claim or can override it
fn holds_or_overrides(task: &Task, actor: &Member) -> bool {
    task.claimed_by == Some(actor.id) || actor.is_admin()
}

/// Apply a lifecycle transition, returning the mutated copy.
///
/// Checks the capability/ownership guard first, then the status table.
/// The caller commits the returned record through a conditional write;
/// nothing is persisted here.
pub fn apply(
    task: &Task,
    transition: &TaskTransition,
    actor: &Member,
    now: DateTime<Utc>,
) -> Result<Task> {
    let mut next = task.clone();

    match transition {
        TaskTransition::Claim => {
            if !actor.capabilities.can_claim_tasks {
                return Err(Error::Forbidden(format!(
                    "{} cannot claim tasks",
                    actor.name
                )));
            }
            // Holder check first: a claimed task is never Open, and a
            // losing claimant must see AlreadyClaimed, not a status error
            if let Some(holder) = task.claimed_by {
                return Err(Error::AlreadyClaimed {
                    task: task.id,
                    holder,
                });
            }
            if task.status != TaskStatus::Open {
                return Err(invalid(task, transition));
            }
            next.status = TaskStatus::Claimed;
            next.claimed_by = Some(actor.id);
            next.claimed_at = Some(now);
        }

        TaskTransition::Unclaim => {
            if task.status != TaskStatus::Claimed {
                return Err(invalid(task, transition));
            }
            if !holds_or_overrides(task, actor) {
                return Err(Error::Forbidden(format!(
                    "{} does not hold the claim",
                    actor.name
                )));
            }
            next.status = TaskStatus::Open;
            next.claimed_by = None;
            next.claimed_at = None;
        }

        TaskTransition::Start => {
            if task.status != TaskStatus::Claimed {
                return Err(invalid(task, transition));
            }
            if !holds_or_overrides(task, actor) {
                return Err(Error::Forbidden(format!(
                    "{} does not hold the claim",
                    actor.name
                )));
            }
            next.status = TaskStatus::InProgress;
        }

        TaskTransition::Complete { notes } => {
            if !matches!(task.status, TaskStatus::Claimed | TaskStatus::InProgress) {
                return Err(invalid(task, transition));
            }
            if !holds_or_overrides(task, actor) {
                return Err(Error::Forbidden(format!(
                    "{} does not hold the claim",
                    actor.name
                )));
            }
            next.status = TaskStatus::Completed;
            next.completed_at = Some(now);
            next.completion_notes = notes.clone();
            // Completion is attributed to whoever held the claim; an admin
            // finishing someone else's task takes the claim over.
            if task.claimed_by != Some(actor.id) {
                next.claimed_by = Some(actor.id);
            }
        }

        TaskTransition::Cancel => {
            if task.status.is_terminal() {
                return Err(invalid(task, transition));
            }
            if task.created_by != actor.id && !actor.is_admin() {
                return Err(Error::Forbidden(format!(
                    "{} did not create this task",
                    actor.name
                )));
            }
            next.status = TaskStatus::Cancelled;
            next.claimed_by = None;
            next.claimed_at = None;
        }

        TaskTransition::Reopen => {
            if task.status != TaskStatus::Completed {
                return Err(invalid(task, transition));
            }
            if !actor.is_admin() {
                return Err(Error::Forbidden(format!(
                    "{} cannot reopen tasks",
                    actor.name
                )));
            }
            next.status = TaskStatus::Open;
            next.claimed_by = None;
            next.claimed_at = None;
            next.completed_at = None;
            next.completion_notes = None;
        }
    }

    next.updated_at = now;
    Ok(next)
}
