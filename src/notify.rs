//! Notification synthesis.
//!
//! Committed writes turn into per-member notifications: the actor never
//! hears about their own action, an assignment only notifies the assignee,
//! and everyone else learns about claims, completions, and reopens. A
//! rolling dedup window keeps the same (kind, task, recipient) triple from
//! firing twice, and a per-recipient cap drops the oldest entries first.
//! Notifications are immutable except for the `read` flag.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;
use uuid::Uuid;

use crate::activity::{derive_action, ActivityAction};
use crate::error::{Error, Result};
use crate::household::Member;
use crate::lock::{FileLock, DEFAULT_LOCK_TIMEOUT_MS};
use crate::storage::Storage;
use crate::store::TaskWrite;
use crate::task::Task;

/// Kind of notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    TaskClaimed,
    TaskCompleted,
    TaskAssigned,
    TaskReopened,
    TaskOverdue,
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationKind::TaskClaimed => write!(f, "task_claimed"),
            NotificationKind::TaskCompleted => write!(f, "task_completed"),
            NotificationKind::TaskAssigned => write!(f, "task_assigned"),
            NotificationKind::TaskReopened => write!(f, "task_reopened"),
            NotificationKind::TaskOverdue => write!(f, "task_overdue"),
        }
    }
}

/// A notification delivered to one member
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Ulid,
    pub recipient: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<Uuid>,
    #[serde(default)]
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    fn new(
        recipient: Uuid,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
        task_id: Option<Uuid>,
    ) -> Self {
        Self {
            id: Ulid::new(),
            recipient,
            kind,
            title: title.into(),
            message: message.into(),
            task_id,
            read: false,
            created_at: Utc::now(),
        }
    }
}

/// On-disk shape of `notifications.json`
#[derive(Debug, Default, Serialize, Deserialize)]
struct NotificationState {
    /// Keyed by recipient member id
    inbox: HashMap<Uuid, Vec<Notification>>,
}

/// Synthesizes and stores notifications for a household
#[derive(Debug, Clone)]
pub struct NotificationEngine {
    storage: Storage,
    /// Per-recipient cap, oldest dropped first
    cap: usize,
    /// Rolling dedup window for (kind, task, recipient)
    dedup_window: Duration,
}

impl NotificationEngine {
    pub fn new(storage: Storage, cap: usize, dedup_window: Duration) -> Self {
        Self {
            storage,
            cap,
            dedup_window,
        }
    }

    /// Derive and persist notifications for a committed write.
    ///
    /// Returns the notifications actually delivered (after dedup).
    pub fn observe(
        &self,
        write: &TaskWrite,
        actor: Uuid,
        members: &[Member],
    ) -> Result<Vec<Notification>> {
        let Some(previous) = &write.previous else {
            // Creation notifies nobody; assignment at creation is picked up
            // by the overdue sweep or a later assign operation
            return Ok(Vec::new());
        };

        let task = &write.task;
        let pending = match derive_action(previous, task) {
            ActivityAction::Claimed => self.fan_out(
                task,
                actor,
                members,
                NotificationKind::TaskClaimed,
                format!("{} was claimed", task.title),
            ),
            ActivityAction::Completed => self.fan_out(
                task,
                actor,
                members,
                NotificationKind::TaskCompleted,
                format!("{} was completed", task.title),
            ),
            ActivityAction::Reopened => self.fan_out(
                task,
                actor,
                members,
                NotificationKind::TaskReopened,
                format!("{} was reopened", task.title),
            ),
            ActivityAction::Assigned => match task.assigned_to {
                Some(assignee) if assignee != actor => {
                    vec![Notification::new(
                        assignee,
                        NotificationKind::TaskAssigned,
                        task.title.clone(),
                        format!("{} was assigned to you", task.title),
                        Some(task.id),
                    )]
                }
                _ => Vec::new(),
            },
            _ => Vec::new(),
        };

        self.deliver(task.household_id, pending)
    }

    /// Flag open unclaimed tasks past their due date, once per recipient
    /// per window
    pub fn sweep_overdue(
        &self,
        household: Uuid,
        tasks: &[Task],
        members: &[Member],
        now: DateTime<Utc>,
    ) -> Result<Vec<Notification>> {
        let mut pending = Vec::new();
        for task in tasks.iter().filter(|t| t.is_overdue(now)) {
            for member in members {
                pending.push(Notification::new(
                    member.id,
                    NotificationKind::TaskOverdue,
                    task.title.clone(),
                    format!("{} is overdue", task.title),
                    Some(task.id),
                ));
            }
        }
        self.deliver(household, pending)
    }

    /// Unread-first inbox for one member, newest first
    pub fn inbox(&self, household: Uuid, recipient: Uuid) -> Result<Vec<Notification>> {
        let state = self.read_state(household)?;
        let mut items = state.inbox.get(&recipient).cloned().unwrap_or_default();
        items.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(items)
    }

    /// Mark one notification as read
    pub fn mark_read(&self, household: Uuid, recipient: Uuid, id: Ulid) -> Result<Notification> {
        self.update_state(household, |state| {
            let items = state
                .inbox
                .get_mut(&recipient)
                .ok_or_else(|| Error::InvalidArgument(format!("no notifications: {id}")))?;
            let item = items
                .iter_mut()
                .find(|n| n.id == id)
                .ok_or_else(|| Error::InvalidArgument(format!("notification not found: {id}")))?;
            item.read = true;
            Ok(item.clone())
        })
    }

    fn fan_out(
        &self,
        task: &Task,
        actor: Uuid,
        members: &[Member],
        kind: NotificationKind,
        message: String,
    ) -> Vec<Notification> {
        members
            .iter()
            .filter(|m| m.id != actor)
            .map(|m| {
                Notification::new(m.id, kind, task.title.clone(), message.clone(), Some(task.id))
            })
            .collect()
    }

    /// Persist pending notifications, applying the dedup window and the
    /// per-recipient cap
    fn deliver(&self, household: Uuid, pending: Vec<Notification>) -> Result<Vec<Notification>> {
        if pending.is_empty() {
            return Ok(Vec::new());
        }

        let window = self.dedup_window;
        let cap = self.cap;
        self.update_state(household, move |state| {
            let mut delivered = Vec::new();
            for notification in pending {
                let inbox = state.inbox.entry(notification.recipient).or_default();

                let cutoff = notification.created_at - window;
                let duplicate = inbox.iter().any(|n| {
                    n.kind == notification.kind
                        && n.task_id == notification.task_id
                        && n.created_at > cutoff
                });
                if duplicate {
                    continue;
                }

                inbox.push(notification.clone());
                if inbox.len() > cap {
                    let excess = inbox.len() - cap;
                    inbox.drain(..excess);
                }
                delivered.push(notification);
            }
            Ok(delivered)
        })
    }

    fn read_state(&self, household: Uuid) -> Result<NotificationState> {
        let path = self.storage.notifications_file(household);
        if !path.exists() {
            return Ok(NotificationState::default());
        }
        self.storage.read_json(&path)
    }

    fn update_state<T, F>(&self, household: Uuid, f: F) -> Result<T>
    where
        F: FnOnce(&mut NotificationState) -> Result<T>,
    {
        let path = self.storage.notifications_file(household);
        let lock_path = path.with_extension("json.lock");
        let _lock = FileLock::acquire(&lock_path, DEFAULT_LOCK_TIMEOUT_MS)?;

        let mut state = if path.exists() {
            self.storage.read_json(&path)?
        } else {
            NotificationState::default()
        };

        let result = f(&mut state)?;
        self.storage.write_json(&path, &state)?;
        Ok(result)
    }
}
