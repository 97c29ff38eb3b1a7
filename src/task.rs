//! Task records and validation.
//!
//! A task is the unit of household work: a bill to pay, a chore to do, a
//! form to file. Records are versioned; every committed write bumps
//! `version` by one, which is what conditional updates compare against.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

// =============================================================================
// Enums
// =============================================================================

/// What kind of work a task represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    Bill,
    Action,
    Reminder,
    Goal,
    Tax,
    Investment,
    Property,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskKind::Bill => write!(f, "bill"),
            TaskKind::Action => write!(f, "action"),
            TaskKind::Reminder => write!(f, "reminder"),
            TaskKind::Goal => write!(f, "goal"),
            TaskKind::Tax => write!(f, "tax"),
            TaskKind::Investment => write!(f, "investment"),
            TaskKind::Property => write!(f, "property"),
        }
    }
}

impl FromStr for TaskKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "bill" => Ok(TaskKind::Bill),
            "action" => Ok(TaskKind::Action),
            "reminder" => Ok(TaskKind::Reminder),
            "goal" => Ok(TaskKind::Goal),
            "tax" => Ok(TaskKind::Tax),
            "investment" => Ok(TaskKind::Investment),
            "property" => Ok(TaskKind::Property),
            _ => Err(Error::InvalidArgument(format!(
                "Invalid task kind '{}'. Expected: bill, action, reminder, goal, tax, investment, property",
                s
            ))),
        }
    }
}

impl Default for TaskKind {
    fn default() -> Self {
        TaskKind::Action
    }
}

/// Two-level priority: things that matter and things that can wait
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Signal,
    Noise,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Signal => write!(f, "signal"),
            Priority::Noise => write!(f, "noise"),
        }
    }
}

impl FromStr for Priority {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "signal" => Ok(Priority::Signal),
            "noise" => Ok(Priority::Noise),
            _ => Err(Error::InvalidArgument(format!(
                "Invalid priority '{}'. Expected: signal, noise",
                s
            ))),
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Noise
    }
}

/// Recurrence cadence for repeating tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recurrence {
    None,
    Daily,
    Weekly,
    Biweekly,
    Monthly,
    Quarterly,
    Annually,
}

impl fmt::Display for Recurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recurrence::None => write!(f, "none"),
            Recurrence::Daily => write!(f, "daily"),
            Recurrence::Weekly => write!(f, "weekly"),
            Recurrence::Biweekly => write!(f, "biweekly"),
            Recurrence::Monthly => write!(f, "monthly"),
            Recurrence::Quarterly => write!(f, "quarterly"),
            Recurrence::Annually => write!(f, "annually"),
        }
    }
}

impl FromStr for Recurrence {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "none" => Ok(Recurrence::None),
            "daily" => Ok(Recurrence::Daily),
            "weekly" => Ok(Recurrence::Weekly),
            "biweekly" => Ok(Recurrence::Biweekly),
            "monthly" => Ok(Recurrence::Monthly),
            "quarterly" => Ok(Recurrence::Quarterly),
            "annually" | "yearly" => Ok(Recurrence::Annually),
            _ => Err(Error::InvalidArgument(format!(
                "Invalid recurrence '{}'. Expected: none, daily, weekly, biweekly, monthly, quarterly, annually",
                s
            ))),
        }
    }
}

impl Default for Recurrence {
    fn default() -> Self {
        Recurrence::None
    }
}

/// Lifecycle status of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Open,
    Claimed,
    InProgress,
    Completed,
    Cancelled,
}

impl TaskStatus {
    /// Terminal statuses accept no further transitions except reopen
    /// (completed only)
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Cancelled)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Open => write!(f, "open"),
            TaskStatus::Claimed => write!(f, "claimed"),
            TaskStatus::InProgress => write!(f, "in_progress"),
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl FromStr for TaskStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "open" => Ok(TaskStatus::Open),
            "claimed" => Ok(TaskStatus::Claimed),
            "in_progress" | "in-progress" => Ok(TaskStatus::InProgress),
            "completed" | "done" => Ok(TaskStatus::Completed),
            "cancelled" | "canceled" => Ok(TaskStatus::Cancelled),
            _ => Err(Error::InvalidArgument(format!(
                "Invalid status '{}'. Expected: open, claimed, in_progress, completed, cancelled",
                s
            ))),
        }
    }
}

// =============================================================================
// Task
// =============================================================================

/// A versioned household task record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub household_id: Uuid,

    /// Finance context the task belongs to, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_id: Option<Uuid>,

    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    pub created_by: Uuid,

    /// Suggested owner; distinct from the claim, which is exclusive
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<Uuid>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claimed_by: Option<Uuid>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claimed_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_notes: Option<String>,

    pub kind: TaskKind,
    pub priority: Priority,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reminder_date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub recurrence: Recurrence,

    pub status: TaskStatus,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// Record version, starts at 1 and increments on every committed write
    pub version: u64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Whether the task is open, unclaimed, and past its due date
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status == TaskStatus::Open
            && self.claimed_by.is_none()
            && self.due_date.is_some_and(|due| due < now)
    }

    /// Consistency checks asserted after every committed write.
    ///
    /// These hold for any record the store ever persists; a violation means
    /// a mutator bypassed the lifecycle rules.
    pub fn check_invariants(&self) -> Result<()> {
        // Completed keeps the claimant for attribution
        if self.claimed_by.is_some()
            && !matches!(
                self.status,
                TaskStatus::Claimed | TaskStatus::InProgress | TaskStatus::Completed
            )
        {
            return Err(Error::Validation(format!(
                "task {} has a claimant but status {}",
                self.id, self.status
            )));
        }

        if self.status == TaskStatus::Completed {
            if self.completed_at.is_none() {
                return Err(Error::Validation(format!(
                    "completed task {} has no completion timestamp",
                    self.id
                )));
            }
            if self.claimed_by.is_none() {
                return Err(Error::Validation(format!(
                    "completed task {} has no completing member",
                    self.id
                )));
            }
        }

        if self.status == TaskStatus::Open && self.claimed_by.is_some() {
            return Err(Error::Validation(format!(
                "open task {} still holds a claim",
                self.id
            )));
        }

        if let Some(amount) = self.amount {
            if !amount.is_finite() || amount < 0.0 {
                return Err(Error::Validation(format!(
                    "task {} has invalid amount {}",
                    self.id, amount
                )));
            }
        }

        Ok(())
    }
}

// =============================================================================
// Draft
// =============================================================================

/// Input for creating a task; validated before a record is minted
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskDraft {
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_id: Option<Uuid>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<Uuid>,

    #[serde(default)]
    pub kind: TaskKind,

    #[serde(default)]
    pub priority: Priority,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reminder_date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub recurrence: Recurrence,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl TaskDraft {
    /// Minimal draft with defaults for everything but the title
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Validate the draft before a record is created from it
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::Validation("title cannot be empty".to_string()));
        }
        if self.title.len() > 500 {
            return Err(Error::Validation(
                "title exceeds 500 characters".to_string(),
            ));
        }
        if let Some(amount) = self.amount {
            if !amount.is_finite() || amount < 0.0 {
                return Err(Error::Validation(format!(
                    "amount must be non-negative, got {}",
                    amount
                )));
            }
        }
        Ok(())
    }

    /// Mint a new task record from this draft
    pub fn into_task(
        mut self,
        household_id: Uuid,
        created_by: Uuid,
        default_currency: &str,
    ) -> Result<Task> {
        self.validate()?;

        // Tag order is irrelevant; store a deduplicated set
        self.tags.sort();
        self.tags.dedup();

        let currency = match (&self.amount, self.currency.take()) {
            (Some(_), Some(code)) => Some(code),
            (Some(_), None) => Some(default_currency.to_string()),
            (None, _) => None,
        };

        let now = Utc::now();
        Ok(Task {
            id: Uuid::new_v4(),
            household_id,
            context_id: self.context_id,
            title: self.title.trim().to_string(),
            notes: self.notes,
            created_by,
            assigned_to: self.assigned_to,
            claimed_by: None,
            claimed_at: None,
            completed_at: None,
            completion_notes: None,
            kind: self.kind,
            priority: self.priority,
            amount: self.amount,
            currency,
            due_date: self.due_date,
            reminder_date: self.reminder_date,
            recurrence: self.recurrence,
            status: TaskStatus::Open,
            tags: self.tags,
            version: 1,
            created_at: now,
            updated_at: now,
        })
    }
}
