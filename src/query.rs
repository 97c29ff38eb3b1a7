//! Read-side queries over task lists.
//!
//! Pure functions: filtering and sorting never touch storage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::task::{Priority, Task, TaskStatus};

/// Filter criteria for task listings; unset fields match everything
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claimed_by: Option<Uuid>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,

    /// Open, unclaimed, and past due at the given instant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overdue_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_id: Option<Uuid>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl TaskFilter {
    /// Whether a task matches every set criterion
    pub fn matches(&self, task: &Task) -> bool {
        if let Some(status) = self.status {
            if task.status != status {
                return false;
            }
        }
        if let Some(claimant) = self.claimed_by {
            if task.claimed_by != Some(claimant) {
                return false;
            }
        }
        if let Some(priority) = self.priority {
            if task.priority != priority {
                return false;
            }
        }
        if let Some(now) = self.overdue_at {
            if !task.is_overdue(now) {
                return false;
            }
        }
        if let Some(context) = self.context_id {
            if task.context_id != Some(context) {
                return false;
            }
        }
        if let Some(tag) = &self.tag {
            if !task.tags.iter().any(|t| t == tag) {
                return false;
            }
        }
        true
    }

    /// Apply the filter to a task list
    pub fn apply(&self, tasks: Vec<Task>) -> Vec<Task> {
        tasks.into_iter().filter(|t| self.matches(t)).collect()
    }
}

/// Sort by due date ascending, tasks without a due date last, id as the
/// tiebreak so the order is stable across runs
pub fn sort_by_due_date(tasks: &mut [Task]) {
    tasks.sort_by(|a, b| match (a.due_date, b.due_date) {
        (Some(da), Some(db)) => da.cmp(&db).then_with(|| a.id.cmp(&b.id)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.id.cmp(&b.id),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskDraft;
    use chrono::Duration;

    fn task(title: &str) -> Task {
        TaskDraft::new(title)
            .into_task(Uuid::new_v4(), Uuid::new_v4(), "USD")
            .unwrap()
    }

    #[test]
    fn empty_filter_matches_all() {
        let filter = TaskFilter::default();
        assert!(filter.matches(&task("anything")));
    }

    #[test]
    fn status_and_priority_filters() {
        let mut signal = task("Important");
        signal.priority = Priority::Signal;

        let filter = TaskFilter {
            priority: Some(Priority::Signal),
            ..Default::default()
        };
        assert!(filter.matches(&signal));
        assert!(!filter.matches(&task("Ordinary")));

        let filter = TaskFilter {
            status: Some(TaskStatus::Completed),
            ..Default::default()
        };
        assert!(!filter.matches(&signal));
    }

    #[test]
    fn claimant_filter() {
        let member = Uuid::new_v4();
        let mut claimed = task("Mine");
        claimed.status = TaskStatus::Claimed;
        claimed.claimed_by = Some(member);

        let filter = TaskFilter {
            claimed_by: Some(member),
            ..Default::default()
        };
        assert!(filter.matches(&claimed));
        assert!(!filter.matches(&task("Unclaimed")));
    }

    #[test]
    fn overdue_filter() {
        let now = Utc::now();
        let mut overdue = task("Late");
        overdue.due_date = Some(now - Duration::hours(2));
        let mut upcoming = task("Soon");
        upcoming.due_date = Some(now + Duration::hours(2));

        let filter = TaskFilter {
            overdue_at: Some(now),
            ..Default::default()
        };
        let matched = filter.apply(vec![overdue.clone(), upcoming, task("No due date")]);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].id, overdue.id);
    }

    #[test]
    fn tag_filter() {
        let mut tagged = task("Taxes");
        tagged.tags = vec!["2026".to_string(), "urgent".to_string()];

        let filter = TaskFilter {
            tag: Some("urgent".to_string()),
            ..Default::default()
        };
        assert!(filter.matches(&tagged));

        let filter = TaskFilter {
            tag: Some("later".to_string()),
            ..Default::default()
        };
        assert!(!filter.matches(&tagged));
    }

    #[test]
    fn due_date_sort_nulls_last() {
        let now = Utc::now();
        let mut tomorrow = task("Tomorrow");
        tomorrow.due_date = Some(now + Duration::days(1));
        let mut today = task("Today");
        today.due_date = Some(now);
        let dateless = task("Whenever");

        let mut tasks = vec![dateless.clone(), tomorrow.clone(), today.clone()];
        sort_by_due_date(&mut tasks);

        assert_eq!(tasks[0].id, today.id);
        assert_eq!(tasks[1].id, tomorrow.id);
        assert_eq!(tasks[2].id, dateless.id);
    }

    #[test]
    fn equal_due_dates_break_ties_by_id() {
        let due = Utc::now();
        let mut a = task("A");
        a.due_date = Some(due);
        let mut b = task("B");
        b.due_date = Some(due);

        let mut tasks = vec![a.clone(), b.clone()];
        sort_by_due_date(&mut tasks);
        let mut again = vec![b, a];
        sort_by_due_date(&mut again);

        assert_eq!(tasks[0].id, again[0].id);
        assert_eq!(tasks[1].id, again[1].id);
    }
}
