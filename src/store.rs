//! Versioned task store with conditional writes.
//!
//! The snapshot file `tasks.json` holds every task of a household. Writers
//! take the file lock, re-read the snapshot, compare the stored version
//! against the caller's expected version, and only then apply the mutation
//! and bump the version. A mismatch is a `VersionConflict` with no partial
//! effects; callers re-read and retry. This is the single serialization
//! point for all task mutations.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::lock::{self, FileLock, DEFAULT_LOCK_TIMEOUT_MS};
use crate::storage::Storage;
use crate::task::{Task, TaskDraft};

/// On-disk shape of `tasks.json`, keyed by task id for stable ordering
#[derive(Debug, Default, Serialize, Deserialize)]
struct TaskSnapshot {
    tasks: BTreeMap<Uuid, Task>,
}

/// The outcome of a committed write: the record before and after.
///
/// `previous` is `None` for inserts. This pair is what the activity log
/// derives its action from and what the change feed publishes.
#[derive(Debug, Clone)]
pub struct TaskWrite {
    pub previous: Option<Task>,
    pub task: Task,
}

/// Task store for a single data root
#[derive(Debug, Clone)]
pub struct TaskStore {
    storage: Storage,
}

impl TaskStore {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    fn lock_path(&self, household: Uuid) -> std::path::PathBuf {
        self.storage
            .tasks_file(household)
            .with_extension("json.lock")
    }

    fn read_snapshot(&self, household: Uuid) -> Result<TaskSnapshot> {
        let path = self.storage.tasks_file(household);
        if !path.exists() {
            return Ok(TaskSnapshot::default());
        }
        self.storage.read_json(&path)
    }

    fn write_snapshot(&self, household: Uuid, snapshot: &TaskSnapshot) -> Result<()> {
        let json = serde_json::to_string_pretty(snapshot)?;
        lock::write_atomic(self.storage.tasks_file(household), json.as_bytes())
    }

    /// Create a task from a draft. The record starts at version 1.
    pub fn create(
        &self,
        household: Uuid,
        draft: TaskDraft,
        created_by: Uuid,
        default_currency: &str,
    ) -> Result<TaskWrite> {
        let task = draft.into_task(household, created_by, default_currency)?;
        task.check_invariants()?;

        let _lock = FileLock::acquire(self.lock_path(household), DEFAULT_LOCK_TIMEOUT_MS)?;

        let mut snapshot = self.read_snapshot(household)?;
        snapshot.tasks.insert(task.id, task.clone());
        self.write_snapshot(household, &snapshot)?;

        tracing::debug!(task = %task.id, household = %household, "task created");

        Ok(TaskWrite {
            previous: None,
            task,
        })
    }

    /// Fetch a single task
    pub fn get(&self, household: Uuid, id: Uuid) -> Result<Task> {
        self.read_snapshot(household)?
            .tasks
            .remove(&id)
            .ok_or(Error::TaskNotFound(id))
    }

    /// All tasks of a household
    pub fn list(&self, household: Uuid) -> Result<Vec<Task>> {
        Ok(self.read_snapshot(household)?.tasks.into_values().collect())
    }

    /// Conditionally update a task.
    ///
    /// Under the file lock: re-reads the snapshot, rejects with
    /// `VersionConflict` when the stored version differs from
    /// `expected_version`, applies the mutator, bumps the version, checks
    /// invariants, writes atomically. The mutator sees the freshly loaded
    /// record, not whatever stale copy the caller decided from.
    pub fn update<F>(
        &self,
        household: Uuid,
        id: Uuid,
        expected_version: u64,
        mutate: F,
    ) -> Result<TaskWrite>
    where
        F: FnOnce(&Task) -> Result<Task>,
    {
        let _lock = FileLock::acquire(self.lock_path(household), DEFAULT_LOCK_TIMEOUT_MS)?;

        let mut snapshot = self.read_snapshot(household)?;
        let current = snapshot.tasks.get(&id).ok_or(Error::TaskNotFound(id))?;

        if current.version != expected_version {
            return Err(Error::VersionConflict {
                task: id,
                expected: expected_version,
                actual: current.version,
            });
        }

        let previous = current.clone();
        let mut next = mutate(current)?;
        next.id = previous.id;
        next.household_id = previous.household_id;
        next.version = previous.version + 1;
        next.check_invariants()?;

        snapshot.tasks.insert(id, next.clone());
        self.write_snapshot(household, &snapshot)?;

        tracing::debug!(
            task = %id,
            version = next.version,
            status = %next.status,
            "task updated"
        );

        Ok(TaskWrite {
            previous: Some(previous),
            task: next,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskStatus;
    use tempfile::TempDir;

    fn store() -> (TempDir, TaskStore, Uuid) {
        let temp = TempDir::new().unwrap();
        let storage = Storage::new(temp.path().join(".hearth"));
        storage.init().unwrap();
        let household = Uuid::new_v4();
        storage.init_household_dir(household).unwrap();
        (temp, TaskStore::new(storage), household)
    }

    #[test]
    fn create_then_get() {
        let (_temp, store, household) = store();
        let write = store
            .create(
                household,
                TaskDraft::new("Pay rent"),
                Uuid::new_v4(),
                "USD",
            )
            .unwrap();

        assert!(write.previous.is_none());
        assert_eq!(write.task.version, 1);

        let fetched = store.get(household, write.task.id).unwrap();
        assert_eq!(fetched.title, "Pay rent");
        assert_eq!(fetched.version, 1);
    }

    #[test]
    fn get_unknown_task_is_not_found() {
        let (_temp, store, household) = store();
        let err = store.get(household, Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, Error::TaskNotFound(_)));
    }

    #[test]
    fn update_increments_version() {
        let (_temp, store, household) = store();
        let write = store
            .create(household, TaskDraft::new("Chore"), Uuid::new_v4(), "USD")
            .unwrap();

        let updated = store
            .update(household, write.task.id, 1, |task| {
                let mut next = task.clone();
                next.notes = Some("details".to_string());
                Ok(next)
            })
            .unwrap();

        assert_eq!(updated.task.version, 2);
        assert_eq!(updated.previous.as_ref().unwrap().version, 1);
        assert_eq!(updated.task.notes.as_deref(), Some("details"));
    }

    #[test]
    fn stale_version_conflicts_without_side_effects() {
        let (_temp, store, household) = store();
        let write = store
            .create(household, TaskDraft::new("Chore"), Uuid::new_v4(), "USD")
            .unwrap();
        let id = write.task.id;

        store
            .update(household, id, 1, |task| {
                let mut next = task.clone();
                next.notes = Some("first".to_string());
                Ok(next)
            })
            .unwrap();

        // Second writer still thinks the version is 1
        let err = store
            .update(household, id, 1, |task| {
                let mut next = task.clone();
                next.notes = Some("second".to_string());
                Ok(next)
            })
            .unwrap_err();

        match err {
            Error::VersionConflict {
                expected, actual, ..
            } => {
                assert_eq!(expected, 1);
                assert_eq!(actual, 2);
            }
            other => panic!("expected VersionConflict, got {other:?}"),
        }

        let task = store.get(household, id).unwrap();
        assert_eq!(task.notes.as_deref(), Some("first"));
        assert_eq!(task.version, 2);
    }

    #[test]
    fn failed_mutator_leaves_snapshot_untouched() {
        let (_temp, store, household) = store();
        let write = store
            .create(household, TaskDraft::new("Chore"), Uuid::new_v4(), "USD")
            .unwrap();
        let id = write.task.id;

        let err = store
            .update(household, id, 1, |_| {
                Err(Error::Forbidden("guard said no".to_string()))
            })
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));

        let task = store.get(household, id).unwrap();
        assert_eq!(task.version, 1);
        assert_eq!(task.status, TaskStatus::Open);
    }

    #[test]
    fn invariant_violation_rejected_at_commit() {
        let (_temp, store, household) = store();
        let write = store
            .create(household, TaskDraft::new("Chore"), Uuid::new_v4(), "USD")
            .unwrap();

        // Mutator tries to persist an open task with a claimant
        let err = store
            .update(household, write.task.id, 1, |task| {
                let mut next = task.clone();
                next.claimed_by = Some(Uuid::new_v4());
                Ok(next)
            })
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let task = store.get(household, write.task.id).unwrap();
        assert_eq!(task.version, 1);
    }

    #[test]
    fn list_returns_all_tasks() {
        let (_temp, store, household) = store();
        for title in ["a", "b", "c"] {
            store
                .create(household, TaskDraft::new(title), Uuid::new_v4(), "USD")
                .unwrap();
        }
        assert_eq!(store.list(household).unwrap().len(), 3);
    }
}
