//! Change feed.
//!
//! Committed task writes fan out to in-process subscribers, scoped per
//! household. Delivery is at-least-once: subscribers deduplicate on the
//! event id and drop stale updates by comparing task versions, which
//! `Projection` demonstrates. Publishing happens in store commit order, so
//! per-task event order matches version order.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use ulid::Ulid;
use uuid::Uuid;

use crate::store::TaskWrite;
use crate::task::Task;

/// What kind of change an event describes.
///
/// `Delete` is carried for subscriber completeness; the core never
/// hard-deletes a task, so no operation currently emits it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// A single change published to subscribers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Lexically time-ordered event id; subscribers dedup on this
    pub event_id: Ulid,
    pub kind: ChangeKind,
    pub household_id: Uuid,
    /// The record as committed
    pub task: Task,
    /// The record before the write, absent for inserts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<Task>,
}

impl ChangeEvent {
    /// Build the event for a committed write
    pub fn from_write(write: &TaskWrite) -> Self {
        let kind = if write.previous.is_none() {
            ChangeKind::Insert
        } else {
            ChangeKind::Update
        };
        Self {
            event_id: Ulid::new(),
            kind,
            household_id: write.task.household_id,
            task: write.task.clone(),
            previous: write.previous.clone(),
        }
    }
}

struct Subscriber {
    id: u64,
    household: Uuid,
    sender: Sender<ChangeEvent>,
}

#[derive(Default)]
struct FeedInner {
    subscribers: Mutex<Vec<Subscriber>>,
    next_id: AtomicU64,
}

/// In-process pub/sub hub for task changes
#[derive(Clone, Default)]
pub struct ChangeFeed {
    inner: Arc<FeedInner>,
}

impl ChangeFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to all changes of one household
    pub fn subscribe(&self, household: Uuid) -> Subscription {
        let (sender, receiver) = mpsc::channel();
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);

        self.inner
            .subscribers
            .lock()
            .expect("feed lock poisoned")
            .push(Subscriber {
                id,
                household,
                sender,
            });

        Subscription {
            id,
            receiver,
            feed: Arc::clone(&self.inner),
            closed: AtomicBool::new(false),
        }
    }

    /// Publish a change to every live subscriber of its household.
    ///
    /// Subscribers whose channel has gone away are dropped in passing.
    pub fn publish(&self, event: ChangeEvent) {
        let mut subscribers = self.inner.subscribers.lock().expect("feed lock poisoned");
        subscribers.retain(|sub| {
            if sub.household != event.household_id {
                return true;
            }
            sub.sender.send(event.clone()).is_ok()
        });
    }

    /// Number of live subscribers, for tests and diagnostics
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.lock().expect("feed lock poisoned").len()
    }
}

/// A live subscription; dropping or closing it unsubscribes immediately
pub struct Subscription {
    id: u64,
    receiver: Receiver<ChangeEvent>,
    feed: Arc<FeedInner>,
    closed: AtomicBool,
}

impl Subscription {
    /// Block until the next event arrives or the feed is gone
    pub fn recv(&self) -> Option<ChangeEvent> {
        self.receiver.recv().ok()
    }

    /// Next event without blocking, if one is queued
    pub fn try_recv(&self) -> Option<ChangeEvent> {
        self.receiver.try_recv().ok()
    }

    /// Drain all queued events
    pub fn drain(&self) -> Vec<ChangeEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.try_recv() {
            events.push(event);
        }
        events
    }

    /// Unsubscribe. Already-queued events stay readable; nothing new
    /// arrives. Has no effect on store state.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.feed
            .subscribers
            .lock()
            .expect("feed lock poisoned")
            .retain(|sub| sub.id != self.id);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.close();
    }
}

// =============================================================================
// Projection
// =============================================================================

/// A materialized view of tasks, kept current by applying change events.
///
/// Application is idempotent: replaying an event, or delivering it twice,
/// leaves the view unchanged. Stale events (lower version than what the
/// view already holds) are ignored.
#[derive(Debug, Default)]
pub struct Projection {
    tasks: HashMap<Uuid, Task>,
}

impl Projection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one event; returns true when the view changed
    pub fn apply(&mut self, event: &ChangeEvent) -> bool {
        match event.kind {
            ChangeKind::Insert | ChangeKind::Update => {
                match self.tasks.get(&event.task.id) {
                    Some(existing) if existing.version >= event.task.version => false,
                    _ => {
                        self.tasks.insert(event.task.id, event.task.clone());
                        true
                    }
                }
            }
            ChangeKind::Delete => self.tasks.remove(&event.task.id).is_some(),
        }
    }

    pub fn get(&self, id: Uuid) -> Option<&Task> {
        self.tasks.get(&id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskDraft;

    fn seed_write(household: Uuid) -> TaskWrite {
        let task = TaskDraft::new("Chore")
            .into_task(household, Uuid::new_v4(), "USD")
            .unwrap();
        TaskWrite {
            previous: None,
            task,
        }
    }

    #[test]
    fn events_scoped_to_household() {
        let feed = ChangeFeed::new();
        let home_a = Uuid::new_v4();
        let home_b = Uuid::new_v4();

        let sub_a = feed.subscribe(home_a);
        let sub_b = feed.subscribe(home_b);

        feed.publish(ChangeEvent::from_write(&seed_write(home_a)));

        assert_eq!(sub_a.drain().len(), 1);
        assert!(sub_b.drain().is_empty());
    }

    #[test]
    fn insert_vs_update_kind() {
        let household = Uuid::new_v4();
        let write = seed_write(household);
        assert_eq!(ChangeEvent::from_write(&write).kind, ChangeKind::Insert);

        let mut updated = write.task.clone();
        updated.version = 2;
        let update = TaskWrite {
            previous: Some(write.task),
            task: updated,
        };
        assert_eq!(ChangeEvent::from_write(&update).kind, ChangeKind::Update);
    }

    #[test]
    fn close_stops_delivery() {
        let feed = ChangeFeed::new();
        let household = Uuid::new_v4();
        let sub = feed.subscribe(household);

        feed.publish(ChangeEvent::from_write(&seed_write(household)));
        sub.close();
        feed.publish(ChangeEvent::from_write(&seed_write(household)));

        // The pre-close event is still readable, nothing after
        assert_eq!(sub.drain().len(), 1);
        assert_eq!(feed.subscriber_count(), 0);
    }

    #[test]
    fn drop_unsubscribes() {
        let feed = ChangeFeed::new();
        let household = Uuid::new_v4();
        {
            let _sub = feed.subscribe(household);
            assert_eq!(feed.subscriber_count(), 1);
        }
        assert_eq!(feed.subscriber_count(), 0);
    }

    #[test]
    fn projection_is_idempotent() {
        let household = Uuid::new_v4();
        let event = ChangeEvent::from_write(&seed_write(household));

        let mut projection = Projection::new();
        assert!(projection.apply(&event));
        // Duplicate delivery changes nothing
        assert!(!projection.apply(&event));
        assert_eq!(projection.len(), 1);
    }

    #[test]
    fn projection_ignores_stale_versions() {
        let household = Uuid::new_v4();
        let write = seed_write(household);

        let mut v2 = write.task.clone();
        v2.version = 2;
        v2.notes = Some("newer".to_string());
        let update = ChangeEvent::from_write(&TaskWrite {
            previous: Some(write.task.clone()),
            task: v2,
        });
        let insert = ChangeEvent::from_write(&write);

        let mut projection = Projection::new();
        assert!(projection.apply(&update));
        // The earlier insert arrives late; the view keeps the newer record
        assert!(!projection.apply(&insert));
        assert_eq!(
            projection.get(write.task.id).unwrap().notes.as_deref(),
            Some("newer")
        );
    }
}
