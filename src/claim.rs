//! Claim coordination.
//!
//! The claim is an exclusive "I'm doing this" marker. This module is the
//! only code that sets or clears `claimed_by`. A claim attempt re-reads the
//! task, then issues one conditional write whose mutator re-checks that the
//! task is still open and unclaimed; racing claimants serialize on the
//! store lock and exactly one wins. Losers get `AlreadyClaimed` and are
//! expected to pick another task. No queueing, no blocking wait.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::household::Member;
use crate::lifecycle::{self, TaskTransition};
use crate::store::{TaskStore, TaskWrite};
use crate::task::{Task, TaskStatus};

/// Coordinates exclusive task claims through the store's conditional writes
#[derive(Debug, Clone)]
pub struct ClaimCoordinator {
    store: TaskStore,
    /// Optional claim time-to-live; expired claims may be taken over
    ttl: Option<Duration>,
}

/// Whether a claim has outlived the configured TTL
fn claim_expired(task: &Task, ttl: Option<Duration>, now: DateTime<Utc>) -> bool {
    match (ttl, task.claimed_at) {
        (Some(ttl), Some(claimed_at)) => now - claimed_at > ttl,
        _ => false,
    }
}

impl ClaimCoordinator {
    pub fn new(store: TaskStore, ttl: Option<Duration>) -> Self {
        Self { store, ttl }
    }

    /// Attempt to claim a task for a member.
    ///
    /// Exactly one of N concurrent claimants succeeds; the losers see
    /// `AlreadyClaimed` with the winner's id. When a TTL is configured
    /// and the existing claim has expired, the claim is treated as stale
    /// and taken over through the same conditional path.
    pub fn claim(&self, household: Uuid, id: Uuid, actor: &Member) -> Result<TaskWrite> {
        match self.try_claim(household, id, actor) {
            Err(Error::VersionConflict { .. }) => {
                // A racing writer committed between our read and the lock.
                // Re-read: if the race was a claim, report its winner; any
                // other interleaving gets one retry against fresh state.
                let current = self.store.get(household, id)?;
                if let Some(holder) = current.claimed_by {
                    if !claim_expired(&current, self.ttl, Utc::now()) {
                        return Err(Error::AlreadyClaimed { task: id, holder });
                    }
                }
                self.try_claim(household, id, actor)
            }
            result => result,
        }
    }

    /// One conditional write against the current version
    fn try_claim(&self, household: Uuid, id: Uuid, actor: &Member) -> Result<TaskWrite> {
        let now = Utc::now();
        let current = self.store.get(household, id)?;
        let ttl = self.ttl;

        let actor = actor.clone();
        self.store.update(household, id, current.version, move |task| {
            // Re-check under the lock; the caller's read may be stale
            if claim_expired(task, ttl, now) {
                tracing::info!(
                    task = %task.id,
                    previous_holder = ?task.claimed_by,
                    "taking over expired claim"
                );
                let mut released = task.clone();
                released.status = TaskStatus::Open;
                released.claimed_by = None;
                released.claimed_at = None;
                return lifecycle::apply(&released, &TaskTransition::Claim, &actor, now);
            }
            lifecycle::apply(task, &TaskTransition::Claim, &actor, now)
        })
    }

    /// Release a claim.
    ///
    /// The holder may always release their own claim; admins and owners may
    /// force-release anyone's.
    pub fn release(&self, household: Uuid, id: Uuid, actor: &Member) -> Result<TaskWrite> {
        let now = Utc::now();
        let current = self.store.get(household, id)?;

        let actor = actor.clone();
        self.store.update(household, id, current.version, move |task| {
            lifecycle::apply(task, &TaskTransition::Unclaim, &actor, now)
        })
    }
}
