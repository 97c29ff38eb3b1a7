//! Concurrency: N members race to claim the same task; exactly one wins.

mod support;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use hearth::error::Error;
use hearth::household::Member;
use hearth::task::TaskStatus;

use support::TestHome;

#[test]
fn exactly_one_claimant_wins() {
    let home = TestHome::init();
    let task = home.add_task("Pay the electric bill");

    let racers = 8;

    // Extra members beyond the seeded three
    let mut members: Vec<Member> = home.members.clone();
    for i in members.len()..racers {
        let member = home
            .storage
            .update_registry(|registry| {
                let code = registry.household(home.household)?.invite_code.clone();
                registry.join_household(&code, format!("racer-{i}"), Some(home.owner.id))
            })
            .expect("add racer");
        members.push(member);
    }

    let barrier = Arc::new(Barrier::new(racers));
    let wins = Arc::new(AtomicUsize::new(0));
    let already_claimed = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::with_capacity(racers);
    for member in members.into_iter().take(racers) {
        let barrier = Arc::clone(&barrier);
        let wins = Arc::clone(&wins);
        let already_claimed = Arc::clone(&already_claimed);
        let service = home.service();
        let household = home.household;
        let task_id = task.id;

        handles.push(thread::spawn(move || {
            barrier.wait();
            match service.claim_task(household, member.id, task_id) {
                Ok(claimed) => {
                    assert_eq!(claimed.status, TaskStatus::Claimed);
                    assert_eq!(claimed.claimed_by, Some(member.id));
                    wins.fetch_add(1, Ordering::SeqCst);
                }
                Err(err @ Error::AlreadyClaimed { .. }) => {
                    assert!(err.is_retryable());
                    already_claimed.fetch_add(1, Ordering::SeqCst);
                }
                Err(other) => panic!("unexpected claim failure: {other:?}"),
            }
        }));
    }

    for handle in handles {
        handle.join().expect("racer thread");
    }

    assert_eq!(wins.load(Ordering::SeqCst), 1);
    assert_eq!(already_claimed.load(Ordering::SeqCst), racers - 1);

    // The stored record is consistent and claimed exactly once
    let stored = home.service().get_task(home.household, task.id).expect("get");
    assert_eq!(stored.status, TaskStatus::Claimed);
    assert!(stored.claimed_by.is_some());
    assert!(stored.check_invariants().is_ok());
    assert_eq!(stored.version, 2);
}

#[test]
fn race_loser_sees_the_winner() {
    let home = TestHome::init();
    let bella = home.members[0].clone();
    let carol = home.members[1].clone();

    // Repeated two-way races on fresh tasks: the loser must learn who
    // holds the claim, never a bare version mismatch
    for round in 0..5 {
        let task = home.add_task(&format!("contested chore {round}"));

        let barrier = Arc::new(Barrier::new(2));
        let mut handles = Vec::new();
        for member in [bella.clone(), carol.clone()] {
            let barrier = Arc::clone(&barrier);
            let service = home.service();
            let household = home.household;
            let task_id = task.id;

            handles.push(thread::spawn(move || {
                barrier.wait();
                service.claim_task(household, member.id, task_id)
            }));
        }

        let outcomes: Vec<_> = handles
            .into_iter()
            .map(|h| h.join().expect("claimant thread"))
            .collect();

        let winners: Vec<_> = outcomes.iter().filter(|o| o.is_ok()).collect();
        assert_eq!(winners.len(), 1, "round {round}");

        let winner_id = winners[0]
            .as_ref()
            .expect("winner")
            .claimed_by
            .expect("claimant set");
        for outcome in &outcomes {
            if let Err(err) = outcome {
                match err {
                    Error::AlreadyClaimed { holder, .. } => {
                        assert_eq!(*holder, winner_id, "round {round}")
                    }
                    other => panic!("round {round}: expected AlreadyClaimed, got {other:?}"),
                }
            }
        }
    }
}

#[test]
fn loser_can_claim_a_different_task() {
    let home = TestHome::init();
    let first = home.add_task("Mow the lawn");
    let second = home.add_task("Clean the gutters");

    let service = home.service();
    let bella = &home.members[0];
    let carol = &home.members[1];

    service
        .claim_task(home.household, bella.id, first.id)
        .expect("bella claims first");

    let err = service
        .claim_task(home.household, carol.id, first.id)
        .expect_err("carol loses");
    assert!(matches!(err, Error::AlreadyClaimed { .. }));

    // The losing member moves on
    let claimed = service
        .claim_task(home.household, carol.id, second.id)
        .expect("carol claims second");
    assert_eq!(claimed.claimed_by, Some(carol.id));
}

#[test]
fn concurrent_updates_serialize_by_version() {
    let home = TestHome::init();
    let service = home.service();

    // Many threads create tasks concurrently; all land in the snapshot
    let creators = 6;
    let per_thread = 4;
    let barrier = Arc::new(Barrier::new(creators));
    let mut handles = Vec::new();

    for i in 0..creators {
        let barrier = Arc::clone(&barrier);
        let service = home.service();
        let household = home.household;
        let owner = home.owner.id;

        handles.push(thread::spawn(move || {
            barrier.wait();
            for j in 0..per_thread {
                service
                    .create_task(
                        household,
                        owner,
                        hearth::task::TaskDraft::new(format!("task-{i}-{j}")),
                    )
                    .expect("create under contention");
            }
        }));
    }

    for handle in handles {
        handle.join().expect("creator thread");
    }

    let tasks = service
        .list_tasks(home.household, &hearth::query::TaskFilter::default())
        .expect("list");
    assert_eq!(tasks.len(), creators * per_thread);
    for task in &tasks {
        assert_eq!(task.version, 1);
        assert!(task.check_invariants().is_ok());
    }
}
