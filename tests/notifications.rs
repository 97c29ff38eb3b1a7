//! Notification synthesis through the service: fan-out, self-suppression,
//! dedup, cap, and the overdue sweep.

mod support;

use chrono::{Duration, Utc};
use hearth::config::Config;
use hearth::notify::NotificationKind;
use hearth::task::TaskDraft;

use support::TestHome;

#[test]
fn claim_and_completion_notify_other_members() {
    let home = TestHome::init();
    let service = home.service();
    let bella = &home.members[0];
    let carol = &home.members[1];

    let task = home.add_task("Pick up prescription");

    service
        .claim_task(home.household, bella.id, task.id)
        .expect("claim");

    // Actor hears nothing, the others hear about the claim
    assert!(service
        .notifications(home.household, bella.id)
        .expect("bella inbox")
        .is_empty());

    let owner_inbox = service
        .notifications(home.household, home.owner.id)
        .expect("owner inbox");
    assert_eq!(owner_inbox.len(), 1);
    assert_eq!(owner_inbox[0].kind, NotificationKind::TaskClaimed);

    service
        .complete_task(home.household, bella.id, task.id, None)
        .expect("complete");

    let carol_inbox = service
        .notifications(home.household, carol.id)
        .expect("carol inbox");
    assert_eq!(carol_inbox.len(), 2);
    // Newest first
    assert_eq!(carol_inbox[0].kind, NotificationKind::TaskCompleted);
    assert_eq!(carol_inbox[1].kind, NotificationKind::TaskClaimed);
}

#[test]
fn reopen_notifies_and_assignment_targets_the_assignee() {
    let home = TestHome::init();
    let service = home.service();
    let bella = &home.members[0];
    let carol = &home.members[1];

    let task = home.add_task("Defrost the freezer");
    service
        .claim_task(home.household, bella.id, task.id)
        .expect("claim");
    service
        .complete_task(home.household, bella.id, task.id, None)
        .expect("complete");
    service
        .reopen_task(home.household, home.owner.id, task.id)
        .expect("reopen");

    let bella_inbox = service
        .notifications(home.household, bella.id)
        .expect("bella inbox");
    assert!(bella_inbox
        .iter()
        .any(|n| n.kind == NotificationKind::TaskReopened));

    // Assignment notifies only carol
    service
        .assign_task(home.household, home.owner.id, task.id, Some(carol.id))
        .expect("assign");

    let carol_assigned: Vec<_> = service
        .notifications(home.household, carol.id)
        .expect("carol inbox")
        .into_iter()
        .filter(|n| n.kind == NotificationKind::TaskAssigned)
        .collect();
    assert_eq!(carol_assigned.len(), 1);

    let bella_assigned = service
        .notifications(home.household, bella.id)
        .expect("bella inbox")
        .into_iter()
        .filter(|n| n.kind == NotificationKind::TaskAssigned)
        .count();
    assert_eq!(bella_assigned, 0);
}

#[test]
fn duplicate_claims_of_same_task_notify_once_per_window() {
    let home = TestHome::init();
    let service = home.service();
    let bella = &home.members[0];

    let task = home.add_task("Sweep the porch");

    service
        .claim_task(home.household, bella.id, task.id)
        .expect("claim");
    service
        .unclaim_task(home.household, bella.id, task.id)
        .expect("unclaim");
    service
        .claim_task(home.household, bella.id, task.id)
        .expect("reclaim");

    // Two claims of the same task inside the window collapse to one
    let claimed: Vec<_> = service
        .notifications(home.household, home.owner.id)
        .expect("owner inbox")
        .into_iter()
        .filter(|n| n.kind == NotificationKind::TaskClaimed)
        .collect();
    assert_eq!(claimed.len(), 1);
}

#[test]
fn cap_keeps_newest_notifications() {
    let mut config = Config::default();
    config.notifications.cap = 3;
    let home = TestHome::init_with_config(config);
    let service = home.service();
    let bella = &home.members[0];

    for i in 0..5 {
        let task = service
            .create_task(
                home.household,
                home.owner.id,
                TaskDraft::new(format!("chore {i}")),
            )
            .expect("create");
        service
            .claim_task(home.household, bella.id, task.id)
            .expect("claim");
    }

    let inbox = service
        .notifications(home.household, home.owner.id)
        .expect("owner inbox");
    assert_eq!(inbox.len(), 3);
    // Oldest dropped: the survivors are the three most recent claims
    assert!(inbox.iter().all(|n| n.kind == NotificationKind::TaskClaimed));
    assert!(inbox[0].id > inbox[1].id && inbox[1].id > inbox[2].id);
}

#[test]
fn overdue_sweep_flags_open_unclaimed_tasks() {
    let home = TestHome::init();
    let service = home.service();
    let bella = &home.members[0];

    let mut draft = TaskDraft::new("Pay water bill");
    draft.due_date = Some(Utc::now() - Duration::days(2));
    let overdue = service
        .create_task(home.household, home.owner.id, draft)
        .expect("create overdue");

    let mut draft = TaskDraft::new("Claimed and late");
    draft.due_date = Some(Utc::now() - Duration::days(2));
    let claimed = service
        .create_task(home.household, home.owner.id, draft)
        .expect("create claimed");
    service
        .claim_task(home.household, bella.id, claimed.id)
        .expect("claim");

    let delivered = service.sweep_overdue(home.household).expect("sweep");

    // Everyone gets flagged, for the unclaimed task only
    assert_eq!(delivered.len(), 3);
    assert!(delivered
        .iter()
        .all(|n| n.kind == NotificationKind::TaskOverdue));
    assert!(delivered.iter().all(|n| n.task_id == Some(overdue.id)));

    // A second sweep inside the window is silent
    let repeat = service.sweep_overdue(home.household).expect("sweep again");
    assert!(repeat.is_empty());
}

#[test]
fn mark_read_persists() {
    let home = TestHome::init();
    let service = home.service();
    let bella = &home.members[0];

    let task = home.add_task("Rake the leaves");
    service
        .claim_task(home.household, bella.id, task.id)
        .expect("claim");

    let inbox = service
        .notifications(home.household, home.owner.id)
        .expect("inbox");
    assert!(!inbox[0].read);

    service
        .mark_read(home.household, home.owner.id, inbox[0].id)
        .expect("mark read");

    let inbox = service
        .notifications(home.household, home.owner.id)
        .expect("inbox after");
    assert!(inbox[0].read);
}
