//! hearth task commands.
//!
//! Every mutation resolves the acting member, runs through the service
//! façade, and prints the committed record.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use crate::error::{Error, Result};
use crate::output::{emit_success, HumanOutput};
use crate::query::TaskFilter;
use crate::task::{Priority, Recurrence, Task, TaskDraft, TaskKind, TaskStatus};

use super::{parse_task_id, resolve_member_ref, CommandContext};

pub struct AddOptions {
    pub title: String,
    pub notes: Option<String>,
    pub kind: String,
    pub priority: String,
    pub amount: Option<f64>,
    pub currency: Option<String>,
    pub due: Option<String>,
    pub recurrence: String,
    pub tags: Vec<String>,
    pub assign: Option<String>,
}

pub struct LsOptions {
    pub status: Option<String>,
    pub claimed_by: Option<String>,
    pub priority: Option<String>,
    pub overdue: bool,
    pub tag: Option<String>,
}

/// Accepts RFC 3339 timestamps or bare dates (interpreted as midnight UTC)
fn parse_date(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Ok(timestamp.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        let midnight = date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| Error::InvalidArgument(format!("invalid date: {raw}")))?;
        return Ok(Utc.from_utc_datetime(&midnight));
    }
    Err(Error::InvalidArgument(format!(
        "invalid date '{raw}'; expected RFC 3339 or YYYY-MM-DD"
    )))
}

fn task_summary(human: &mut HumanOutput, task: &Task) {
    human.push_summary("id", task.id.to_string());
    human.push_summary("status", task.status.to_string());
    human.push_summary("version", task.version.to_string());
    if let Some(claimant) = task.claimed_by {
        human.push_summary("claimed by", claimant.to_string());
    }
    if let Some(due) = task.due_date {
        human.push_summary("due", due.to_rfc3339());
    }
}

pub fn run_add(ctx: &CommandContext, options: AddOptions) -> Result<()> {
    let household = ctx.resolve_household()?;
    let actor = ctx.resolve_member(household)?;
    let service = ctx.service()?;

    let assigned_to = match options.assign.as_deref() {
        Some(raw) => Some(resolve_member_ref(&ctx.storage, household, raw)?.id),
        None => None,
    };
    let due_date = options.due.as_deref().map(parse_date).transpose()?;

    let draft = TaskDraft {
        title: options.title,
        notes: options.notes,
        context_id: None,
        assigned_to,
        kind: TaskKind::from_str(&options.kind)?,
        priority: Priority::from_str(&options.priority)?,
        amount: options.amount,
        currency: options.currency,
        due_date,
        reminder_date: None,
        recurrence: Recurrence::from_str(&options.recurrence)?,
        tags: options.tags,
    };

    let task = service.create_task(household, actor.id, draft)?;

    let mut human = HumanOutput::new(format!("Added '{}'", task.title));
    task_summary(&mut human, &task);
    human.push_next_step(format!("hearth task claim {}", task.id));

    emit_success(ctx.options, "task add", &task, Some(&human))
}

pub fn run_ls(ctx: &CommandContext, options: LsOptions) -> Result<()> {
    let household = ctx.resolve_household()?;
    let service = ctx.service()?;

    let claimed_by = match options.claimed_by.as_deref() {
        Some(raw) => Some(resolve_member_ref(&ctx.storage, household, raw)?.id),
        None => None,
    };

    let filter = TaskFilter {
        status: options.status.as_deref().map(TaskStatus::from_str).transpose()?,
        claimed_by,
        priority: options.priority.as_deref().map(Priority::from_str).transpose()?,
        overdue_at: options.overdue.then(Utc::now),
        context_id: None,
        tag: options.tag,
    };

    let tasks = service.list_tasks(household, &filter)?;

    let mut human = HumanOutput::new(format!("{} task(s)", tasks.len()));
    for task in &tasks {
        let due = task
            .due_date
            .map(|d| format!(" due {}", d.format("%Y-%m-%d")))
            .unwrap_or_default();
        human.push_detail(format!(
            "[{}] {} ({}){}",
            task.status, task.title, task.id, due
        ));
    }

    emit_success(ctx.options, "task ls", &tasks, Some(&human))
}

pub fn run_show(ctx: &CommandContext, id: &str) -> Result<()> {
    let household = ctx.resolve_household()?;
    let service = ctx.service()?;
    let id = parse_task_id(id)?;

    let task = service.get_task(household, id)?;
    let activity = service.task_activity(household, id)?;

    #[derive(serde::Serialize)]
    struct Report {
        task: Task,
        activity: Vec<crate::activity::ActivityEvent>,
    }

    let mut human = HumanOutput::new(task.title.clone());
    task_summary(&mut human, &task);
    for event in &activity {
        human.push_detail(format!(
            "{} {} by {}",
            event.timestamp.format("%Y-%m-%d %H:%M"),
            event.action,
            event.actor
        ));
    }

    emit_success(
        ctx.options,
        "task show",
        &Report { task, activity },
        Some(&human),
    )
}

fn run_mutation<F>(ctx: &CommandContext, command: &str, id: &str, f: F) -> Result<()>
where
    F: FnOnce(&crate::service::TaskService, uuid::Uuid, uuid::Uuid, uuid::Uuid) -> Result<Task>,
{
    let household = ctx.resolve_household()?;
    let actor = ctx.resolve_member(household)?;
    let service = ctx.service()?;
    let id = parse_task_id(id)?;

    let task = f(&service, household, actor.id, id)?;

    let mut human = HumanOutput::new(format!("{} '{}'", command, task.title));
    task_summary(&mut human, &task);

    emit_success(ctx.options, command, &task, Some(&human))
}

pub fn run_claim(ctx: &CommandContext, id: &str) -> Result<()> {
    run_mutation(ctx, "task claim", id, |service, household, actor, id| {
        service.claim_task(household, actor, id)
    })
}

pub fn run_start(ctx: &CommandContext, id: &str) -> Result<()> {
    run_mutation(ctx, "task start", id, |service, household, actor, id| {
        service.start_task(household, actor, id)
    })
}

pub fn run_done(ctx: &CommandContext, id: &str, notes: Option<String>) -> Result<()> {
    run_mutation(ctx, "task done", id, |service, household, actor, id| {
        service.complete_task(household, actor, id, notes)
    })
}

pub fn run_unclaim(ctx: &CommandContext, id: &str) -> Result<()> {
    run_mutation(ctx, "task unclaim", id, |service, household, actor, id| {
        service.unclaim_task(household, actor, id)
    })
}

pub fn run_cancel(ctx: &CommandContext, id: &str) -> Result<()> {
    run_mutation(ctx, "task cancel", id, |service, household, actor, id| {
        service.cancel_task(household, actor, id)
    })
}

pub fn run_reopen(ctx: &CommandContext, id: &str) -> Result<()> {
    run_mutation(ctx, "task reopen", id, |service, household, actor, id| {
        service.reopen_task(household, actor, id)
    })
}

pub fn run_assign(ctx: &CommandContext, id: &str, to: Option<String>) -> Result<()> {
    let household = ctx.resolve_household()?;
    let assignee = match to.as_deref() {
        Some(raw) => Some(resolve_member_ref(&ctx.storage, household, raw)?.id),
        None => None,
    };
    run_mutation(ctx, "task assign", id, |service, household, actor, id| {
        service.assign_task(household, actor, id, assignee)
    })
}

pub fn run_comment(ctx: &CommandContext, id: &str, text: &str) -> Result<()> {
    let household = ctx.resolve_household()?;
    let actor = ctx.resolve_member(household)?;
    let service = ctx.service()?;
    let id = parse_task_id(id)?;

    let event = service.comment_task(household, actor.id, id, text)?;

    let mut human = HumanOutput::new("Comment recorded");
    human.push_summary("task", id.to_string());
    human.push_summary("event", event.id.to_string());

    emit_success(ctx.options, "task comment", &event, Some(&human))
}
