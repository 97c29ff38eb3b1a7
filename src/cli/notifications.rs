//! hearth notifications commands, plus the overdue sweep.

use std::str::FromStr;

use ulid::Ulid;

use crate::error::{Error, Result};
use crate::output::{emit_success, HumanOutput};

use super::CommandContext;

pub fn run_ls(ctx: &CommandContext, unread_only: bool) -> Result<()> {
    let household = ctx.resolve_household()?;
    let member = ctx.resolve_member(household)?;
    let service = ctx.service()?;

    let mut inbox = service.notifications(household, member.id)?;
    if unread_only {
        inbox.retain(|n| !n.read);
    }

    let mut human = HumanOutput::new(format!("{} notification(s)", inbox.len()));
    for notification in &inbox {
        let marker = if notification.read { " " } else { "*" };
        human.push_detail(format!(
            "{} [{}] {} ({})",
            marker, notification.kind, notification.message, notification.id
        ));
    }

    emit_success(ctx.options, "notifications ls", &inbox, Some(&human))
}

pub fn run_read(ctx: &CommandContext, id: &str) -> Result<()> {
    let household = ctx.resolve_household()?;
    let member = ctx.resolve_member(household)?;
    let service = ctx.service()?;

    let id = Ulid::from_str(id.trim())
        .map_err(|_| Error::InvalidArgument(format!("invalid notification id: {id}")))?;
    let notification = service.mark_read(household, member.id, id)?;

    let mut human = HumanOutput::new("Marked as read");
    human.push_summary("id", notification.id.to_string());
    human.push_summary("kind", notification.kind.to_string());

    emit_success(ctx.options, "notifications read", &notification, Some(&human))
}

pub fn run_sweep(ctx: &CommandContext) -> Result<()> {
    let household = ctx.resolve_household()?;
    let service = ctx.service()?;

    let delivered = service.sweep_overdue(household)?;

    let mut human = HumanOutput::new(format!(
        "Flagged {} overdue notification(s)",
        delivered.len()
    ));
    for notification in &delivered {
        human.push_detail(format!(
            "{} -> {}",
            notification.message, notification.recipient
        ));
    }

    emit_success(ctx.options, "sweep", &delivered, Some(&human))
}
