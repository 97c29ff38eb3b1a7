//! hearth household commands: create, join, members, context.

use std::str::FromStr;

use crate::error::Result;
use crate::household::{ContextKind, FinanceContext};
use crate::output::{emit_success, HumanOutput};

use super::CommandContext;

pub fn run_create(ctx: &CommandContext, name: String, creator: String) -> Result<()> {
    ctx.require_initialized()?;

    let (household, owner) = ctx
        .storage
        .update_registry(|registry| registry.create_household(&name, &creator))?;
    ctx.storage.init_household_dir(household.id)?;

    #[derive(serde::Serialize)]
    struct Report {
        household: crate::household::Household,
        owner: crate::household::Member,
    }

    let mut human = HumanOutput::new(format!("Created household '{}'", household.name));
    human.push_summary("id", household.id.to_string());
    human.push_summary("invite code", household.invite_code.clone());
    human.push_summary("owner", format!("{} ({})", owner.name, owner.id));
    human.push_next_step(format!("export HEARTH_MEMBER={}", owner.id));
    human.push_next_step("hearth task add \"<title>\"");

    emit_success(
        ctx.options,
        "household create",
        &Report { household, owner },
        Some(&human),
    )
}

pub fn run_join(ctx: &CommandContext, code: String, name: String) -> Result<()> {
    ctx.require_initialized()?;

    // Inviter is the acting member when one is set; households with open
    // invites accept joins without one.
    let inviter = {
        let registry = ctx.storage.read_registry()?;
        match registry.household_by_invite(&code) {
            Ok(household) => {
                let id = household.id;
                ctx.resolve_member(id).ok().map(|m| m.id)
            }
            Err(_) => None,
        }
    };

    let member = ctx
        .storage
        .update_registry(|registry| registry.join_household(&code, &name, inviter))?;

    let mut human = HumanOutput::new(format!("Joined as '{}'", member.name));
    human.push_summary("member id", member.id.to_string());
    human.push_summary("role", member.role.to_string());
    human.push_next_step(format!("export HEARTH_MEMBER={}", member.id));

    emit_success(ctx.options, "household join", &member, Some(&human))
}

pub fn run_members(ctx: &CommandContext) -> Result<()> {
    ctx.require_initialized()?;
    let household = ctx.resolve_household()?;

    let registry = ctx.storage.read_registry()?;
    let members: Vec<_> = registry.members_of(household).into_iter().cloned().collect();

    let mut human = HumanOutput::new(format!("{} member(s)", members.len()));
    for member in &members {
        human.push_detail(format!("{} [{}] {}", member.name, member.role, member.id));
    }

    emit_success(ctx.options, "household members", &members, Some(&human))
}

pub fn run_context(
    ctx: &CommandContext,
    name: String,
    kind: String,
    tax_separate: bool,
    default: bool,
) -> Result<()> {
    ctx.require_initialized()?;
    let household = ctx.resolve_household()?;
    let kind = ContextKind::from_str(&kind)?;

    let context = ctx.storage.update_registry(|registry| {
        let mut context = FinanceContext::new(household, &name, kind);
        context.tax_separate = tax_separate;
        context.is_default = default;
        registry.add_context(context)
    })?;

    let mut human = HumanOutput::new(format!("Added context '{}'", context.name));
    human.push_summary("kind", context.kind.to_string());
    human.push_summary("default", context.is_default.to_string());

    emit_success(ctx.options, "household context", &context, Some(&human))
}
