//! Command-line interface for hearth
//!
//! This module defines the CLI structure using clap derive macros.
//! Each subcommand is defined in its own submodule.

use std::path::PathBuf;
use std::str::FromStr;

use clap::{Parser, Subcommand};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::household::Member;
use crate::output::OutputOptions;
use crate::service::TaskService;
use crate::storage::Storage;

mod household;
mod init;
mod notifications;
mod task;
mod watch;

/// hearth - household task coordination
///
/// A shared task board for household members: claim a task so nobody
/// else duplicates the work, complete it, and let the activity log and
/// notifications keep everyone honest.
#[derive(Parser, Debug)]
#[command(name = "hearth")]
#[command(author, version, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Data root directory (defaults to .hearth in the current directory)
    #[arg(long, global = true, env = "HEARTH_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Acting member: member id or display name
    #[arg(long, global = true, env = "HEARTH_MEMBER")]
    pub member: Option<String>,

    /// Household: id or name (optional when only one household exists)
    #[arg(long, global = true, env = "HEARTH_HOUSEHOLD")]
    pub household: Option<String>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a hearth data root
    Init,

    /// Household and membership management
    #[command(subcommand)]
    Household(HouseholdCommands),

    /// Task operations
    #[command(subcommand)]
    Task(TaskCommands),

    /// Notification inbox
    #[command(subcommand)]
    Notifications(NotificationCommands),

    /// Flag overdue tasks and notify every member
    Sweep,

    /// Stream task changes as JSONL until interrupted
    Watch,
}

/// Household subcommands
#[derive(Subcommand, Debug)]
pub enum HouseholdCommands {
    /// Create a household; you become its owner
    Create {
        /// Household name
        name: String,

        /// Your display name
        #[arg(long, default_value = "owner")]
        creator: String,
    },

    /// Join a household via invite code
    Join {
        /// Invite code
        code: String,

        /// Your display name
        name: String,
    },

    /// List members of the household
    Members,

    /// Add a finance context
    Context {
        /// Context name
        name: String,

        /// Kind: personal, business, investment, other
        #[arg(long, default_value = "personal")]
        kind: String,

        /// Report separately for tax purposes
        #[arg(long)]
        tax_separate: bool,

        /// Make this the default context
        #[arg(long)]
        default: bool,
    },
}

/// Task subcommands
#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// Add a task
    Add {
        /// Task title
        title: String,

        /// Free-form notes
        #[arg(long)]
        notes: Option<String>,

        /// Kind: bill, action, reminder, goal, tax, investment, property
        #[arg(long, default_value = "action")]
        kind: String,

        /// Priority: signal, noise
        #[arg(long, default_value = "noise")]
        priority: String,

        /// Amount of money involved
        #[arg(long)]
        amount: Option<f64>,

        /// Currency code (defaults from config when an amount is set)
        #[arg(long)]
        currency: Option<String>,

        /// Due date (RFC 3339 or YYYY-MM-DD)
        #[arg(long)]
        due: Option<String>,

        /// Recurrence: none, daily, weekly, biweekly, monthly, quarterly, annually
        #[arg(long, default_value = "none")]
        recurrence: String,

        /// Tags
        #[arg(long)]
        tag: Vec<String>,

        /// Suggested owner (member id or name)
        #[arg(long)]
        assign: Option<String>,
    },

    /// List tasks
    Ls {
        /// Filter by status
        #[arg(long)]
        status: Option<String>,

        /// Only tasks claimed by this member (id or name)
        #[arg(long)]
        claimed_by: Option<String>,

        /// Filter by priority
        #[arg(long)]
        priority: Option<String>,

        /// Only open, unclaimed tasks past their due date
        #[arg(long)]
        overdue: bool,

        /// Filter by tag
        #[arg(long)]
        tag: Option<String>,
    },

    /// Show a task with its activity history
    Show {
        /// Task id
        id: String,
    },

    /// Claim a task exclusively
    Claim {
        /// Task id
        id: String,
    },

    /// Move a claimed task to in-progress
    Start {
        /// Task id
        id: String,
    },

    /// Complete a task
    Done {
        /// Task id
        id: String,

        /// Completion notes
        #[arg(long)]
        notes: Option<String>,
    },

    /// Release a claim back to open
    Unclaim {
        /// Task id
        id: String,
    },

    /// Cancel a task (creator or admin)
    Cancel {
        /// Task id
        id: String,
    },

    /// Reopen a completed task (admin only)
    Reopen {
        /// Task id
        id: String,
    },

    /// Suggest an owner without claiming
    Assign {
        /// Task id
        id: String,

        /// Member id or name; omit to clear the assignment
        #[arg(long)]
        to: Option<String>,
    },

    /// Comment on a task
    Comment {
        /// Task id
        id: String,

        /// Comment text
        text: String,
    },
}

/// Notification subcommands
#[derive(Subcommand, Debug)]
pub enum NotificationCommands {
    /// List your notifications, newest first
    Ls {
        /// Only unread notifications
        #[arg(long)]
        unread: bool,
    },

    /// Mark a notification as read
    Read {
        /// Notification id
        id: String,
    },
}

impl Cli {
    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let options = OutputOptions {
            json: self.json,
            quiet: self.quiet,
        };
        let ctx = CommandContext::new(self.data_dir, self.member, self.household, options)?;

        match self.command {
            Commands::Init => init::run(&ctx),
            Commands::Household(cmd) => match cmd {
                HouseholdCommands::Create { name, creator } => {
                    household::run_create(&ctx, name, creator)
                }
                HouseholdCommands::Join { code, name } => household::run_join(&ctx, code, name),
                HouseholdCommands::Members => household::run_members(&ctx),
                HouseholdCommands::Context {
                    name,
                    kind,
                    tax_separate,
                    default,
                } => household::run_context(&ctx, name, kind, tax_separate, default),
            },
            Commands::Task(cmd) => match cmd {
                TaskCommands::Add {
                    title,
                    notes,
                    kind,
                    priority,
                    amount,
                    currency,
                    due,
                    recurrence,
                    tag,
                    assign,
                } => task::run_add(
                    &ctx,
                    task::AddOptions {
                        title,
                        notes,
                        kind,
                        priority,
                        amount,
                        currency,
                        due,
                        recurrence,
                        tags: tag,
                        assign,
                    },
                ),
                TaskCommands::Ls {
                    status,
                    claimed_by,
                    priority,
                    overdue,
                    tag,
                } => task::run_ls(
                    &ctx,
                    task::LsOptions {
                        status,
                        claimed_by,
                        priority,
                        overdue,
                        tag,
                    },
                ),
                TaskCommands::Show { id } => task::run_show(&ctx, &id),
                TaskCommands::Claim { id } => task::run_claim(&ctx, &id),
                TaskCommands::Start { id } => task::run_start(&ctx, &id),
                TaskCommands::Done { id, notes } => task::run_done(&ctx, &id, notes),
                TaskCommands::Unclaim { id } => task::run_unclaim(&ctx, &id),
                TaskCommands::Cancel { id } => task::run_cancel(&ctx, &id),
                TaskCommands::Reopen { id } => task::run_reopen(&ctx, &id),
                TaskCommands::Assign { id, to } => task::run_assign(&ctx, &id, to),
                TaskCommands::Comment { id, text } => task::run_comment(&ctx, &id, &text),
            },
            Commands::Notifications(cmd) => match cmd {
                NotificationCommands::Ls { unread } => notifications::run_ls(&ctx, unread),
                NotificationCommands::Read { id } => notifications::run_read(&ctx, &id),
            },
            Commands::Sweep => notifications::run_sweep(&ctx),
            Commands::Watch => watch::run(&ctx),
        }
    }
}

/// Shared state resolved once per invocation
pub(crate) struct CommandContext {
    pub storage: Storage,
    pub config: Config,
    pub options: OutputOptions,
    member: Option<String>,
    household: Option<String>,
}

impl CommandContext {
    fn new(
        data_dir: Option<PathBuf>,
        member: Option<String>,
        household: Option<String>,
        options: OutputOptions,
    ) -> Result<Self> {
        let cwd = std::env::current_dir()?;
        let config = Config::load_from_dir(&cwd)?;
        let root = data_dir.unwrap_or_else(|| config.data_dir.clone());
        let root = if root.is_absolute() {
            root
        } else {
            cwd.join(root)
        };

        Ok(Self {
            storage: Storage::new(root),
            config,
            options,
            member,
            household,
        })
    }

    pub fn service(&self) -> Result<TaskService> {
        self.require_initialized()?;
        TaskService::new(self.storage.clone(), self.config.clone())
    }

    pub fn require_initialized(&self) -> Result<()> {
        if !self.storage.is_initialized() {
            return Err(Error::InvalidArgument(
                "data root not initialized; run `hearth init` first".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolve the target household from --household, or default to the
    /// sole household in the registry
    pub fn resolve_household(&self) -> Result<Uuid> {
        let registry = self.storage.read_registry()?;

        match &self.household {
            Some(raw) => {
                if let Ok(id) = Uuid::from_str(raw) {
                    return registry.household(id).map(|h| h.id);
                }
                registry.household_by_name(raw).map(|h| h.id)
            }
            None => match registry.households.as_slice() {
                [] => Err(Error::HouseholdNotFound(
                    "no households exist yet".to_string(),
                )),
                [only] => Ok(only.id),
                _ => Err(Error::InvalidArgument(
                    "multiple households exist; pass --household".to_string(),
                )),
            },
        }
    }

    /// Resolve the acting member within a household
    pub fn resolve_member(&self, household: Uuid) -> Result<Member> {
        let raw = self.member.as_deref().ok_or_else(|| {
            Error::InvalidArgument(
                "no acting member; pass --member or set HEARTH_MEMBER".to_string(),
            )
        })?;
        resolve_member_ref(&self.storage, household, raw)
    }
}

/// Resolve a member reference (id or display name) within a household
pub(crate) fn resolve_member_ref(
    storage: &Storage,
    household: Uuid,
    raw: &str,
) -> Result<Member> {
    let registry = storage.read_registry()?;
    if let Ok(id) = Uuid::from_str(raw) {
        let member = registry.member(id)?;
        return Ok(member.clone());
    }
    registry.member_by_name(household, raw).cloned()
}

/// Parse a task id argument
pub(crate) fn parse_task_id(raw: &str) -> Result<Uuid> {
    Uuid::from_str(raw.trim())
        .map_err(|_| Error::InvalidArgument(format!("invalid task id: {raw}")))
}
