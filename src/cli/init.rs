//! hearth init command implementation
//!
//! Creates the data root and an empty household registry.

use std::path::PathBuf;

use crate::error::Result;
use crate::output::{emit_success, HumanOutput};

use super::CommandContext;

#[derive(serde::Serialize)]
struct InitReport {
    data_dir: PathBuf,
    created: bool,
}

pub fn run(ctx: &CommandContext) -> Result<()> {
    let already = ctx.storage.is_initialized();
    ctx.storage.init()?;

    let report = InitReport {
        data_dir: ctx.storage.root().to_path_buf(),
        created: !already,
    };

    let mut human = HumanOutput::new(if already {
        "hearth already initialized"
    } else {
        "hearth initialized"
    });
    human.push_summary("data dir", ctx.storage.root().display().to_string());
    if !already {
        human.push_next_step("hearth household create <name> --creator <your name>");
    }

    emit_success(ctx.options, "init", &report, Some(&human))
}
