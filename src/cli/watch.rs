//! hearth watch: stream task changes as JSONL.
//!
//! Demonstration consumer for the change feed. Other processes commit
//! through their own store instances, so this polls the snapshot and
//! emits a change event for every version advance, one JSON object per
//! line, until interrupted.

use std::collections::HashMap;
use std::time::Duration;

use uuid::Uuid;

use crate::error::Result;
use crate::feed::ChangeEvent;
use crate::store::{TaskStore, TaskWrite};
use crate::task::Task;

use super::CommandContext;

const POLL_INTERVAL_MS: u64 = 500;

pub fn run(ctx: &CommandContext) -> Result<()> {
    let household = ctx.resolve_household()?;
    ctx.require_initialized()?;
    let store = TaskStore::new(ctx.storage.clone());

    eprintln!("watching household {household}; ctrl-c to stop");

    // Baseline: current snapshot is not replayed, only changes from here on
    let mut seen: HashMap<Uuid, Task> = store
        .list(household)?
        .into_iter()
        .map(|t| (t.id, t))
        .collect();

    loop {
        for task in store.list(household)? {
            let previous = seen.get(&task.id).cloned();
            let advanced = previous
                .as_ref()
                .map_or(true, |prev| task.version > prev.version);
            if !advanced {
                continue;
            }
            seen.insert(task.id, task.clone());

            let event = ChangeEvent::from_write(&TaskWrite { previous, task });
            println!("{}", serde_json::to_string(&event)?);
        }

        std::thread::sleep(Duration::from_millis(POLL_INTERVAL_MS));
    }
}
