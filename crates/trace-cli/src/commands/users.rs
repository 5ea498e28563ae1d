use std::collections::BTreeMap;

use trace_core::responses::UserSummary;

use crate::cli::GlobalFlags;
use crate::context::{AppContext, LoadedLedger};
use crate::output::output;

/// Handle `ttrace users`.
pub fn handle(ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let ledger = ctx.load_ledger()?;
    let users = run(&ledger, ctx.row_limit(None, flags));
    output(&users, flags.format)
}

fn run(ledger: &LoadedLedger, limit: usize) -> Vec<UserSummary> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for record in &ledger.records {
        *counts.entry(record.user_id.as_str()).or_default() += 1;
    }
    counts
        .into_iter()
        .take(limit)
        .map(|(user_id, decisions)| UserSummary {
            user_id: user_id.to_string(),
            decisions,
        })
        .collect()
}
