use trace_core::responses::DecisionSummary;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::ListArgs;
use crate::context::{AppContext, LoadedLedger};
use crate::output::output;

/// Handle `ttrace list`.
pub fn handle(args: &ListArgs, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let ledger = ctx.load_ledger()?;
    let decisions = run(&ledger, args, ctx.row_limit(args.limit, flags));
    output(&decisions, flags.format)
}

fn run(ledger: &LoadedLedger, args: &ListArgs, limit: usize) -> Vec<DecisionSummary> {
    ledger
        .records
        .iter()
        .enumerate()
        .filter(|(_, record)| args.user.as_deref().is_none_or(|user| record.user_id == user))
        .filter(|(_, record)| {
            args.category
                .as_deref()
                .is_none_or(|category| record.product_category == category)
        })
        .take(limit)
        .map(|(position, record)| DecisionSummary::from_record(position, record))
        .collect()
}
