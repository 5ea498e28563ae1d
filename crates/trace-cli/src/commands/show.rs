use crate::cli::GlobalFlags;
use crate::cli::root_commands::ShowArgs;
use crate::context::AppContext;
use crate::output::output;

/// Handle `ttrace show`.
pub fn handle(args: &ShowArgs, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let ledger = ctx.load_ledger()?;
    let (_, record) = ledger.require(&args.decision_id)?;
    output(record, flags.format)
}
