use anyhow::bail;
use trace_core::Verification;
use trace_core::responses::VerifyResponse;

use crate::cli::GlobalFlags;
use crate::context::AppContext;
use crate::output::output;

/// Handle `ttrace verify`.
///
/// Prints the report in every case. A broken chain then fails the command
/// so scripts see a non-zero exit; an empty ledger does not.
pub fn handle(ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let (response, outcome) = run(ctx)?;
    output(&response, flags.format)?;

    match outcome {
        Verification::Invalid(brk) => bail!("ledger integrity violated: {brk}"),
        Verification::Empty => {
            tracing::warn!(ledger = %response.ledger, "ledger is empty; no data to verify");
            Ok(())
        }
        Verification::Valid { .. } => Ok(()),
    }
}

fn run(ctx: &AppContext) -> anyhow::Result<(VerifyResponse, Verification)> {
    let ledger = ctx.load_ledger()?;
    let outcome = ledger.verify();
    let response = VerifyResponse::new(ctx.ledger_display(), &ledger.records, &outcome);
    Ok((response, outcome))
}
