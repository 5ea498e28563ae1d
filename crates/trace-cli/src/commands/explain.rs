use trace_core::responses::{ChainStatus, ExplainResponse};

use crate::cli::GlobalFlags;
use crate::cli::root_commands::ExplainArgs;
use crate::context::{AppContext, LoadedLedger};
use crate::output::output;

/// Handle `ttrace explain`.
pub fn handle(args: &ExplainArgs, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let ledger = ctx.load_ledger()?;
    let response = run(&ledger, &args.decision_id)?;
    output(&response, flags.format)
}

fn run(ledger: &LoadedLedger, decision_id: &str) -> anyhow::Result<ExplainResponse> {
    let outcome = ledger.verify();
    let status = ChainStatus::from(&outcome);
    if let Some(brk) = outcome.failed_at() {
        tracing::warn!(%brk, "explaining a decision from a ledger that fails verification");
    }

    let (position, record) = ledger.require(decision_id)?;
    Ok(ExplainResponse::new(position, record, status))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use trace_core::explain::{Direction, Influence};

    use super::*;
    use crate::commands::test_support::write_ledger;

    #[test]
    fn explains_with_ranked_contributions() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = write_ledger(dir.path(), 3).load_ledger().unwrap();
        let response = run(&ledger, "dec-002").unwrap();

        assert_eq!(response.chain_status, ChainStatus::Valid);
        assert_eq!(response.decision.position, 2);
        assert_eq!(response.influential_event_ids, vec!["E2".to_string()]);

        let features: Vec<&str> = response
            .contributions
            .iter()
            .map(|c| c.feature.as_str())
            .collect();
        assert_eq!(features, vec!["fitness_events", "searches"]);
        assert_eq!(response.contributions[0].influence, Influence::Strong);
        assert_eq!(response.contributions[1].direction, Direction::Decreases);
        assert!(response.summary.contains("fitness"));
    }

    #[test]
    fn tampered_ledger_still_explains_but_flags_status() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = write_ledger(dir.path(), 3).load_ledger().unwrap();
        ledger.records[0].predicted_probability = 0.99;

        let response = run(&ledger, "dec-002").unwrap();
        assert_eq!(response.chain_status, ChainStatus::Invalid);
    }

    #[test]
    fn unknown_decision_fails() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = write_ledger(dir.path(), 1).load_ledger().unwrap();
        assert!(run(&ledger, "dec-999").is_err());
    }
}
