use std::io::Read;
use std::path::Path;

use anyhow::Context;
use trace_core::DecisionFields;
use trace_core::responses::AppendResponse;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::AppendArgs;
use crate::context::AppContext;
use crate::output::output;

/// Handle `ttrace append`.
pub fn handle(args: &AppendArgs, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let input = read_input(args.file.as_deref())?;
    let fields = parse_fields(&input)?;
    let response = run(fields, ctx)?;
    output(&response, flags.format)
}

fn read_input(file: Option<&Path>) -> anyhow::Result<String> {
    match file {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display())),
        _ => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read decision from stdin")?;
            Ok(buf)
        }
    }
}

/// Decode one decision field set. `prev_hash` and `hash` are assigned by
/// the ledger and rejected here.
fn parse_fields(input: &str) -> anyhow::Result<DecisionFields> {
    serde_json::from_str(input.trim())
        .context("invalid decision input (expected one JSON object without prev_hash/hash)")
}

fn run(fields: DecisionFields, ctx: &AppContext) -> anyhow::Result<AppendResponse> {
    let mut writer = ctx.open_writer()?;
    let decision_id = fields.decision_id.clone();
    let record = writer
        .append(fields)
        .with_context(|| format!("failed to append decision '{decision_id}'"))?;
    Ok(AppendResponse {
        position: writer.len() - 1,
        record,
    })
}
