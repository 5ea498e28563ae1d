use schemars::schema_for;
use trace_core::{DecisionFields, DecisionRecord};

use crate::cli::GlobalFlags;
use crate::cli::root_commands::{SchemaArgs, SchemaType};
use crate::output::output;

/// Handle `ttrace schema`.
pub fn handle(args: &SchemaArgs, flags: &GlobalFlags) -> anyhow::Result<()> {
    output(&run(args.type_name)?, flags.format)
}

fn run(type_name: SchemaType) -> anyhow::Result<serde_json::Value> {
    let schema = match type_name {
        SchemaType::Record => schema_for!(DecisionRecord),
        SchemaType::Fields => schema_for!(DecisionFields),
    };
    Ok(serde_json::to_value(schema)?)
}
