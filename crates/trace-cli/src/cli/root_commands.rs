use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

/// Top-level command tree.
#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// Replay the ledger from genesis and report the first break.
    Verify,
    /// Append one decision read from a JSON file or stdin.
    Append(AppendArgs),
    /// List decisions in ledger order.
    List(ListArgs),
    /// Distinct users with decision counts.
    Users,
    /// Print a stored decision record.
    Show(ShowArgs),
    /// Explain a decision through its SHAP contributions.
    Explain(ExplainArgs),
    /// Print a JSON Schema.
    Schema(SchemaArgs),
}

/// Arguments for `ttrace append`.
#[derive(Clone, Debug, Args)]
pub struct AppendArgs {
    /// JSON file with the decision fields; reads stdin when omitted or `-`.
    #[arg(long)]
    pub file: Option<PathBuf>,
}

/// Arguments for `ttrace list`.
#[derive(Clone, Debug, Args)]
pub struct ListArgs {
    /// Only decisions made for this user.
    #[arg(long)]
    pub user: Option<String>,
    /// Only decisions in this product category.
    #[arg(long)]
    pub category: Option<String>,
    /// Max rows; overrides the global --limit.
    #[arg(long)]
    pub limit: Option<u32>,
}

/// Arguments for `ttrace show`.
#[derive(Clone, Debug, Args)]
pub struct ShowArgs {
    pub decision_id: String,
}

/// Arguments for `ttrace explain`.
#[derive(Clone, Debug, Args)]
pub struct ExplainArgs {
    pub decision_id: String,
}

/// Which type `ttrace schema` describes.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, ValueEnum)]
pub enum SchemaType {
    /// A persisted ledger line.
    #[default]
    Record,
    /// The input accepted by `ttrace append`.
    Fields,
}

/// Arguments for `ttrace schema`.
#[derive(Clone, Debug, Args)]
pub struct SchemaArgs {
    #[arg(value_enum, default_value_t = SchemaType::Record)]
    pub type_name: SchemaType,
}
