//! Ledger fixtures shared by command tests.

use std::path::Path;

use trace_config::TraceConfig;
use trace_core::DecisionFields;
use trace_ledger::LedgerWriter;

use crate::context::AppContext;

pub fn sample_fields(index: usize) -> DecisionFields {
    let categories = ["gaming", "smartphone", "fitness"];
    let category = categories[index % categories.len()];
    DecisionFields {
        decision_id: format!("dec-{index:03}"),
        user_id: format!("U{:03}", index % 2),
        timestamp: Some(format!("2024-05-{:02}T12:00:00Z", index % 28 + 1)),
        product_id: format!("P-{index}"),
        product_category: category.to_string(),
        predicted_probability: 0.7,
        top_shap_features: [(format!("{category}_events"), 0.3), ("searches".to_string(), -0.13)]
            .into_iter()
            .collect(),
        influential_event_ids: vec![format!("E{index}")],
    }
}

/// Write `count` sample decisions under `dir` and return a context on them.
pub fn write_ledger(dir: &Path, count: usize) -> AppContext {
    let path = dir.join("ledger.jsonl");
    let mut writer = LedgerWriter::open(&path).expect("writer should open");
    for index in 0..count {
        writer.append(sample_fields(index)).expect("append should succeed");
    }
    AppContext::new(TraceConfig::default(), Some(&path))
}

/// Raw-output flags for calling handlers directly.
pub fn flags() -> crate::cli::GlobalFlags {
    crate::cli::GlobalFlags {
        format: crate::cli::OutputFormat::Raw,
        limit: None,
        quiet: true,
        verbose: false,
        color: crate::cli::ColorMode::Never,
        ledger: None,
    }
}
