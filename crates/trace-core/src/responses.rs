//! CLI response types returned as JSON by `ttrace` commands.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::chain::{ChainBreak, Verification};
use crate::explain::{self, Contribution};
use crate::record::DecisionRecord;

/// Overall chain state as a flat tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ChainStatus {
    Valid,
    Invalid,
    Empty,
}

impl From<&Verification> for ChainStatus {
    fn from(outcome: &Verification) -> Self {
        match outcome {
            Verification::Empty => Self::Empty,
            Verification::Valid { .. } => Self::Valid,
            Verification::Invalid(_) => Self::Invalid,
        }
    }
}

/// Response from `ttrace verify`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VerifyResponse {
    pub ledger: String,
    pub status: ChainStatus,
    pub valid: bool,
    pub empty: bool,
    pub total_records: usize,
    /// Records that passed both checks before the first break (or all).
    pub records_verified: usize,
    /// Digest of the last record when the chain is valid. Recording it
    /// somewhere outside the ledger is what makes tail truncation detectable.
    pub tail_hash: Option<String>,
    pub failed_at: Option<ChainBreak>,
}

impl VerifyResponse {
    #[must_use]
    pub fn new(
        ledger: impl Into<String>,
        records: &[DecisionRecord],
        outcome: &Verification,
    ) -> Self {
        let records_verified = match outcome {
            Verification::Empty => 0,
            Verification::Valid { records: verified } => *verified,
            Verification::Invalid(brk) => brk.position,
        };
        Self {
            ledger: ledger.into(),
            status: ChainStatus::from(outcome),
            valid: outcome.is_valid(),
            empty: outcome.is_empty(),
            total_records: records.len(),
            records_verified,
            tail_hash: outcome
                .is_valid()
                .then(|| crate::chain::tail_hash(records).to_string()),
            failed_at: outcome.failed_at().cloned(),
        }
    }
}

/// Response from `ttrace append`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppendResponse {
    pub position: usize,
    pub record: DecisionRecord,
}

/// One row of `ttrace list`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct DecisionSummary {
    pub position: usize,
    pub decision_id: String,
    pub user_id: String,
    pub timestamp: Option<String>,
    pub product_id: String,
    pub product_category: String,
    pub predicted_probability: f64,
    pub influential_events: usize,
}

impl DecisionSummary {
    #[must_use]
    pub fn from_record(position: usize, record: &DecisionRecord) -> Self {
        Self {
            position,
            decision_id: record.decision_id.clone(),
            user_id: record.user_id.clone(),
            timestamp: record.timestamp.clone(),
            product_id: record.product_id.clone(),
            product_category: record.product_category.clone(),
            predicted_probability: record.predicted_probability,
            influential_events: record.influential_event_ids.len(),
        }
    }
}

/// One row of `ttrace users`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct UserSummary {
    pub user_id: String,
    pub decisions: usize,
}

/// Response from `ttrace explain`.
///
/// Always carries the chain status: an explanation drawn from a tampered
/// ledger must never be shown without that signal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExplainResponse {
    pub chain_status: ChainStatus,
    pub decision: DecisionSummary,
    pub summary: String,
    pub contributions: Vec<Contribution>,
    pub influential_event_ids: Vec<String>,
}

impl ExplainResponse {
    #[must_use]
    pub fn new(position: usize, record: &DecisionRecord, chain_status: ChainStatus) -> Self {
        Self {
            chain_status,
            decision: DecisionSummary::from_record(position, record),
            summary: explain::summarize(record),
            contributions: explain::rank_contributions(&record.top_shap_features),
            influential_event_ids: record.influential_event_ids.clone(),
        }
    }
}
