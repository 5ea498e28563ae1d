//! Human-readable explanation of a decision's SHAP contributions.
//!
//! Consumers render these; nothing here feeds back into hashing.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::record::{DecisionRecord, ShapFeatures};

/// Weight magnitude above which an influence counts as strong.
pub const STRONG_THRESHOLD: f64 = 0.25;

/// Weight magnitude above which an influence counts as medium.
pub const MEDIUM_THRESHOLD: f64 = 0.12;

/// Describe a behavioral feature in plain words.
#[must_use]
pub fn feature_label(name: &str) -> String {
    match name {
        "total_events" => "overall activity volume".to_string(),
        "searches" => "number of searches".to_string(),
        "watch_videos" => "number of video interactions".to_string(),
        "read_articles" => "article reading activity".to_string(),
        "compares" => "product comparison activity".to_string(),
        "product_views" => "product view activity".to_string(),
        other => match other.strip_suffix("_events") {
            Some(category) => format!("interactions in {category} category"),
            None => other.to_string(),
        },
    }
}

/// Bucketed strength of a single contribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Influence {
    Strong,
    Medium,
    Small,
}

impl Influence {
    #[must_use]
    pub fn from_weight(weight: f64) -> Self {
        let magnitude = weight.abs();
        if magnitude > STRONG_THRESHOLD {
            Self::Strong
        } else if magnitude > MEDIUM_THRESHOLD {
            Self::Medium
        } else {
            Self::Small
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Strong => "strong",
            Self::Medium => "medium",
            Self::Small => "small",
        }
    }
}

impl fmt::Display for Influence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a feature pushed the purchase likelihood up or down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Increases,
    Decreases,
    Neutral,
}

impl Direction {
    #[must_use]
    pub fn from_weight(weight: f64) -> Self {
        if weight > 0.0 {
            Self::Increases
        } else if weight < 0.0 {
            Self::Decreases
        } else {
            Self::Neutral
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Increases => "increases",
            Self::Decreases => "decreases",
            Self::Neutral => "neutral",
        }
    }
}

/// One ranked SHAP contribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Contribution {
    pub feature: String,
    pub label: String,
    pub weight: f64,
    pub abs_impact: f64,
    pub influence: Influence,
    pub direction: Direction,
}

/// Contributions ordered by absolute impact, largest first.
///
/// Ties keep the order in which the producer listed the features.
#[must_use]
pub fn rank_contributions(features: &ShapFeatures) -> Vec<Contribution> {
    let mut ranked: Vec<Contribution> = features
        .iter()
        .map(|(feature, weight)| Contribution {
            feature: feature.to_string(),
            label: feature_label(feature),
            weight,
            abs_impact: weight.abs(),
            influence: Influence::from_weight(weight),
            direction: Direction::from_weight(weight),
        })
        .collect();
    ranked.sort_by(|a, b| b.abs_impact.total_cmp(&a.abs_impact));
    ranked
}

/// One-paragraph analytical summary of a decision.
#[must_use]
pub fn summarize(record: &DecisionRecord) -> String {
    let ranked = rank_contributions(&record.top_shap_features);
    let mut text = format!(
        "Purchase of {} (category: {}) with model-estimated probability {:.3}.",
        record.product_id, record.product_category, record.predicted_probability
    );
    match ranked.first() {
        Some(top) => {
            let verb = match top.direction {
                Direction::Increases => "raised",
                Direction::Decreases => "lowered",
                Direction::Neutral => "did not move",
            };
            text.push_str(&format!(
                " The strongest factor, {} ({:+.2}), {verb} the purchase likelihood.",
                top.label, top.weight
            ));
        }
        None => text.push_str(" No feature attributions were recorded."),
    }
    text
}
