//! Decision record model.
//!
//! A [`DecisionRecord`] is one immutable ledger entry. Producers supply a
//! [`DecisionFields`] set; the chain engine binds it to its predecessor and
//! returns the finished record. The hashable subset of either type is
//! exposed only through the [`HashPayload`] projection, which has no `hash`
//! field, so a record's own digest can never leak into its hash input.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDateTime};
use schemars::JsonSchema;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::canonical;
use crate::errors::CoreError;

/// Keys a stored line carries beyond the known schema.
pub type ExtraFields = BTreeMap<String, Value>;

static NO_EXTRA_FIELDS: ExtraFields = BTreeMap::new();

/// Signed SHAP contributions keyed by feature name.
///
/// Keeps insertion order so persisted lines read the way the producer wrote
/// them. Canonical serialization sorts keys, so order never affects a hash.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShapFeatures(Vec<(String, f64)>);

impl ShapFeatures {
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Insert or replace a feature weight, keeping the original position on
    /// replacement. Returns the previous weight, if any.
    pub fn insert(&mut self, name: impl Into<String>, weight: f64) -> Option<f64> {
        let name = name.into();
        if let Some(slot) = self.0.iter_mut().find(|(existing, _)| *existing == name) {
            return Some(std::mem::replace(&mut slot.1, weight));
        }
        self.0.push((name, weight));
        None
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<f64> {
        self.0
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, weight)| *weight)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(name, weight)| (name.as_str(), *weight))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for ShapFeatures {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        let mut features = Self::new();
        for (name, weight) in iter {
            features.insert(name, weight);
        }
        features
    }
}

impl Serialize for ShapFeatures {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, weight) in &self.0 {
            map.serialize_entry(name, weight)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ShapFeatures {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FeaturesVisitor;

        impl<'de> Visitor<'de> for FeaturesVisitor {
            type Value = ShapFeatures;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of feature name to signed weight")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut features = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((name, weight)) = access.next_entry::<String, f64>()? {
                    if features.iter().any(|(existing, _)| *existing == name) {
                        return Err(serde::de::Error::custom(format!(
                            "duplicate feature '{name}'"
                        )));
                    }
                    features.push((name, weight));
                }
                Ok(ShapFeatures(features))
            }
        }

        deserializer.deserialize_map(FeaturesVisitor)
    }
}

/// Field set supplied by the decision producer.
///
/// Carries neither `prev_hash` nor `hash`: linking is the chain engine's
/// job, and unknown keys are rejected so a producer cannot smuggle either in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct DecisionFields {
    /// Unique decision identifier (UUID or similar).
    pub decision_id: String,

    /// Subject user.
    pub user_id: String,

    /// ISO 8601 / RFC 3339 time the decision was logged. Omitted from the
    /// hash payload when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,

    pub product_id: String,

    pub product_category: String,

    /// Model confidence in `[0, 1]`.
    pub predicted_probability: f64,

    #[schemars(with = "BTreeMap<String, f64>")]
    pub top_shap_features: ShapFeatures,

    /// References into the external behavioral event log.
    #[serde(default)]
    pub influential_event_ids: Vec<String>,
}

impl DecisionFields {
    /// Hashable projection of these fields once linked to `prev_hash`.
    #[must_use]
    pub fn payload<'a>(&'a self, prev_hash: &'a str) -> HashPayload<'a> {
        HashPayload {
            decision_id: &self.decision_id,
            user_id: &self.user_id,
            timestamp: self.timestamp.as_deref(),
            product_id: &self.product_id,
            product_category: &self.product_category,
            predicted_probability: self.predicted_probability,
            top_shap_features: &self.top_shap_features,
            influential_event_ids: &self.influential_event_ids,
            prev_hash,
            extra: &NO_EXTRA_FIELDS,
        }
    }

    /// Check required fields and value domains.
    ///
    /// Non-finite floats are reported as serialization errors, since they
    /// have no canonical encoding; everything else is a validation error.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Serialization`] or [`CoreError::Validation`] for
    /// the first offending field.
    pub fn validate(&self) -> Result<(), CoreError> {
        require_non_empty("decision_id", &self.decision_id)?;
        require_non_empty("user_id", &self.user_id)?;
        require_non_empty("product_id", &self.product_id)?;
        require_non_empty("product_category", &self.product_category)?;

        if let Some(ts) = &self.timestamp {
            if !is_valid_timestamp(ts) {
                return Err(CoreError::validation(
                    "timestamp",
                    format!("'{ts}' is not an ISO 8601 timestamp or epoch seconds"),
                ));
            }
        }

        let p = self.predicted_probability;
        if !p.is_finite() {
            return Err(CoreError::serialization(
                "predicted_probability",
                format!("non-finite value {p}"),
            ));
        }
        if !(0.0..=1.0).contains(&p) {
            return Err(CoreError::validation(
                "predicted_probability",
                format!("{p} is outside [0, 1]"),
            ));
        }

        for (name, weight) in self.top_shap_features.iter() {
            if name.trim().is_empty() {
                return Err(CoreError::validation(
                    "top_shap_features",
                    "feature names must not be empty",
                ));
            }
            if !weight.is_finite() {
                return Err(CoreError::serialization(
                    format!("top_shap_features.{name}"),
                    format!("non-finite weight {weight}"),
                ));
            }
        }

        if self
            .influential_event_ids
            .iter()
            .any(|id| id.trim().is_empty())
        {
            return Err(CoreError::validation(
                "influential_event_ids",
                "event ids must not be empty",
            ));
        }

        Ok(())
    }
}

fn require_non_empty(field: &str, value: &str) -> Result<(), CoreError> {
    if value.trim().is_empty() {
        return Err(CoreError::validation(field, "required field is empty"));
    }
    Ok(())
}

fn is_valid_timestamp(ts: &str) -> bool {
    DateTime::parse_from_rfc3339(ts).is_ok()
        || NaiveDateTime::parse_from_str(ts, "%Y-%m-%dT%H:%M:%S%.f").is_ok()
        || NaiveDateTime::parse_from_str(ts, "%Y-%m-%d %H:%M:%S%.f").is_ok()
        || (!ts.is_empty() && ts.parse::<i64>().is_ok())
}

/// One ledger entry, exactly as persisted on a JSONL line.
///
/// Keys outside the known schema are kept in `extra` and hashed with the
/// rest of the line, so adding a key to a stored record breaks its digest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DecisionRecord {
    pub decision_id: String,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    pub product_id: String,
    pub product_category: String,
    pub predicted_probability: f64,
    #[schemars(with = "BTreeMap<String, f64>")]
    pub top_shap_features: ShapFeatures,
    #[serde(default)]
    pub influential_event_ids: Vec<String>,

    /// Hex digest of the predecessor, or the genesis sentinel.
    pub prev_hash: String,

    /// Hex digest of this record's payload chained onto `prev_hash`.
    pub hash: String,

    #[serde(flatten)]
    pub extra: ExtraFields,
}

impl DecisionRecord {
    pub(crate) fn from_parts(fields: DecisionFields, prev_hash: String, hash: String) -> Self {
        Self {
            decision_id: fields.decision_id,
            user_id: fields.user_id,
            timestamp: fields.timestamp,
            product_id: fields.product_id,
            product_category: fields.product_category,
            predicted_probability: fields.predicted_probability,
            top_shap_features: fields.top_shap_features,
            influential_event_ids: fields.influential_event_ids,
            prev_hash,
            hash,
            extra: ExtraFields::new(),
        }
    }

    /// Hashable projection: every field except `hash`, unknown keys included.
    #[must_use]
    pub fn payload(&self) -> HashPayload<'_> {
        HashPayload {
            decision_id: &self.decision_id,
            user_id: &self.user_id,
            timestamp: self.timestamp.as_deref(),
            product_id: &self.product_id,
            product_category: &self.product_category,
            predicted_probability: self.predicted_probability,
            top_shap_features: &self.top_shap_features,
            influential_event_ids: &self.influential_event_ids,
            prev_hash: &self.prev_hash,
            extra: &self.extra,
        }
    }

    /// The producer-facing fields, without chain linkage.
    #[must_use]
    pub fn fields(&self) -> DecisionFields {
        DecisionFields {
            decision_id: self.decision_id.clone(),
            user_id: self.user_id.clone(),
            timestamp: self.timestamp.clone(),
            product_id: self.product_id.clone(),
            product_category: self.product_category.clone(),
            predicted_probability: self.predicted_probability,
            top_shap_features: self.top_shap_features.clone(),
            influential_event_ids: self.influential_event_ids.clone(),
        }
    }
}

/// Borrowed view of the hashed subset of a record.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct HashPayload<'a> {
    pub decision_id: &'a str,
    pub user_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<&'a str>,
    pub product_id: &'a str,
    pub product_category: &'a str,
    pub predicted_probability: f64,
    pub top_shap_features: &'a ShapFeatures,
    pub influential_event_ids: &'a [String],
    pub prev_hash: &'a str,
    #[serde(flatten)]
    pub extra: &'a ExtraFields,
}

impl HashPayload<'_> {
    /// Canonical encoding of this payload.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Serialization`] naming the field that holds a
    /// non-finite float.
    pub fn canonical(&self) -> Result<String, CoreError> {
        // serde_json maps NaN to null during `to_value`; catch it first.
        if !self.predicted_probability.is_finite() {
            return Err(CoreError::serialization(
                "predicted_probability",
                format!("non-finite value {}", self.predicted_probability),
            ));
        }
        if let Some((name, weight)) = self
            .top_shap_features
            .iter()
            .find(|(_, weight)| !weight.is_finite())
        {
            return Err(CoreError::serialization(
                format!("top_shap_features.{name}"),
                format!("non-finite weight {weight}"),
            ));
        }
        canonical::to_canonical_string(self)
    }
}
