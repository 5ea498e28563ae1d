//! Hash-chain engine.
//!
//! Every record's `hash` is `SHA-256(prev_hash_hex ‖ canonical_payload)`,
//! where the payload is the record minus its own hash and `prev_hash_hex` is
//! the predecessor's digest (or [`GENESIS_HASH`] for the first record).
//!
//! The engine is stateless: [`append`] takes the current tail explicitly
//! and [`verify_chain`] replays the whole sequence from genesis on every
//! call.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::errors::CoreError;
use crate::record::{DecisionFields, DecisionRecord};

/// `prev_hash` of the first record: a 256-bit zero digest in hex.
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// Length of a hex-encoded SHA-256 digest.
pub const DIGEST_HEX_LEN: usize = 64;

/// Chain `payload` onto `prev_hash` and return the lowercase hex digest.
#[must_use]
pub fn digest(prev_hash: &str, payload: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(prev_hash.as_bytes());
    hasher.update(payload.as_bytes());
    hex::encode(hasher.finalize())
}

/// Whether `value` looks like a digest this engine produces.
#[must_use]
pub fn is_digest(value: &str) -> bool {
    value.len() == DIGEST_HEX_LEN
        && value
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

/// Hash of the last record, or the genesis sentinel for an empty sequence.
#[must_use]
pub fn tail_hash(records: &[DecisionRecord]) -> &str {
    records.last().map_or(GENESIS_HASH, |r| r.hash.as_str())
}

/// Build the next ledger record on top of `tail_hash`.
///
/// Persisting the returned record is the caller's job, as is making sure no
/// other append races against the same tail.
///
/// # Errors
///
/// - [`CoreError::Validation`] for empty identifiers, an out-of-range
///   probability, a malformed timestamp, or a `tail_hash` that is not a
///   64-char lowercase hex digest.
/// - [`CoreError::Serialization`] for NaN or infinite floats.
pub fn append(tail_hash: &str, fields: DecisionFields) -> Result<DecisionRecord, CoreError> {
    if !is_digest(tail_hash) {
        return Err(CoreError::validation(
            "prev_hash",
            format!("tail hash must be {DIGEST_HEX_LEN} lowercase hex chars"),
        ));
    }
    fields.validate()?;

    let payload = fields.payload(tail_hash).canonical()?;
    let hash = digest(tail_hash, &payload);

    tracing::debug!(
        "chained decision {} onto {}: {}",
        fields.decision_id,
        short(tail_hash),
        short(&hash)
    );

    Ok(DecisionRecord::from_parts(
        fields,
        tail_hash.to_string(),
        hash,
    ))
}

/// Which check failed at a [`ChainBreak`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakReason {
    /// The stored `hash` differs from the recomputed digest.
    HashMismatch,
    /// The stored `prev_hash` does not point at the predecessor's `hash`.
    PrevHashMismatch,
    /// The record could not be canonically encoded.
    Unencodable,
}

impl std::fmt::Display for BreakReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HashMismatch => write!(f, "hash mismatch"),
            Self::PrevHashMismatch => write!(f, "prev_hash mismatch"),
            Self::Unencodable => write!(f, "unencodable record"),
        }
    }
}

/// First position at which the chain fails to verify.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainBreak {
    /// Zero-based index into the verified sequence.
    pub position: usize,
    pub decision_id: String,
    pub reason: BreakReason,
    /// What the verifier computed (or the error text for `Unencodable`).
    pub expected: String,
    /// What the record stores.
    pub found: String,
}

impl std::fmt::Display for ChainBreak {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} at position {} (decision {}): expected {}, found {}",
            self.reason, self.position, self.decision_id, self.expected, self.found
        )
    }
}

/// Outcome of replaying a ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    /// Nothing to verify yet. Not the same thing as valid.
    Empty,
    /// Every record re-hashed and linked correctly.
    Valid { records: usize },
    /// The ledger was modified after the fact.
    Invalid(ChainBreak),
}

impl Verification {
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        matches!(self, Self::Valid { .. })
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    #[must_use]
    pub const fn failed_at(&self) -> Option<&ChainBreak> {
        match self {
            Self::Invalid(brk) => Some(brk),
            Self::Empty | Self::Valid { .. } => None,
        }
    }
}

/// Replay `records` from genesis and report the first integrity failure.
///
/// Both the recomputed digest and the stored `prev_hash` link are checked
/// for every record. A record re-hashed against its true predecessor but
/// carrying a forged `prev_hash` passes the digest check; only the link
/// check catches it.
#[must_use]
pub fn verify_chain(records: &[DecisionRecord]) -> Verification {
    if records.is_empty() {
        return Verification::Empty;
    }

    let mut expected_prev = GENESIS_HASH;
    for (position, record) in records.iter().enumerate() {
        let payload = match record.payload().canonical() {
            Ok(payload) => payload,
            Err(e) => {
                return fail(ChainBreak {
                    position,
                    decision_id: record.decision_id.clone(),
                    reason: BreakReason::Unencodable,
                    expected: e.to_string(),
                    found: record.hash.clone(),
                });
            }
        };

        let calc = digest(expected_prev, &payload);
        if calc != record.hash {
            return fail(ChainBreak {
                position,
                decision_id: record.decision_id.clone(),
                reason: BreakReason::HashMismatch,
                expected: calc,
                found: record.hash.clone(),
            });
        }

        if record.prev_hash != expected_prev {
            return fail(ChainBreak {
                position,
                decision_id: record.decision_id.clone(),
                reason: BreakReason::PrevHashMismatch,
                expected: expected_prev.to_string(),
                found: record.prev_hash.clone(),
            });
        }

        expected_prev = record.hash.as_str();
    }

    tracing::debug!("verified {} ledger records", records.len());
    Verification::Valid {
        records: records.len(),
    }
}

fn fail(brk: ChainBreak) -> Verification {
    tracing::warn!("ledger integrity violation: {brk}");
    Verification::Invalid(brk)
}

fn short(hash: &str) -> &str {
    hash.get(..12).unwrap_or(hash)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::record::ShapFeatures;

    fn fields(id: &str) -> DecisionFields {
        DecisionFields {
            decision_id: id.into(),
            user_id: "u1".into(),
            timestamp: None,
            product_id: "p1".into(),
            product_category: "gaming".into(),
            predicted_probability: 0.5,
            top_shap_features: ShapFeatures::new(),
            influential_event_ids: Vec::new(),
        }
    }

    #[test]
    fn genesis_is_a_digest() {
        assert_eq!(GENESIS_HASH.len(), DIGEST_HEX_LEN);
        assert!(GENESIS_HASH.bytes().all(|b| b == b'0'));
        assert!(is_digest(GENESIS_HASH));
    }

    #[test]
    fn digest_concatenates_prev_and_payload() {
        assert_eq!(digest("ab", "c"), digest("a", "bc"));
        assert_eq!(digest("", "abc"), digest("abc", ""));
        assert_eq!(
            digest("", ""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn is_digest_rejects_uppercase_and_wrong_length() {
        assert!(!is_digest(&"A".repeat(64)));
        assert!(!is_digest(&"0".repeat(63)));
        assert!(!is_digest(&"g".repeat(64)));
    }

    #[test]
    fn append_links_to_tail() {
        let first = append(GENESIS_HASH, fields("d1")).unwrap();
        assert_eq!(first.prev_hash, GENESIS_HASH);
        let second = append(&first.hash, fields("d2")).unwrap();
        assert_eq!(second.prev_hash, first.hash);
        assert_ne!(second.hash, first.hash);
    }

    #[test]
    fn append_rejects_malformed_tail() {
        let err = append("not-a-hash", fields("d1")).unwrap_err();
        assert_eq!(err.field(), Some("prev_hash"));
    }

    #[test]
    fn tail_hash_of_empty_is_genesis() {
        assert_eq!(tail_hash(&[]), GENESIS_HASH);
        let record = append(GENESIS_HASH, fields("d1")).unwrap();
        assert_eq!(tail_hash(std::slice::from_ref(&record)), record.hash);
    }

    #[test]
    fn empty_is_neither_valid_nor_invalid() {
        let outcome = verify_chain(&[]);
        assert!(outcome.is_empty());
        assert!(!outcome.is_valid());
        assert!(outcome.failed_at().is_none());
    }

    #[test]
    fn nan_in_stored_record_is_reported_not_panicked() {
        let mut record = append(GENESIS_HASH, fields("d1")).unwrap();
        record.predicted_probability = f64::NAN;
        let outcome = verify_chain(&[record]);
        let brk = outcome.failed_at().expect("should fail");
        assert_eq!(brk.reason, BreakReason::Unencodable);
        assert_eq!(brk.position, 0);
    }

    #[test]
    fn break_display_is_forensic() {
        let brk = ChainBreak {
            position: 3,
            decision_id: "d4".into(),
            reason: BreakReason::PrevHashMismatch,
            expected: "aa".into(),
            found: "bb".into(),
        };
        assert_eq!(
            brk.to_string(),
            "prev_hash mismatch at position 3 (decision d4): expected aa, found bb"
        );
    }
}
