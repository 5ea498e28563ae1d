//! Tamper-detection properties of the hash chain.

use pretty_assertions::assert_eq;
use rstest::rstest;
use trace_core::chain::{BreakReason, GENESIS_HASH, Verification, append, digest, verify_chain};
use trace_core::record::{DecisionFields, DecisionRecord, ShapFeatures};

/// Digest of the reference record A chained onto genesis.
const RECORD_A_HASH: &str = "12155c6175ed9aad142e12e4d652e95deb810b0bc828d64dd0c325fa5acc2044";

/// Digest of the reference record B chained onto A.
const RECORD_B_HASH: &str = "700b02ea697297a9f509d0a87649ab291c27a5937b764f44e4bb2d9ec44e40c5";

/// Digest of record A with a timestamp, chained onto genesis.
const RECORD_A_WITH_TIMESTAMP_HASH: &str =
    "43471556937da83e082ac75a97b67cf0867374c27970dc920a454a157d0c0de6";

fn record_a_fields() -> DecisionFields {
    DecisionFields {
        decision_id: "d1".into(),
        user_id: "u1".into(),
        timestamp: None,
        product_id: "p1".into(),
        product_category: "gaming".into(),
        predicted_probability: 0.82,
        top_shap_features: [("gaming_events", 0.31)].into_iter().collect(),
        influential_event_ids: vec!["e1".into(), "e2".into()],
    }
}

fn record_b_fields() -> DecisionFields {
    DecisionFields {
        decision_id: "d2".into(),
        user_id: "u1".into(),
        timestamp: None,
        product_id: "p2".into(),
        product_category: "fitness".into(),
        predicted_probability: 0.64,
        top_shap_features: [("fitness_events", 0.27), ("searches", -0.05)]
            .into_iter()
            .collect(),
        influential_event_ids: vec!["e3".into()],
    }
}

fn sample_fields(index: usize) -> DecisionFields {
    let categories = ["gaming", "smartphone", "fitness", "computer", "home_entertainment"];
    let category = categories[index % categories.len()];
    DecisionFields {
        decision_id: format!("dec-{index:04}"),
        user_id: format!("user-{}", index % 3),
        timestamp: Some(format!("2024-05-{:02}T10:00:00Z", index % 28 + 1)),
        product_id: format!("prod-{index}"),
        product_category: category.to_string(),
        predicted_probability: 0.5 + ((index % 10) as f64) * 0.05,
        top_shap_features: [
            (format!("{category}_events"), 0.3 - (index as f64) * 0.01),
            ("searches".to_string(), -0.04),
        ]
        .into_iter()
        .collect(),
        influential_event_ids: vec![format!("ev-{index}-a"), format!("ev-{index}-b")],
    }
}

fn build_ledger(len: usize) -> Vec<DecisionRecord> {
    let mut records: Vec<DecisionRecord> = Vec::with_capacity(len);
    for index in 0..len {
        let tail = records.last().map_or(GENESIS_HASH, |r| r.hash.as_str());
        let record = append(tail, sample_fields(index)).expect("append should succeed");
        records.push(record);
    }
    records
}

fn break_position(outcome: &Verification) -> usize {
    outcome
        .failed_at()
        .unwrap_or_else(|| panic!("expected an invalid chain, got {outcome:?}"))
        .position
}

#[test]
fn append_is_deterministic() {
    let first = append(GENESIS_HASH, record_a_fields()).unwrap();
    let second = append(GENESIS_HASH, record_a_fields()).unwrap();
    assert_eq!(first.hash, second.hash);
    assert_eq!(first, second);
}

#[rstest]
#[case(1)]
#[case(2)]
#[case(10)]
fn sequential_appends_verify(#[case] len: usize) {
    let ledger = build_ledger(len);
    assert_eq!(verify_chain(&ledger), Verification::Valid { records: len });
}

type Mutation = fn(&mut DecisionRecord);

#[rstest]
#[case::decision_id(|r: &mut DecisionRecord| r.decision_id.push('x'))]
#[case::user_id(|r: &mut DecisionRecord| r.user_id = "intruder".into())]
#[case::timestamp(|r: &mut DecisionRecord| r.timestamp = Some("2030-01-01T00:00:00Z".into()))]
#[case::timestamp_removed(|r: &mut DecisionRecord| r.timestamp = None)]
#[case::product_id(|r: &mut DecisionRecord| r.product_id = "other".into())]
#[case::product_category(|r: &mut DecisionRecord| r.product_category = "fitness_x".into())]
#[case::probability(|r: &mut DecisionRecord| r.predicted_probability = 0.99)]
#[case::shap_weight(|r: &mut DecisionRecord| { r.top_shap_features.insert("searches", 0.5); })]
#[case::shap_added(|r: &mut DecisionRecord| { r.top_shap_features.insert("compares", 0.01); })]
#[case::shap_cleared(|r: &mut DecisionRecord| r.top_shap_features = ShapFeatures::new())]
#[case::event_added(|r: &mut DecisionRecord| r.influential_event_ids.push("ev-forged".into()))]
#[case::events_reordered(|r: &mut DecisionRecord| r.influential_event_ids.reverse())]
#[case::prev_hash(|r: &mut DecisionRecord| r.prev_hash = "f".repeat(64))]
#[case::hash(|r: &mut DecisionRecord| r.hash = "e".repeat(64))]
fn single_field_tamper_is_detected(
    #[case] mutate: Mutation,
    #[values(0, 3, 5)] target: usize,
) {
    let mut ledger = build_ledger(6);
    mutate(&mut ledger[target]);
    let outcome = verify_chain(&ledger);
    assert_eq!(break_position(&outcome), target);
}

#[rstest]
#[case(0)]
#[case(1)]
#[case(4)]
fn deletion_is_detected(#[case] removed: usize) {
    let mut ledger = build_ledger(6);
    ledger.remove(removed);
    assert_eq!(break_position(&verify_chain(&ledger)), removed);
}

#[rstest]
#[case(0)]
#[case(2)]
#[case(4)]
fn adjacent_swap_is_detected(#[case] first: usize) {
    let mut ledger = build_ledger(6);
    ledger.swap(first, first + 1);
    assert_eq!(break_position(&verify_chain(&ledger)), first);
}

#[test]
fn insertion_is_detected() {
    let mut ledger = build_ledger(4);
    let forged = append(&ledger[1].hash, sample_fields(99)).unwrap();
    ledger.insert(2, forged);
    let outcome = verify_chain(&ledger);
    // The forged record itself links correctly; its successor does not.
    assert_eq!(break_position(&outcome), 3);
}

#[test]
fn spliced_subchain_is_detected_at_first_spliced_record() {
    let mut ledger = build_ledger(5);

    // Internally consistent replacement for positions 2..: re-hashed from a
    // forged anchor instead of the real predecessor.
    let forged_anchor = digest(GENESIS_HASH, "forged");
    let mut replacement = Vec::new();
    let mut tail = forged_anchor;
    for index in 2..5 {
        let mut fields = sample_fields(index);
        fields.predicted_probability = 0.01;
        let record = append(&tail, fields).unwrap();
        tail = record.hash.clone();
        replacement.push(record);
    }
    assert!(verify_chain(&replacement).failed_at().is_some());

    ledger.truncate(2);
    ledger.extend(replacement);
    assert_eq!(break_position(&verify_chain(&ledger)), 2);
}

#[test]
fn forged_prev_hash_is_caught_by_link_check() {
    let mut ledger = build_ledger(3);

    // Re-hash record 1 against the true predecessor while its stored
    // prev_hash points elsewhere. Only the link check can see this.
    let real_prev = ledger[0].hash.clone();
    ledger[1].prev_hash = "a".repeat(64);
    let payload = ledger[1].payload().canonical().unwrap();
    ledger[1].hash = digest(&real_prev, &payload);

    let outcome = verify_chain(&ledger[..2]);
    let brk = outcome.failed_at().expect("should fail");
    assert_eq!(brk.position, 1);
    assert_eq!(brk.reason, BreakReason::PrevHashMismatch);
    assert_eq!(brk.expected, real_prev);
    assert_eq!(brk.found, "a".repeat(64));
}

#[test]
fn single_genesis_record_verifies() {
    let record = append(GENESIS_HASH, record_a_fields()).unwrap();
    assert_eq!(record.prev_hash, GENESIS_HASH);
    let payload = record.payload().canonical().unwrap();
    assert_eq!(record.hash, digest(GENESIS_HASH, &payload));
    assert_eq!(verify_chain(&[record]), Verification::Valid { records: 1 });
}

#[test]
fn genesis_record_with_other_prev_hash_fails() {
    let record = append(&"1".repeat(64), record_a_fields()).unwrap();
    let outcome = verify_chain(&[record]);
    assert_eq!(break_position(&outcome), 0);
}

#[test]
fn reference_scenario() {
    let a = append(GENESIS_HASH, record_a_fields()).unwrap();
    assert_eq!(a.hash, RECORD_A_HASH);

    let b = append(&a.hash, record_b_fields()).unwrap();
    assert_eq!(b.prev_hash, RECORD_A_HASH);
    assert_eq!(b.hash, RECORD_B_HASH);

    let mut ledger = vec![a, b];
    assert_eq!(verify_chain(&ledger), Verification::Valid { records: 2 });

    ledger[0].predicted_probability = 0.99;
    let outcome = verify_chain(&ledger);
    let brk = outcome.failed_at().expect("tampered ledger must fail");
    assert_eq!(brk.position, 0);
    assert_eq!(brk.decision_id, "d1");
    assert_eq!(brk.reason, BreakReason::HashMismatch);
    assert_eq!(brk.found, RECORD_A_HASH);
}

#[test]
fn timestamp_is_bound_into_the_hash() {
    let mut fields = record_a_fields();
    fields.timestamp = Some("2024-05-01T10:00:00Z".into());
    let record = append(GENESIS_HASH, fields).unwrap();
    assert_eq!(record.hash, RECORD_A_WITH_TIMESTAMP_HASH);
}

#[test]
fn persisted_line_verifies_after_reparse() {
    let ledger = build_ledger(3);
    let lines: Vec<String> = ledger
        .iter()
        .map(|r| serde_json::to_string(r).unwrap())
        .collect();
    let reparsed: Vec<DecisionRecord> = lines
        .iter()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(reparsed, ledger);
    assert!(verify_chain(&reparsed).is_valid());
}

#[test]
fn externally_produced_line_verifies() {
    // Keys in producer order, pretty much as a Python logger writes them.
    let line = format!(
        r#"{{"decision_id": "d1", "user_id": "u1", "product_id": "p1", "product_category": "gaming", "predicted_probability": 0.82, "top_shap_features": {{"gaming_events": 0.31}}, "influential_event_ids": ["e1", "e2"], "prev_hash": "{GENESIS_HASH}", "hash": "{RECORD_A_HASH}"}}"#
    );
    let record: DecisionRecord = serde_json::from_str(&line).unwrap();
    assert!(verify_chain(&[record]).is_valid());
}

#[rstest]
#[case(0)]
#[case(1)]
#[case(2)]
fn key_added_to_stored_line_is_detected(#[case] target: usize) {
    let ledger = build_ledger(3);
    let mut lines: Vec<serde_json::Value> = ledger
        .iter()
        .map(|r| serde_json::to_value(r).unwrap())
        .collect();
    lines[target]["approved_by"] = serde_json::json!("mallory");

    let reparsed: Vec<DecisionRecord> = lines
        .into_iter()
        .map(|line| serde_json::from_value(line).unwrap())
        .collect();
    assert_eq!(reparsed[target].extra.len(), 1);

    let outcome = verify_chain(&reparsed);
    let brk = outcome.failed_at().expect("added key must break the chain");
    assert_eq!(brk.position, target);
    assert_eq!(brk.reason, BreakReason::HashMismatch);
}

#[test]
fn producer_keys_outside_the_schema_are_hashed() {
    // Same as record A plus two keys the producer hashed along with it.
    let line = format!(
        r#"{{"decision_id": "d1", "user_id": "u1", "product_id": "p1", "product_category": "gaming", "predicted_probability": 0.82, "top_shap_features": {{"gaming_events": 0.31}}, "influential_event_ids": ["e1", "e2"], "model_version": "v2", "scores": {{"b": 1, "a": [0.5, null]}}, "prev_hash": "{GENESIS_HASH}", "hash": "c86c4177da63477cb1828eac2b17db1933ef75fcd50feb7393777050836e7529"}}"#
    );
    let record: DecisionRecord = serde_json::from_str(&line).unwrap();
    assert_eq!(record.extra["model_version"], "v2");
    assert!(verify_chain(std::slice::from_ref(&record)).is_valid());

    let mut stripped = record;
    stripped.extra.clear();
    assert_eq!(break_position(&verify_chain(&[stripped])), 0);
}
