//! Response rendering for `--format json|table|raw`.
//!
//! JSON and raw output come straight from serde. Table output is laid out
//! per response type through [`Tabular`].

use serde::Serialize;
use trace_core::DecisionRecord;
use trace_core::explain::{Contribution, Direction};
use trace_core::responses::{
    AppendResponse, ChainStatus, DecisionSummary, ExplainResponse, UserSummary, VerifyResponse,
};

use crate::cli::OutputFormat;

pub mod table;

use table::{Cell, Style, Tone};

/// A response with a terminal layout for `--format table`.
pub trait Tabular {
    fn to_table(&self, style: Style) -> String;
}

/// Render a response to a string in the requested format.
pub fn render<T: Serialize + Tabular + ?Sized>(
    value: &T,
    format: OutputFormat,
) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(value)?),
        OutputFormat::Raw => Ok(serde_json::to_string(value)?),
        OutputFormat::Table => Ok(value.to_table(Style::current())),
    }
}

/// Print a response in the requested format.
pub fn output<T: Serialize + Tabular + ?Sized>(
    value: &T,
    format: OutputFormat,
) -> anyhow::Result<()> {
    println!("{}", render(value, format)?);
    Ok(())
}

fn status_cell(status: ChainStatus) -> Cell {
    match status {
        ChainStatus::Valid => Cell::toned("valid", Tone::Good),
        ChainStatus::Empty => Cell::toned("empty", Tone::Warn),
        ChainStatus::Invalid => Cell::toned("invalid", Tone::Bad),
    }
}

fn direction_cell(direction: Direction) -> Cell {
    let tone = match direction {
        Direction::Increases => Tone::Good,
        Direction::Decreases => Tone::Bad,
        Direction::Neutral => Tone::Plain,
    };
    Cell::toned(direction.as_str(), tone)
}

fn probability(value: f64) -> String {
    format!("{value:.3}")
}

fn event_list(ids: &[String]) -> String {
    if ids.is_empty() {
        String::from("-")
    } else {
        ids.join(", ")
    }
}

impl Tabular for VerifyResponse {
    fn to_table(&self, style: Style) -> String {
        let mut rows = vec![
            ("ledger", Cell::text(&self.ledger)),
            ("status", status_cell(self.status)),
            (
                "records",
                Cell::text(format!(
                    "{} of {} verified",
                    self.records_verified, self.total_records
                )),
            ),
        ];
        if let Some(tail) = &self.tail_hash {
            rows.push(("tail hash", Cell::text(tail)));
        }
        if let Some(brk) = &self.failed_at {
            rows.push((
                "broken at",
                Cell::toned(
                    format!("#{} ({})", brk.position, brk.decision_id),
                    Tone::Bad,
                ),
            ));
            rows.push(("reason", Cell::toned(brk.reason.to_string(), Tone::Bad)));
            rows.push(("expected", Cell::text(&brk.expected)));
            rows.push(("found", Cell::text(&brk.found)));
        }
        table::fields(&rows, style)
    }
}

fn record_rows(record: &DecisionRecord) -> Vec<(&str, Cell)> {
    let mut rows = vec![
        ("decision", Cell::text(&record.decision_id)),
        ("user", Cell::text(&record.user_id)),
        (
            "timestamp",
            Cell::text(record.timestamp.as_deref().unwrap_or("-")),
        ),
        ("product", Cell::text(&record.product_id)),
        ("category", Cell::text(&record.product_category)),
        ("probability", Cell::text(probability(record.predicted_probability))),
        ("events", Cell::text(event_list(&record.influential_event_ids))),
    ];
    rows.extend(
        record
            .extra
            .iter()
            .map(|(key, value)| (key.as_str(), Cell::text(value.to_string()))),
    );
    rows.push(("prev hash", Cell::text(&record.prev_hash)));
    rows.push(("hash", Cell::text(&record.hash)));
    rows
}

fn features_grid(record: &DecisionRecord, style: Style) -> String {
    if record.top_shap_features.is_empty() {
        return String::from("(no features)");
    }
    let rows: Vec<Vec<Cell>> = record
        .top_shap_features
        .iter()
        .map(|(name, weight)| vec![Cell::text(name), Cell::number(format!("{weight:+.3}"))])
        .collect();
    table::grid(&["feature", "weight"], &rows, style)
}

impl Tabular for DecisionRecord {
    fn to_table(&self, style: Style) -> String {
        format!(
            "{}\n\n{}",
            table::fields(&record_rows(self), style),
            features_grid(self, style)
        )
    }
}

impl Tabular for AppendResponse {
    fn to_table(&self, style: Style) -> String {
        let mut rows = vec![("position", Cell::text(self.position.to_string()))];
        rows.extend(record_rows(&self.record));
        table::fields(&rows, style)
    }
}

impl Tabular for Vec<DecisionSummary> {
    fn to_table(&self, style: Style) -> String {
        if self.is_empty() {
            return String::from("(no decisions)");
        }
        let rows: Vec<Vec<Cell>> = self
            .iter()
            .map(|d| {
                vec![
                    Cell::number(d.position.to_string()),
                    Cell::text(&d.decision_id),
                    Cell::text(&d.user_id),
                    Cell::text(d.timestamp.as_deref().unwrap_or("-")),
                    Cell::text(&d.product_id),
                    Cell::text(&d.product_category),
                    Cell::number(probability(d.predicted_probability)),
                    Cell::number(d.influential_events.to_string()),
                ]
            })
            .collect();
        table::grid(
            &[
                "#", "decision", "user", "timestamp", "product", "category", "prob", "events",
            ],
            &rows,
            style,
        )
    }
}

impl Tabular for Vec<UserSummary> {
    fn to_table(&self, style: Style) -> String {
        if self.is_empty() {
            return String::from("(no users)");
        }
        let rows: Vec<Vec<Cell>> = self
            .iter()
            .map(|u| vec![Cell::text(&u.user_id), Cell::number(u.decisions.to_string())])
            .collect();
        table::grid(&["user", "decisions"], &rows, style)
    }
}

fn contribution_row(contribution: &Contribution) -> Vec<Cell> {
    vec![
        Cell::text(&contribution.feature),
        Cell::text(&contribution.label),
        Cell::number(format!("{:+.3}", contribution.weight)),
        direction_cell(contribution.direction),
        Cell::text(contribution.influence.as_str()),
    ]
}

impl Tabular for ExplainResponse {
    fn to_table(&self, style: Style) -> String {
        let d = &self.decision;
        let head = table::fields(
            &[
                ("chain", status_cell(self.chain_status)),
                ("decision", Cell::text(format!("#{} {}", d.position, d.decision_id))),
                ("user", Cell::text(&d.user_id)),
                ("product", Cell::text(format!("{} ({})", d.product_id, d.product_category))),
                ("probability", Cell::text(probability(d.predicted_probability))),
                ("events", Cell::text(event_list(&self.influential_event_ids))),
            ],
            style,
        );
        let contributions = if self.contributions.is_empty() {
            String::from("(no contributions)")
        } else {
            let rows: Vec<Vec<Cell>> = self.contributions.iter().map(contribution_row).collect();
            table::grid(
                &["feature", "meaning", "weight", "direction", "influence"],
                &rows,
                style,
            )
        };
        format!("{head}\n\n{}\n\n{contributions}", self.summary)
    }
}

/// JSON Schema documents have no tabular shape.
impl Tabular for serde_json::Value {
    fn to_table(&self, _style: Style) -> String {
        format!("{self:#}")
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use trace_core::{BreakReason, ChainBreak, GENESIS_HASH};

    use super::*;
    use crate::commands::test_support::sample_fields;

    const PLAIN: Style = Style {
        color: false,
        width: None,
    };

    fn broken() -> VerifyResponse {
        VerifyResponse {
            ledger: "ledger.jsonl".into(),
            status: ChainStatus::Invalid,
            valid: false,
            empty: false,
            total_records: 5,
            records_verified: 2,
            tail_hash: None,
            failed_at: Some(ChainBreak {
                position: 2,
                decision_id: "dec-002".into(),
                reason: BreakReason::HashMismatch,
                expected: "a".repeat(64),
                found: "b".repeat(64),
            }),
        }
    }

    #[test]
    fn json_and_raw_come_from_serde() {
        let response = broken();
        let pretty = render(&response, OutputFormat::Json).unwrap();
        let raw = render(&response, OutputFormat::Raw).unwrap();
        assert!(!raw.contains('\n'));
        let a: serde_json::Value = serde_json::from_str(&pretty).unwrap();
        let b: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(a, b);
        assert_eq!(a["failed_at"]["reason"], "hash_mismatch");
    }

    #[test]
    fn chain_break_table_names_position_and_reason() {
        let out = broken().to_table(PLAIN);
        assert!(out.contains("2 of 5 verified"), "{out}");
        assert!(out.contains("#2 (dec-002)"), "{out}");
        assert!(out.contains("hash mismatch"), "{out}");
        // Digests are printed whole.
        assert!(out.contains(&"a".repeat(64)), "{out}");
        assert!(!out.contains("tail hash"));
    }

    #[test]
    fn status_is_colored_only_when_asked() {
        let colored = broken().to_table(Style {
            color: true,
            width: None,
        });
        assert!(colored.contains("\u{1b}[31minvalid\u{1b}[0m"));
        assert!(!broken().to_table(PLAIN).contains('\u{1b}'));
    }

    #[test]
    fn explain_table_lists_contributions_by_impact() {
        let record = trace_core::append(GENESIS_HASH, sample_fields(0)).unwrap();
        let response = ExplainResponse::new(0, &record, ChainStatus::Valid);
        let out = response.to_table(PLAIN);

        let events_row = out.find("gaming_events").unwrap();
        let searches_row = out.find("searches").unwrap();
        assert!(events_row < searches_row, "{out}");
        assert!(out.contains("interactions in gaming category"));
        assert!(out.contains("decreases"));
        assert!(out.contains(&response.summary));
    }

    #[test]
    fn shown_record_keeps_extra_keys_and_stored_feature_order() {
        let mut record = trace_core::append(GENESIS_HASH, sample_fields(1)).unwrap();
        record
            .extra
            .insert("model_version".into(), serde_json::json!("v2"));
        let out = record.to_table(PLAIN);
        assert!(out.contains("model_version"), "{out}");
        assert!(out.contains(&record.hash));
        assert!(out.contains("smartphone_events"));
    }

    #[test]
    fn empty_lists_have_placeholders() {
        assert_eq!(Vec::<DecisionSummary>::new().to_table(PLAIN), "(no decisions)");
        assert_eq!(Vec::<UserSummary>::new().to_table(PLAIN), "(no users)");
    }

    #[test]
    fn users_render_as_grid() {
        let users = vec![
            UserSummary {
                user_id: "U000".into(),
                decisions: 3,
            },
            UserSummary {
                user_id: "U001".into(),
                decisions: 2,
            },
        ];
        let out = users.to_table(PLAIN);
        assert_eq!(out.lines().count(), 4);
        assert!(out.starts_with("user  decisions"));
    }
}
