//! Sequential ledger reader.
//!
//! Lines are decoded one at a time so a malformed record can be reported by
//! its 1-based line number. Blank lines (including a trailing newline) are
//! skipped. Decoding does not verify the chain; pass the result to
//! [`trace_core::verify_chain`] for that.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use trace_core::DecisionRecord;

use crate::error::LedgerError;

/// Read every record in the ledger at `path`, in file order.
///
/// # Errors
///
/// Returns [`LedgerError::NotFound`] if the file does not exist,
/// [`LedgerError::Io`] on other filesystem failures, and
/// [`LedgerError::Parse`] for the first line that is not a valid record.
pub fn read_ledger(path: &Path) -> Result<Vec<DecisionRecord>, LedgerError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(LedgerError::NotFound(path.to_path_buf()));
        }
        Err(e) => return Err(LedgerError::io(path, e)),
    };

    let records = parse_lines(BufReader::new(file), path)?;
    tracing::debug!(path = %path.display(), records = records.len(), "ledger loaded");
    Ok(records)
}

fn parse_lines(reader: impl BufRead, path: &Path) -> Result<Vec<DecisionRecord>, LedgerError> {
    let mut records = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| LedgerError::io(path, e))?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str::<DecisionRecord>(&line).map_err(|e| {
            LedgerError::Parse {
                line: index + 1,
                reason: e.to_string(),
            }
        })?;
        records.push(record);
    }
    Ok(records)
}
