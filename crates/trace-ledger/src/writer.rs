//! JSONL ledger writer.
//!
//! Appends hash-chained records to a single ledger file using
//! `serde_jsonlines::append_json_lines`. The writer is the only place the
//! chain tip lives between appends.

use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use trace_core::{DecisionFields, DecisionRecord, Verification};

use crate::error::LedgerError;
use crate::lock::WriteLock;
use crate::reader::read_ledger;

/// Appends decisions to one ledger file.
///
/// Opening loads and verifies the existing ledger; a writer is never built
/// on top of a broken chain. One writer per ledger file at a time: use
/// [`LedgerWriter::open_locked`] when other processes may append too.
#[derive(Debug)]
pub struct LedgerWriter {
    path: PathBuf,
    tail_hash: String,
    len: usize,
    decision_ids: HashSet<String>,
    /// The file's last line has no terminator yet.
    unterminated: bool,
    lock: Option<WriteLock>,
}

impl LedgerWriter {
    /// Open the ledger at `path` for appending.
    ///
    /// A missing file is treated as an empty ledger; it is created on the
    /// first append.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Corrupted`] if the existing ledger fails
    /// verification, or any error from [`read_ledger`] other than
    /// `NotFound`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, LedgerError> {
        Self::open_inner(path.into(), None)
    }

    /// Acquire the write lock for `path`, then open it.
    ///
    /// The lock is held for the lifetime of the writer.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::LockTimeout`] if the lock is not obtained
    /// within `lock_timeout`, otherwise the same errors as [`Self::open`].
    pub fn open_locked(
        path: impl Into<PathBuf>,
        lock_timeout: Duration,
    ) -> Result<Self, LedgerError> {
        let path = path.into();
        let lock = WriteLock::acquire(&path, lock_timeout)?;
        Self::open_inner(path, Some(lock))
    }

    fn open_inner(path: PathBuf, lock: Option<WriteLock>) -> Result<Self, LedgerError> {
        let records = match read_ledger(&path) {
            Ok(records) => records,
            Err(LedgerError::NotFound(_)) => Vec::new(),
            Err(e) => return Err(e),
        };

        if let Verification::Invalid(brk) = trace_core::verify_chain(&records) {
            tracing::warn!(path = %path.display(), %brk, "refusing to open corrupted ledger");
            return Err(LedgerError::Corrupted(brk));
        }

        let unterminated = ends_unterminated(&path)?;
        let tail_hash = trace_core::tail_hash(&records).to_string();
        let decision_ids = records.iter().map(|r| r.decision_id.clone()).collect();
        tracing::debug!(
            path = %path.display(),
            records = records.len(),
            tail = %tail_hash,
            "ledger opened for append"
        );

        Ok(Self {
            path,
            tail_hash,
            len: records.len(),
            decision_ids,
            unterminated,
            lock,
        })
    }

    /// Chain `fields` onto the current tail and persist the record.
    ///
    /// Returns the stored record. The tail only advances once the line has
    /// been written.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::DuplicateDecision`] if the decision id is
    /// already recorded, [`LedgerError::Core`] if the fields are rejected by
    /// the chain engine, or [`LedgerError::Io`] if the write fails.
    pub fn append(&mut self, fields: DecisionFields) -> Result<DecisionRecord, LedgerError> {
        if self.decision_ids.contains(&fields.decision_id) {
            return Err(LedgerError::DuplicateDecision(fields.decision_id));
        }

        let record = trace_core::append(&self.tail_hash, fields)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| LedgerError::io(parent, e))?;
        }
        if self.unterminated {
            // Otherwise the new line would be glued onto the last record.
            OpenOptions::new()
                .append(true)
                .open(&self.path)
                .and_then(|mut file| file.write_all(b"\n"))
                .map_err(|e| LedgerError::io(&self.path, e))?;
            tracing::debug!(path = %self.path.display(), "terminated last ledger line");
            self.unterminated = false;
        }
        serde_jsonlines::append_json_lines(&self.path, [&record])
            .map_err(|e| LedgerError::io(&self.path, e))?;

        self.tail_hash.clone_from(&record.hash);
        self.len += 1;
        self.decision_ids.insert(record.decision_id.clone());
        tracing::debug!(
            decision_id = %record.decision_id,
            position = self.len - 1,
            "decision appended"
        );
        Ok(record)
    }

    /// Hash of the last stored record, or the genesis sentinel.
    #[must_use]
    pub fn tail_hash(&self) -> &str {
        &self.tail_hash
    }

    /// Number of records in the ledger.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether the ledger holds no records yet.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether `decision_id` is already recorded.
    #[must_use]
    pub fn contains(&self, decision_id: &str) -> bool {
        self.decision_ids.contains(decision_id)
    }

    /// Whether this writer holds the ledger's write lock.
    #[must_use]
    pub const fn is_locked(&self) -> bool {
        self.lock.is_some()
    }

    /// The ledger file this writer appends to.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Whether `path` is non-empty and its last byte is not a newline.
fn ends_unterminated(path: &Path) -> Result<bool, LedgerError> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(LedgerError::io(path, e)),
    };
    let len = file
        .metadata()
        .map_err(|e| LedgerError::io(path, e))?
        .len();
    if len == 0 {
        return Ok(false);
    }
    let mut last = [0u8; 1];
    file.seek(SeekFrom::End(-1))
        .and_then(|_| file.read_exact(&mut last))
        .map_err(|e| LedgerError::io(path, e))?;
    Ok(last[0] != b'\n')
}
