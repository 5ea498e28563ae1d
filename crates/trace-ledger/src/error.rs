//! Ledger error types for trace-ledger.

use std::path::PathBuf;

use thiserror::Error;
use trace_core::{ChainBreak, CoreError};

/// Errors from reading, writing, or locking a ledger file.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The ledger file does not exist.
    #[error("Ledger not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Filesystem failure on the ledger or its lock file.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A line could not be decoded as a decision record.
    #[error("Malformed record on line {line}: {reason}")]
    Parse { line: usize, reason: String },

    /// The decision id already exists in the ledger.
    #[error("Decision '{0}' is already recorded in the ledger")]
    DuplicateDecision(String),

    /// The existing ledger fails verification; appending would extend a
    /// broken chain.
    #[error("Refusing to extend a corrupted ledger: {0}")]
    Corrupted(ChainBreak),

    /// Another writer kept the lock for longer than the configured wait.
    #[error("Timed out waiting for write lock at {}{}", .path.display(), holder_suffix(*.holder))]
    LockTimeout { path: PathBuf, holder: Option<u32> },

    /// Record construction failed in the chain engine.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Catch-all for unexpected errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl LedgerError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

fn holder_suffix(holder: Option<u32>) -> String {
    holder.map_or_else(String::new, |pid| format!(" (held by pid {pid})"))
}
