use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use trace_config::TraceConfig;
use trace_core::{DecisionRecord, Verification};
use trace_ledger::{LedgerError, LedgerWriter};

use crate::cli::GlobalFlags;

/// Shared application resources initialized once at startup.
#[derive(Debug)]
pub struct AppContext {
    pub config: TraceConfig,
    pub ledger_path: PathBuf,
}

/// A ledger snapshot read fully into memory.
#[derive(Debug)]
pub struct LoadedLedger {
    pub records: Vec<DecisionRecord>,
}

impl AppContext {
    /// Resolve the ledger path: `--ledger` wins over `ledger.path` in config.
    #[must_use]
    pub fn new(config: TraceConfig, ledger_override: Option<&Path>) -> Self {
        let ledger_path =
            ledger_override.map_or_else(|| config.ledger.path.clone(), Path::to_path_buf);
        Self {
            config,
            ledger_path,
        }
    }

    /// Read every record of the configured ledger.
    pub fn load_ledger(&self) -> anyhow::Result<LoadedLedger> {
        let records = trace_ledger::read_ledger(&self.ledger_path).with_context(|| {
            format!("failed to read ledger {}", self.ledger_path.display())
        })?;
        Ok(LoadedLedger { records })
    }

    /// Open the ledger for appending under its write lock.
    pub fn open_writer(&self) -> anyhow::Result<LedgerWriter> {
        LedgerWriter::open_locked(&self.ledger_path, self.lock_timeout()).map_err(|error| {
            let hint = match &error {
                LedgerError::LockTimeout { .. } => {
                    "; another append is running, or remove the lock file if no ttrace process is"
                }
                LedgerError::Corrupted(_) => "; run 'ttrace verify' for details",
                _ => "",
            };
            anyhow::Error::new(error).context(format!(
                "cannot append to {}{hint}",
                self.ledger_path.display()
            ))
        })
    }

    /// Row cap for listing commands.
    ///
    /// A command's own `--limit` beats the global flag, which beats
    /// `general.default_limit`. An explicit `0` lifts the cap.
    #[must_use]
    pub fn row_limit(&self, local: Option<u32>, flags: &GlobalFlags) -> usize {
        match local.or(flags.limit) {
            Some(0) => usize::MAX,
            limit => usize::try_from(limit.unwrap_or(self.config.general.default_limit))
                .unwrap_or(usize::MAX),
        }
    }

    const fn lock_timeout(&self) -> Duration {
        self.config.ledger.lock_timeout()
    }

    /// Display form of the ledger path for responses.
    #[must_use]
    pub fn ledger_display(&self) -> String {
        self.ledger_path.display().to_string()
    }
}

impl LoadedLedger {
    #[must_use]
    pub fn verify(&self) -> Verification {
        trace_core::verify_chain(&self.records)
    }

    /// Position and record of `decision_id`, if present.
    #[must_use]
    pub fn find(&self, decision_id: &str) -> Option<(usize, &DecisionRecord)> {
        self.records
            .iter()
            .enumerate()
            .find(|(_, record)| record.decision_id == decision_id)
    }

    /// Like [`Self::find`], but a missing decision is an error.
    pub fn require(&self, decision_id: &str) -> anyhow::Result<(usize, &DecisionRecord)> {
        self.find(decision_id)
            .with_context(|| format!("decision '{decision_id}' not found in ledger"))
    }
}
