//! # trace-ledger
//!
//! On-disk storage for T-Trace decision ledgers.
//!
//! A ledger is a JSON Lines file holding one hash-chained
//! [`DecisionRecord`](trace_core::DecisionRecord) per line, in append order.
//! This crate owns everything that touches that file:
//! - Sequential reading with line-numbered parse errors
//! - A stateful writer that keeps the chain tip between appends
//! - A lock file that keeps writers to one ledger strictly serialized
//!
//! Hashing and verification live in `trace-core`; nothing here computes a
//! digest directly.

pub mod error;
pub mod lock;
pub mod reader;
pub mod writer;

pub use error::LedgerError;
pub use lock::{WriteLock, lock_path_for};
pub use reader::read_ledger;
pub use writer::LedgerWriter;
