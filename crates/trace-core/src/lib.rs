//! # trace-core
//!
//! Decision record model and hash-chain engine for T-Trace.
//!
//! This crate provides the pure, synchronous core shared by every T-Trace
//! crate:
//! - The decision record schema and its hashable projection
//! - Canonical JSON encoding used as hash input
//! - Chain append and full-replay verification
//! - SHAP contribution ranking for explanations
//! - CLI response types
//! - Cross-cutting error types
//!
//! No I/O happens here. Reading and writing ledger files belongs to
//! `trace-ledger`.

pub mod canonical;
pub mod chain;
pub mod errors;
pub mod explain;
pub mod record;
pub mod responses;

pub use chain::{
    BreakReason, ChainBreak, GENESIS_HASH, Verification, append, digest, tail_hash, verify_chain,
};
pub use errors::CoreError;
pub use record::{DecisionFields, DecisionRecord, HashPayload, ShapFeatures};
