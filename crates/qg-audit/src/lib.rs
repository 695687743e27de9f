//! Append-only audit stream.
//!
//! Every decision and order event becomes one canonical JSON line
//! (recursively sorted keys) with a top-level ISO-8601 UTC `timestamp`.
//! [`JsonlAuditSink`] optionally chains events with SHA-256 hashes so
//! tampering is detectable with [`verify_chain`]; [`MemoryAuditSink`]
//! retains entries for tests and read-back.

mod decision;
mod sink;
mod trade;

pub use decision::{Decision, DecisionLog};
pub use sink::{
    verify_chain, verify_chain_file, AuditError, AuditSink, JsonlAuditSink, MemoryAuditSink,
    VerifyResult,
};
pub use trade::TradeLog;
