//! Risk decision audit entries.

use std::fmt;
use std::sync::Arc;

use serde_json::{json, Value};

use crate::sink::{AuditError, AuditSink};

/// Terminal decision for one signal.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    Approved,
    Rejected,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Approved => write!(f, "APPROVED"),
            Decision::Rejected => write!(f, "REJECTED"),
        }
    }
}

/// Emits one immutable entry per risk decision.
pub struct DecisionLog {
    sink: Arc<dyn AuditSink>,
}

impl DecisionLog {
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self { sink }
    }

    /// Record a decision with the complete per-check map.
    #[allow(clippy::too_many_arguments)]
    pub async fn log_decision(
        &self,
        signal_id: &str,
        strategy_id: &str,
        symbol: &str,
        decision: Decision,
        check_results: Value,
        errors: &[String],
        metadata: Value,
    ) -> Result<(), AuditError> {
        self.sink
            .append(json!({
                "signal_id": signal_id,
                "strategy_id": strategy_id,
                "symbol": symbol,
                "decision": decision.to_string(),
                "check_results": check_results,
                "errors": errors,
                "metadata": metadata,
            }))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemoryAuditSink;

    #[tokio::test]
    async fn decision_entry_carries_full_context() {
        let sink = Arc::new(MemoryAuditSink::new());
        let log = DecisionLog::new(sink.clone());

        log.log_decision(
            "sig-1",
            "s1",
            "AAPL",
            Decision::Rejected,
            json!({"slippage": {"valid": false, "error": "too wide"}}),
            &["too wide".to_string()],
            json!({}),
        )
        .await
        .unwrap();

        let entries = sink.entries().await;
        assert_eq!(entries.len(), 1);
        let e = &entries[0];
        assert_eq!(e["decision"], "REJECTED");
        assert_eq!(e["signal_id"], "sig-1");
        assert_eq!(e["check_results"]["slippage"]["valid"], false);
        assert_eq!(e["errors"][0], "too wide");
        assert!(e["timestamp"].is_string());
    }
}
