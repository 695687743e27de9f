//! Signal pipeline: the single orchestration point for one trading signal.
//!
//! For each signal, in order: fresh `signal_id` → kill-switch gate → the
//! full pre-trade battery (with its decision audit entry) → order creation →
//! broker submission — each step fully audited before the response is
//! produced. Fills and cancellations arrive out of band and are applied
//! through [`SignalPipeline::apply_fill`] / [`SignalPipeline::cancel_order`].
//!
//! The pipeline holds references only downward (constructor injection) and
//! performs no locking of its own: each order belongs to one pipeline flow,
//! and callers serialize per-order updates.

use std::fmt;

use qg_audit::{AuditError, Decision, DecisionLog, TradeLog};
use qg_execution::{
    CancelError, Fill, FillProcessor, Order, OrderRouter, RouterError, TransitionError,
};
use qg_halt::KillSwitch;
use qg_risk::PreTradeRiskChecker;
use qg_schemas::{SignalResponse, SignalStatus, TradingSignal};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

const HALT_MESSAGE: &str = "Kill switch is active - trading halted";

// ---------------------------------------------------------------------------
// PipelineError
// ---------------------------------------------------------------------------

/// The pipeline itself failed — as opposed to a signal being rejected,
/// which is a normal [`SignalResponse`].
#[derive(Debug)]
pub enum PipelineError {
    /// An audit entry could not be written. Audit completeness dominates:
    /// the pipeline stops rather than trade unaudited.
    Audit(AuditError),
    /// An order record was driven through an illegal transition — a bug.
    State(TransitionError),
    /// Cancellation failed at the broker.
    Cancel(CancelError),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Audit(e) => write!(f, "{e}"),
            PipelineError::State(e) => write!(f, "{e}"),
            PipelineError::Cancel(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for PipelineError {}

impl From<AuditError> for PipelineError {
    fn from(e: AuditError) -> Self {
        PipelineError::Audit(e)
    }
}

// ---------------------------------------------------------------------------
// FillDisposition
// ---------------------------------------------------------------------------

/// What happened to an out-of-band fill.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FillDisposition {
    Applied,
    /// The fill did not correspond to the order; it was discarded, the
    /// order unchanged, and the discard audited.
    Discarded(String),
}

// ---------------------------------------------------------------------------
// SignalPipeline
// ---------------------------------------------------------------------------

/// Orchestrates one signal end to end.
pub struct SignalPipeline {
    kill_switch: KillSwitch,
    risk: PreTradeRiskChecker,
    router: OrderRouter,
    decisions: DecisionLog,
    trades: TradeLog,
}

impl SignalPipeline {
    pub fn new(
        kill_switch: KillSwitch,
        risk: PreTradeRiskChecker,
        router: OrderRouter,
        decisions: DecisionLog,
        trades: TradeLog,
    ) -> Self {
        Self {
            kill_switch,
            risk,
            router,
            decisions,
            trades,
        }
    }

    pub fn kill_switch(&self) -> &KillSwitch {
        &self.kill_switch
    }

    /// Process one validated signal.
    ///
    /// Returns the caller-facing response; `Err` only for audit or state
    /// failures, never for an ordinary rejection.
    pub async fn process_signal(
        &self,
        signal: &TradingSignal,
    ) -> Result<SignalResponse, PipelineError> {
        let signal_id = Uuid::new_v4().to_string();

        // 1. Kill-switch gate: checked before any other work.
        if self.kill_switch.is_active().await {
            let halt_reason = self.kill_switch.status().await.reason;
            warn!(signal_id = %signal_id, reason = ?halt_reason, "signal refused: trading halted");
            self.decisions
                .log_decision(
                    &signal_id,
                    &signal.strategy_id,
                    &signal.symbol,
                    Decision::Rejected,
                    json!({"kill_switch": {"valid": false, "error": HALT_MESSAGE}}),
                    &[HALT_MESSAGE.to_string()],
                    json!({"halt_reason": halt_reason}),
                )
                .await?;
            return Ok(SignalResponse::rejected(
                signal_id,
                HALT_MESSAGE,
                vec![HALT_MESSAGE.to_string()],
            ));
        }

        // 2. Full risk battery, always fully recorded.
        let report = self.risk.run_all_checks(signal).await;
        let decision = if report.approved {
            Decision::Approved
        } else {
            Decision::Rejected
        };
        self.decisions
            .log_decision(
                &signal_id,
                &signal.strategy_id,
                &signal.symbol,
                decision,
                report.check_results(),
                &report.errors,
                json!({}),
            )
            .await?;

        if !report.approved {
            info!(
                signal_id = %signal_id,
                strategy_id = %signal.strategy_id,
                failures = report.errors.len(),
                "signal rejected by risk checks"
            );
            return Ok(SignalResponse::rejected(
                signal_id,
                "Signal rejected by risk checks",
                report.errors,
            ));
        }

        // 3. Order creation: quantity carries the USD target exposure, the
        // notional applies the signal's cap.
        let mut order = Order::new(
            signal.strategy_id.clone(),
            signal.symbol.clone(),
            signal.side,
            signal.target_exposure,
            signal.order_notional(),
        );

        let signal_json =
            serde_json::to_value(signal).map_err(|e| AuditError::Serialize(e.to_string()))?;
        self.trades.log_order_created(&order, signal_json).await?;

        // 4. Broker submission. A failed submit leaves the order REJECTED
        // (the broker never acknowledged it) and is user-visible.
        match self.router.submit_order(&mut order, signal).await {
            Ok(()) => {
                let broker_order_id = order.broker_order_id.clone().unwrap_or_default();
                self.trades.log_order_submitted(&order, &broker_order_id).await?;
                Ok(SignalResponse {
                    signal_id,
                    order_id: Some(order.order_id),
                    status: SignalStatus::Approved,
                    message: "Signal processed and order submitted".to_string(),
                    errors: vec![],
                })
            }
            Err(RouterError::State(e)) => Err(PipelineError::State(e)),
            Err(e) => {
                let reason = e.to_string();
                self.trades.log_order_rejected(&order, &reason).await?;
                Ok(SignalResponse {
                    signal_id,
                    order_id: Some(order.order_id),
                    status: SignalStatus::Rejected,
                    message: format!("Order submission failed: {reason}"),
                    errors: vec![reason],
                })
            }
        }
    }

    /// Apply an out-of-band broker fill to an order.
    ///
    /// A fill that does not correspond to the order (wrong symbol or broker
    /// id, non-positive quantity or price) is discarded, the order left
    /// unchanged, and the discard audited. Overfills are clamped by the
    /// fill processor, not discarded. An applied fill emits ORDER_FILLED.
    pub async fn apply_fill(
        &self,
        order: &mut Order,
        fill: &Fill,
    ) -> Result<FillDisposition, PipelineError> {
        if let Err(e) = FillProcessor::apply(order, fill) {
            return match e {
                qg_execution::FillError::Transition(t) => Err(PipelineError::State(t)),
                mismatch => {
                    let reason = mismatch.to_string();
                    warn!(order_id = %order.order_id, reason = %reason, "fill discarded");
                    self.trades.log_fill_discarded(order, fill, &reason).await?;
                    Ok(FillDisposition::Discarded(reason))
                }
            };
        }

        self.trades.log_order_filled(order, fill).await?;
        Ok(FillDisposition::Applied)
    }

    /// Cancel an order, auditing on success.
    ///
    /// Returns `Ok(false)` when the broker reports the order already
    /// terminal on its side.
    pub async fn cancel_order(
        &self,
        order: &mut Order,
        reason: Option<&str>,
    ) -> Result<bool, PipelineError> {
        let cancelled = self
            .router
            .cancel_order(order)
            .await
            .map_err(PipelineError::Cancel)?;
        if cancelled {
            self.trades.log_order_cancelled(order, reason).await?;
        }
        Ok(cancelled)
    }
}
