//! Order lifecycle audit entries.
//!
//! One entry per event, `event` ∈ {ORDER_CREATED, ORDER_SUBMITTED,
//! ORDER_FILLED, ORDER_CANCELLED, ORDER_REJECTED} plus FILL_DISCARDED for
//! fills that failed validation and OPTION_ASSIGNMENT / OPTION_EXERCISE for
//! lifecycle notifications.

use std::sync::Arc;

use serde_json::{json, Value};

use qg_execution::{Fill, LifecycleKind, OptionLifecycleEvent, Order};

use crate::sink::{AuditError, AuditSink};

/// Emits one immutable entry per order lifecycle event.
pub struct TradeLog {
    sink: Arc<dyn AuditSink>,
}

impl TradeLog {
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self { sink }
    }

    /// ORDER_CREATED with the serialized originating signal.
    pub async fn log_order_created(&self, order: &Order, signal: Value) -> Result<(), AuditError> {
        self.sink
            .append(json!({
                "event": "ORDER_CREATED",
                "order_id": order.order_id,
                "strategy_id": order.strategy_id,
                "symbol": order.symbol,
                "side": order.side.to_string(),
                "quantity": order.quantity,
                "notional": order.notional,
                "status": order.status,
                "signal": signal,
            }))
            .await
    }

    pub async fn log_order_submitted(
        &self,
        order: &Order,
        broker_order_id: &str,
    ) -> Result<(), AuditError> {
        self.sink
            .append(json!({
                "event": "ORDER_SUBMITTED",
                "order_id": order.order_id,
                "broker_order_id": broker_order_id,
                "strategy_id": order.strategy_id,
                "symbol": order.symbol,
            }))
            .await
    }

    /// ORDER_FILLED carrying both the fill and the cumulative order state.
    pub async fn log_order_filled(&self, order: &Order, fill: &Fill) -> Result<(), AuditError> {
        self.sink
            .append(json!({
                "event": "ORDER_FILLED",
                "order_id": order.order_id,
                "broker_order_id": order.broker_order_id,
                "strategy_id": order.strategy_id,
                "symbol": order.symbol,
                "side": order.side.to_string(),
                "fill_quantity": fill.quantity,
                "fill_price": fill.price,
                "fill_notional": fill.notional(),
                "total_filled_quantity": order.filled_quantity,
                "total_filled_notional": order.filled_notional,
                "average_fill_price": order.average_fill_price,
                "status": order.status,
            }))
            .await
    }

    pub async fn log_order_cancelled(
        &self,
        order: &Order,
        reason: Option<&str>,
    ) -> Result<(), AuditError> {
        self.sink
            .append(json!({
                "event": "ORDER_CANCELLED",
                "order_id": order.order_id,
                "broker_order_id": order.broker_order_id,
                "strategy_id": order.strategy_id,
                "symbol": order.symbol,
                "reason": reason,
            }))
            .await
    }

    pub async fn log_order_rejected(&self, order: &Order, reason: &str) -> Result<(), AuditError> {
        self.sink
            .append(json!({
                "event": "ORDER_REJECTED",
                "order_id": order.order_id,
                "strategy_id": order.strategy_id,
                "symbol": order.symbol,
                "reason": reason,
            }))
            .await
    }

    /// A fill failed validation against its order and was discarded; the
    /// order is unchanged.
    pub async fn log_fill_discarded(
        &self,
        order: &Order,
        fill: &Fill,
        reason: &str,
    ) -> Result<(), AuditError> {
        self.sink
            .append(json!({
                "event": "FILL_DISCARDED",
                "order_id": order.order_id,
                "broker_order_id": fill.broker_order_id,
                "strategy_id": order.strategy_id,
                "symbol": fill.symbol,
                "fill_quantity": fill.quantity,
                "fill_price": fill.price,
                "reason": reason,
            }))
            .await
    }

    /// Assignment / exercise notification. Informational — the core never
    /// mutates portfolio state from these.
    pub async fn log_option_lifecycle(
        &self,
        event: &OptionLifecycleEvent,
    ) -> Result<(), AuditError> {
        let name = match event.kind {
            LifecycleKind::Assignment => "OPTION_ASSIGNMENT",
            LifecycleKind::Exercise => "OPTION_EXERCISE",
        };
        self.sink
            .append(json!({
                "event": name,
                "event_id": event.event_id,
                "contract_symbol": event.contract_symbol,
                "quantity": event.quantity,
                "price": event.price,
            }))
            .await
    }
}
