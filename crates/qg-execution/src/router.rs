//! Equity order routing.
//!
//! The router is the deterministic boundary between the pipeline and broker
//! adapters: it selects a broker, delegates, and applies the resulting state
//! transition to the order. It carries no business logic of its own —
//! routing richer than "default broker" is an extension point.
//!
//! Submission failure semantics: an order whose submission fails never
//! reached the broker, so it moves PENDING → REJECTED with the broker error
//! as `rejection_reason`. FAILED is reserved for orders the broker had
//! already acknowledged.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use qg_schemas::TradingSignal;
use tracing::{info, warn};

use crate::broker::{BrokerAdapter, BrokerError, OrderType};
use crate::order::{Order, OrderStatus, TransitionError};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Submission failed; the order has been moved to REJECTED.
#[derive(Debug)]
pub enum RouterError {
    Broker(BrokerError),
    /// Contract validation refused the order before any broker contact.
    Validation(String),
    /// The order was not in a submittable state — a caller bug.
    State(TransitionError),
}

impl fmt::Display for RouterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouterError::Broker(e) => write!(f, "{e}"),
            RouterError::Validation(msg) => write!(f, "{msg}"),
            RouterError::State(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for RouterError {}

/// Cancellation could not proceed.
#[derive(Debug)]
pub enum CancelError {
    /// The order is already terminal.
    Terminal(OrderStatus),
    /// The order has no broker id (never submitted).
    NotSubmitted,
    Broker(BrokerError),
    State(TransitionError),
}

impl fmt::Display for CancelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelError::Terminal(s) => {
                write!(f, "cannot cancel order in terminal state: {s}")
            }
            CancelError::NotSubmitted => write!(f, "order not yet submitted to broker"),
            CancelError::Broker(e) => write!(f, "{e}"),
            CancelError::State(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for CancelError {}

// ---------------------------------------------------------------------------
// OrderRouter
// ---------------------------------------------------------------------------

/// Stateless equity order router.
pub struct OrderRouter {
    default_broker: Arc<dyn BrokerAdapter>,
    brokers: HashMap<String, Arc<dyn BrokerAdapter>>,
}

impl OrderRouter {
    pub fn new(default_broker: Arc<dyn BrokerAdapter>) -> Self {
        Self {
            default_broker,
            brokers: HashMap::new(),
        }
    }

    /// Register an additional broker under an id for future routing rules.
    pub fn register_broker(&mut self, broker_id: impl Into<String>, broker: Arc<dyn BrokerAdapter>) {
        self.brokers.insert(broker_id.into(), broker);
    }

    /// Lookup a registered broker by id.
    pub fn broker_by_id(&self, broker_id: &str) -> Option<&Arc<dyn BrokerAdapter>> {
        self.brokers.get(broker_id)
    }

    /// Broker selection. Reference behavior: always the default broker;
    /// symbol/strategy-aware routing plugs in here.
    pub fn broker_for(&self, _signal: &TradingSignal) -> &Arc<dyn BrokerAdapter> {
        &self.default_broker
    }

    /// Submit a PENDING order.
    ///
    /// On success the order is SUBMITTED and carries the broker's order id.
    /// On failure the order is REJECTED with the broker error recorded, and
    /// the error is returned.
    pub async fn submit_order(
        &self,
        order: &mut Order,
        signal: &TradingSignal,
    ) -> Result<(), RouterError> {
        let broker = self.broker_for(signal);

        match broker
            .submit_order(&order.symbol, order.side, order.quantity, OrderType::Market)
            .await
        {
            Ok(broker_order_id) => {
                order.broker_order_id = Some(broker_order_id.clone());
                order.transition(OrderStatus::Submitted).map_err(RouterError::State)?;
                info!(
                    order_id = %order.order_id,
                    broker = broker.name(),
                    broker_order_id = %broker_order_id,
                    "order submitted"
                );
                Ok(())
            }
            Err(e) => {
                warn!(order_id = %order.order_id, error = %e, "order submission failed");
                order.reject(e.to_string()).map_err(RouterError::State)?;
                Err(RouterError::Broker(e))
            }
        }
    }

    /// Cancel a live order.
    ///
    /// Refuses terminal or never-submitted orders. Returns `Ok(false)` when
    /// the broker reports the order already terminal on its side; the local
    /// record is left untouched in that case.
    pub async fn cancel_order(&self, order: &mut Order) -> Result<bool, CancelError> {
        if order.is_terminal() {
            return Err(CancelError::Terminal(order.status));
        }
        let Some(broker_order_id) = order.broker_order_id.clone() else {
            return Err(CancelError::NotSubmitted);
        };

        let cancelled = self
            .default_broker
            .cancel_order(&broker_order_id)
            .await
            .map_err(CancelError::Broker)?;

        if cancelled {
            order.transition(OrderStatus::Cancelled).map_err(CancelError::State)?;
            info!(order_id = %order.order_id, "order cancelled");
        }
        Ok(cancelled)
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
