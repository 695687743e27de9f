//! Option order routing.
//!
//! Mirrors the equity router contract for single-leg orders and spreads,
//! with one addition: contract validation runs before the broker is
//! contacted, and a validation failure REJECTS the order locally (REJECTED
//! always means the broker was never reached).

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};

use crate::broker::BrokerAdapter;
use crate::option_order::{OptionOrder, OptionSpreadOrder};
use crate::option_validate::OptionContractValidator;
use crate::order::OrderStatus;
use crate::router::{CancelError, RouterError};

/// Stateless option order router.
pub struct OptionOrderRouter {
    default_broker: Arc<dyn BrokerAdapter>,
    brokers: HashMap<String, Arc<dyn BrokerAdapter>>,
}

impl OptionOrderRouter {
    pub fn new(default_broker: Arc<dyn BrokerAdapter>) -> Self {
        Self {
            default_broker,
            brokers: HashMap::new(),
        }
    }

    pub fn register_broker(&mut self, broker_id: impl Into<String>, broker: Arc<dyn BrokerAdapter>) {
        self.brokers.insert(broker_id.into(), broker);
    }

    /// Lookup a registered broker by id.
    pub fn broker_by_id(&self, broker_id: &str) -> Option<&Arc<dyn BrokerAdapter>> {
        self.brokers.get(broker_id)
    }

    /// Submit a single-leg option order.
    ///
    /// Validation failure rejects the order locally with the validation
    /// message and never contacts the broker; broker failure rejects it
    /// with the broker error. Either way the error is returned.
    pub async fn submit_option_order(&self, order: &mut OptionOrder) -> Result<(), RouterError> {
        if let Err(e) = OptionContractValidator::validate_option_order(order) {
            warn!(order_id = %order.order_id, error = %e, "option order failed validation");
            order.reject(e.to_string()).map_err(RouterError::State)?;
            return Err(RouterError::Validation(e.to_string()));
        }

        match self
            .default_broker
            .submit_option_order(&order.leg, order.limit_price)
            .await
        {
            Ok(broker_order_id) => {
                order.broker_order_id = Some(broker_order_id.clone());
                order.transition(OrderStatus::Submitted).map_err(RouterError::State)?;
                info!(
                    order_id = %order.order_id,
                    contract = %order.leg.contract_symbol(),
                    broker_order_id = %broker_order_id,
                    "option order submitted"
                );
                Ok(())
            }
            Err(e) => {
                warn!(order_id = %order.order_id, error = %e, "option order submission failed");
                order.reject(e.to_string()).map_err(RouterError::State)?;
                Err(RouterError::Broker(e))
            }
        }
    }

    /// Submit a multi-leg spread for atomic execution.
    pub async fn submit_spread_order(
        &self,
        order: &mut OptionSpreadOrder,
    ) -> Result<(), RouterError> {
        if let Err(e) = OptionContractValidator::validate_spread_order(order) {
            warn!(order_id = %order.order_id, error = %e, "spread order failed validation");
            order.reject(e.to_string()).map_err(RouterError::State)?;
            return Err(RouterError::Validation(e.to_string()));
        }

        match self
            .default_broker
            .submit_option_spread(&order.legs, order.limit_price)
            .await
        {
            Ok(broker_order_id) => {
                order.broker_order_id = Some(broker_order_id.clone());
                order.transition(OrderStatus::Submitted).map_err(RouterError::State)?;
                info!(
                    order_id = %order.order_id,
                    legs = order.legs.len(),
                    broker_order_id = %broker_order_id,
                    "spread order submitted"
                );
                Ok(())
            }
            Err(e) => {
                warn!(order_id = %order.order_id, error = %e, "spread submission failed");
                order.reject(e.to_string()).map_err(RouterError::State)?;
                Err(RouterError::Broker(e))
            }
        }
    }

    /// Cancel a live option order.
    pub async fn cancel_option_order(&self, order: &mut OptionOrder) -> Result<bool, CancelError> {
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
        }
        Ok(cancelled)
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
