//! Broker adapter boundary.
//!
//! The minimal capability set every broker integration must provide, plus
//! optional option-trading capabilities that default to
//! [`BrokerError::Unsupported`]. Adapters must satisfy two invariants:
//!
//! - `submit_order` returns a unique, non-empty identifier on success;
//!   failures surface as a tagged [`BrokerError`] kind.
//! - `cancel_order` returns `Ok(false)` (not an error) for orders already in
//!   a terminal state at the broker; errors are reserved for transport or
//!   broker failure.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use qg_schemas::Side;
use serde::{Deserialize, Serialize};

use crate::fills::Fill;
use crate::option_fill::OptionFill;
use crate::option_order::OptionLeg;
use crate::order::OrderStatus;

// ---------------------------------------------------------------------------
// OrderType
// ---------------------------------------------------------------------------

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    Market,
    Limit,
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderType::Market => write!(f, "MARKET"),
            OrderType::Limit => write!(f, "LIMIT"),
        }
    }
}

// ---------------------------------------------------------------------------
// BrokerError
// ---------------------------------------------------------------------------

/// Tagged error kinds a broker adapter may surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrokerError {
    /// Transport failure reaching the broker. The caller decides on retry;
    /// the core never retries.
    Connection(String),
    /// The broker refused or could not process the order.
    Order(String),
    /// The adapter does not implement the requested capability.
    Unsupported(&'static str),
}

impl fmt::Display for BrokerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BrokerError::Connection(msg) => write!(f, "broker connection error: {msg}"),
            BrokerError::Order(msg) => write!(f, "broker order error: {msg}"),
            BrokerError::Unsupported(what) => {
                write!(f, "{what} not supported by this broker")
            }
        }
    }
}

impl std::error::Error for BrokerError {}

// ---------------------------------------------------------------------------
// Status record
// ---------------------------------------------------------------------------

/// Broker-side view of an order, served by `get_order_status`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BrokerOrderRecord {
    pub broker_order_id: String,
    pub symbol: String,
    pub side: Side,
    pub quantity: f64,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub filled_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// BrokerAdapter
// ---------------------------------------------------------------------------

/// Capability interface over a brokerage.
///
/// Object-safe: routers hold `Arc<dyn BrokerAdapter>` and never know the
/// concrete integration. Option capabilities are optional; the defaults
/// return [`BrokerError::Unsupported`] so equity-only adapters need not
/// mention them.
#[async_trait]
pub trait BrokerAdapter: Send + Sync {
    /// Stable broker identifier (e.g. `"PAPER"`).
    fn name(&self) -> &'static str;

    /// Submit an equity order; returns the broker's order id.
    async fn submit_order(
        &self,
        symbol: &str,
        side: Side,
        quantity: f64,
        order_type: OrderType,
    ) -> Result<String, BrokerError>;

    /// Cancel an order. `Ok(false)` when the order is already terminal at
    /// the broker.
    async fn cancel_order(&self, broker_order_id: &str) -> Result<bool, BrokerError>;

    /// Current broker-side status of an order.
    async fn get_order_status(
        &self,
        broker_order_id: &str,
    ) -> Result<BrokerOrderRecord, BrokerError>;

    /// Fills recorded for an order so far.
    async fn get_fills(&self, broker_order_id: &str) -> Result<Vec<Fill>, BrokerError>;

    /// Submit a single-leg option order.
    async fn submit_option_order(
        &self,
        leg: &OptionLeg,
        limit_price: Option<f64>,
    ) -> Result<String, BrokerError> {
        let _ = (leg, limit_price);
        Err(BrokerError::Unsupported("option orders"))
    }

    /// Submit a multi-leg spread for atomic execution.
    async fn submit_option_spread(
        &self,
        legs: &[OptionLeg],
        limit_price: Option<f64>,
    ) -> Result<String, BrokerError> {
        let _ = (legs, limit_price);
        Err(BrokerError::Unsupported("option spreads"))
    }

    /// Option fills recorded for an order so far.
    async fn get_option_fills(
        &self,
        broker_order_id: &str,
    ) -> Result<Vec<OptionFill>, BrokerError> {
        let _ = broker_order_id;
        Err(BrokerError::Unsupported("option fills"))
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    /// Equity-only adapter relying on the optional-capability defaults.
    struct EquityOnlyBroker;

    #[async_trait]
    impl BrokerAdapter for EquityOnlyBroker {
        fn name(&self) -> &'static str {
            "equity-only"
        }

        async fn submit_order(
            &self,
            _symbol: &str,
            _side: Side,
            _quantity: f64,
            _order_type: OrderType,
        ) -> Result<String, BrokerError> {
            Ok("b-1".to_string())
        }

        async fn cancel_order(&self, _broker_order_id: &str) -> Result<bool, BrokerError> {
            Ok(true)
        }

        async fn get_order_status(
            &self,
            broker_order_id: &str,
        ) -> Result<BrokerOrderRecord, BrokerError> {
            Err(BrokerError::Order(format!("order not found: {broker_order_id}")))
        }

        async fn get_fills(&self, _broker_order_id: &str) -> Result<Vec<Fill>, BrokerError> {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn option_capabilities_default_to_unsupported() {
        use crate::option_order::OptionType;
        use chrono::NaiveDate;

        let broker: Arc<dyn BrokerAdapter> = Arc::new(EquityOnlyBroker);
        let leg = OptionLeg {
            underlying: "AAPL".to_string(),
            option_type: OptionType::Call,
            strike: 175.0,
            expiration: NaiveDate::from_ymd_opt(2027, 1, 15).unwrap(),
            side: Side::Buy,
            quantity: 1,
            contract_multiplier: 100,
        };

        let err = broker.submit_option_order(&leg, None).await.unwrap_err();
        assert_eq!(err, BrokerError::Unsupported("option orders"));
        assert_eq!(
            err.to_string(),
            "option orders not supported by this broker"
        );

        let err = broker
            .submit_option_spread(std::slice::from_ref(&leg), None)
            .await
            .unwrap_err();
        assert_eq!(err, BrokerError::Unsupported("option spreads"));
    }

    #[test]
    fn error_display_is_tagged_by_kind() {
        assert_eq!(
            BrokerError::Connection("timeout".to_string()).to_string(),
            "broker connection error: timeout"
        );
        assert_eq!(
            BrokerError::Order("insufficient buying power".to_string()).to_string(),
            "broker order error: insufficient buying power"
        );
    }

    #[test]
    fn order_type_displays_wire_form() {
        assert_eq!(OrderType::Market.to_string(), "MARKET");
        assert_eq!(OrderType::Limit.to_string(), "LIMIT");
    }
}
