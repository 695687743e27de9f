//! Equity fill application.
//!
//! Fills originate from a broker and are applied exactly once. Application
//! clamps cumulative quantities at the order's totals so a fractional
//! overfill from a broker never propagates into downstream accounting.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::order::{Order, OrderStatus, TransitionError};

// ---------------------------------------------------------------------------
// Fill
// ---------------------------------------------------------------------------

/// A trade fill reported by a broker. Immutable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub fill_id: String,
    pub broker_order_id: String,
    pub symbol: String,
    pub quantity: f64,
    pub price: f64,
    pub timestamp: DateTime<Utc>,
}

impl Fill {
    pub fn new(
        broker_order_id: impl Into<String>,
        symbol: impl Into<String>,
        quantity: f64,
        price: f64,
    ) -> Self {
        Self {
            fill_id: format!("fill_{}", short_id()),
            broker_order_id: broker_order_id.into(),
            symbol: symbol.into(),
            quantity,
            price,
            timestamp: Utc::now(),
        }
    }

    /// Notional value of this fill.
    pub fn notional(&self) -> f64 {
        self.quantity * self.price
    }
}

pub(crate) fn short_id() -> String {
    let id = Uuid::new_v4().simple().to_string();
    id[..8].to_string()
}

// ---------------------------------------------------------------------------
// FillError
// ---------------------------------------------------------------------------

/// A fill does not correspond to its order, or cannot legally be applied.
///
/// The fill is discarded and the order left unchanged; callers record the
/// discard in the audit stream.
#[derive(Debug, Clone, PartialEq)]
pub enum FillError {
    SymbolMismatch { fill: String, order: String },
    BrokerOrderMismatch,
    ExceedsRemaining { fill_qty: f64, remaining: f64 },
    NonPositiveQuantity(f64),
    NonPositivePrice(f64),
    Transition(TransitionError),
}

impl fmt::Display for FillError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FillError::SymbolMismatch { fill, order } => {
                write!(f, "Symbol mismatch: {fill} != {order}")
            }
            FillError::BrokerOrderMismatch => write!(f, "Broker order ID mismatch"),
            FillError::ExceedsRemaining { fill_qty, remaining } => write!(
                f,
                "Fill quantity exceeds remaining order quantity: {fill_qty} > {remaining}"
            ),
            FillError::NonPositiveQuantity(q) => write!(f, "Fill quantity must be positive: {q}"),
            FillError::NonPositivePrice(p) => write!(f, "Fill price must be positive: {p}"),
            FillError::Transition(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for FillError {}

impl From<TransitionError> for FillError {
    fn from(e: TransitionError) -> Self {
        FillError::Transition(e)
    }
}

// ---------------------------------------------------------------------------
// FillProcessor
// ---------------------------------------------------------------------------

/// Applies broker fills to equity orders.
pub struct FillProcessor;

impl FillProcessor {
    /// Pure predicate: would this fill be legitimate for this order?
    pub fn validate(fill: &Fill, order: &Order) -> Result<(), FillError> {
        if fill.symbol != order.symbol {
            return Err(FillError::SymbolMismatch {
                fill: fill.symbol.clone(),
                order: order.symbol.clone(),
            });
        }
        if order.broker_order_id.as_deref() != Some(fill.broker_order_id.as_str()) {
            return Err(FillError::BrokerOrderMismatch);
        }
        if fill.quantity <= 0.0 {
            return Err(FillError::NonPositiveQuantity(fill.quantity));
        }
        let remaining = order.quantity - order.filled_quantity;
        if fill.quantity > remaining {
            return Err(FillError::ExceedsRemaining {
                fill_qty: fill.quantity,
                remaining,
            });
        }
        if fill.price <= 0.0 {
            return Err(FillError::NonPositivePrice(fill.price));
        }
        Ok(())
    }

    /// Apply a fill, updating quantities, status, and the weighted average
    /// fill price.
    ///
    /// Cumulative `filled_quantity`/`filled_notional` are clamped at the
    /// order's `quantity`/`notional` when the fill completes the order.
    pub fn apply(order: &mut Order, fill: &Fill) -> Result<(), FillError> {
        if fill.symbol != order.symbol {
            return Err(FillError::SymbolMismatch {
                fill: fill.symbol.clone(),
                order: order.symbol.clone(),
            });
        }
        if order.broker_order_id.as_deref() != Some(fill.broker_order_id.as_str()) {
            return Err(FillError::BrokerOrderMismatch);
        }
        if fill.quantity <= 0.0 {
            return Err(FillError::NonPositiveQuantity(fill.quantity));
        }
        if fill.price <= 0.0 {
            return Err(FillError::NonPositivePrice(fill.price));
        }

        let new_filled = order.filled_quantity + fill.quantity;
        let new_notional = order.filled_notional + fill.notional();

        if new_filled >= order.quantity {
            order.transition(OrderStatus::Filled)?;
            order.filled_quantity = order.quantity;
            order.filled_notional = order.notional;
        } else {
            order.transition(OrderStatus::PartiallyFilled)?;
            order.filled_quantity = new_filled;
            order.filled_notional = new_notional;
        }

        if order.filled_quantity > 0.0 {
            order.average_fill_price = Some(order.filled_notional / order.filled_quantity);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
