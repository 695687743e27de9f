//! Option fill application and lifecycle notifications.
//!
//! Single-leg fills maintain a quantity-weighted average premium; spread
//! fills are applied one leg at a time, clamped at each leg's quantity, and
//! the spread is FILLED only when every leg reaches its full quantity.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::fills::short_id;
use crate::option_order::{OptionLeg, OptionOrder, OptionSpreadOrder};
use crate::order::{OrderStatus, TransitionError};

// ---------------------------------------------------------------------------
// OptionFill
// ---------------------------------------------------------------------------

/// An option fill reported by a broker. Immutable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OptionFill {
    pub fill_id: String,
    pub broker_order_id: String,
    pub contract_symbol: String,
    /// Contracts filled, strictly positive.
    pub quantity: u32,
    /// Premium per contract.
    pub price_per_contract: f64,
    pub timestamp: DateTime<Utc>,
}

impl OptionFill {
    pub fn new(
        broker_order_id: impl Into<String>,
        contract_symbol: impl Into<String>,
        quantity: u32,
        price_per_contract: f64,
    ) -> Self {
        Self {
            fill_id: format!("option_fill_{}", short_id()),
            broker_order_id: broker_order_id.into(),
            contract_symbol: contract_symbol.into(),
            quantity,
            price_per_contract,
            timestamp: Utc::now(),
        }
    }

    /// Fill notional at the given contract multiplier.
    pub fn notional(&self, contract_multiplier: u32) -> f64 {
        self.price_per_contract * self.quantity as f64 * contract_multiplier as f64
    }
}

// ---------------------------------------------------------------------------
// OptionFillError
// ---------------------------------------------------------------------------

/// An option fill does not correspond to its order or leg.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionFillError {
    ContractMismatch { fill: String, order: String },
    BrokerOrderMismatch,
    ExceedsRemaining { fill_qty: u32, remaining: u32 },
    ZeroQuantity,
    NonPositivePrice(f64),
    Transition(TransitionError),
}

impl fmt::Display for OptionFillError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionFillError::ContractMismatch { fill, order } => {
                write!(f, "Contract symbol mismatch: {fill} != {order}")
            }
            OptionFillError::BrokerOrderMismatch => write!(f, "Broker order ID mismatch"),
            OptionFillError::ExceedsRemaining { fill_qty, remaining } => write!(
                f,
                "Fill quantity exceeds remaining order quantity: {fill_qty} > {remaining}"
            ),
            OptionFillError::ZeroQuantity => write!(f, "Fill quantity must be positive"),
            OptionFillError::NonPositivePrice(p) => {
                write!(f, "Fill price must be positive: {p}")
            }
            OptionFillError::Transition(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for OptionFillError {}

impl From<TransitionError> for OptionFillError {
    fn from(e: TransitionError) -> Self {
        OptionFillError::Transition(e)
    }
}

// ---------------------------------------------------------------------------
// OptionFillProcessor
// ---------------------------------------------------------------------------

/// Applies option fills to single-leg orders and spreads.
pub struct OptionFillProcessor;

impl OptionFillProcessor {
    /// Pure predicate: would this fill be legitimate for this order?
    pub fn validate(fill: &OptionFill, order: &OptionOrder) -> Result<(), OptionFillError> {
        let contract = order.leg.contract_symbol();
        if fill.contract_symbol != contract {
            return Err(OptionFillError::ContractMismatch {
                fill: fill.contract_symbol.clone(),
                order: contract,
            });
        }
        if order.broker_order_id.as_deref() != Some(fill.broker_order_id.as_str()) {
            return Err(OptionFillError::BrokerOrderMismatch);
        }
        if fill.quantity == 0 {
            return Err(OptionFillError::ZeroQuantity);
        }
        let remaining = order.leg.quantity.saturating_sub(order.filled_quantity);
        if fill.quantity > remaining {
            return Err(OptionFillError::ExceedsRemaining {
                fill_qty: fill.quantity,
                remaining,
            });
        }
        if fill.price_per_contract <= 0.0 {
            return Err(OptionFillError::NonPositivePrice(fill.price_per_contract));
        }
        Ok(())
    }

    /// Apply a fill to a single-leg order, maintaining the quantity-weighted
    /// average premium and clamping at the leg quantity.
    pub fn apply_to_order(
        order: &mut OptionOrder,
        fill: &OptionFill,
    ) -> Result<(), OptionFillError> {
        let contract = order.leg.contract_symbol();
        if fill.contract_symbol != contract {
            return Err(OptionFillError::ContractMismatch {
                fill: fill.contract_symbol.clone(),
                order: contract,
            });
        }
        if order.broker_order_id.as_deref() != Some(fill.broker_order_id.as_str()) {
            return Err(OptionFillError::BrokerOrderMismatch);
        }

        let new_filled = order.filled_quantity + fill.quantity;

        if new_filled >= order.leg.quantity {
            order.transition(OrderStatus::Filled)?;
            order.filled_quantity = order.leg.quantity;
        } else {
            order.transition(OrderStatus::PartiallyFilled)?;
            order.filled_quantity = new_filled;
        }

        if order.filled_quantity > 0 {
            order.filled_price = Some(match order.filled_price {
                None => fill.price_per_contract,
                Some(prev_avg) => {
                    let filled = order.filled_quantity as f64;
                    let prior = (filled - fill.quantity as f64).max(0.0);
                    (prev_avg * prior + fill.price_per_contract * fill.quantity as f64) / filled
                }
            });
        }
        Ok(())
    }

    /// Apply a fill to one leg of a spread.
    ///
    /// Leg fills are clamped at the leg quantity. The spread becomes FILLED
    /// when every leg is at full quantity, PARTIALLY_FILLED as soon as any
    /// leg has a nonzero fill.
    pub fn apply_to_spread(
        spread: &mut OptionSpreadOrder,
        fill: &OptionFill,
        leg: &OptionLeg,
    ) -> Result<(), OptionFillError> {
        let contract = leg.contract_symbol();
        if fill.contract_symbol != contract {
            return Err(OptionFillError::ContractMismatch {
                fill: fill.contract_symbol.clone(),
                order: contract,
            });
        }

        let current = spread.leg_fills.get(&contract).copied().unwrap_or(0);
        let new_filled = (current + fill.quantity).min(leg.quantity);

        spread.leg_fills.insert(contract.clone(), new_filled);
        spread
            .leg_fill_prices
            .insert(contract, fill.price_per_contract);

        if spread.is_fully_filled() {
            spread.transition(OrderStatus::Filled)?;
        } else if new_filled > 0 {
            spread.transition(OrderStatus::PartiallyFilled)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Assignment / exercise notifications
// ---------------------------------------------------------------------------

/// Kind of an option lifecycle notification.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleKind {
    Assignment,
    Exercise,
}

/// Assignment or exercise notification from a broker.
///
/// Informational only — the core never mutates portfolio state from these;
/// they are recorded in the trade log and forwarded.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OptionLifecycleEvent {
    pub event_id: String,
    pub kind: LifecycleKind,
    pub contract_symbol: String,
    pub quantity: u32,
    /// Strike price at assignment/exercise.
    pub price: f64,
    pub timestamp: DateTime<Utc>,
}

impl OptionLifecycleEvent {
    pub fn new(
        kind: LifecycleKind,
        contract_symbol: impl Into<String>,
        quantity: u32,
        price: f64,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            kind,
            contract_symbol: contract_symbol.into(),
            quantity,
            price,
            timestamp: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
