//! Equity order record and the shared lifecycle state machine.
//!
//! # State diagram
//!
//! ```text
//!   new()                       ┌──────────► REJECTED (terminal)
//!   ──────► PENDING ────────────┤
//!               │               └──────────► CANCELLED (terminal)
//!               ▼
//!           SUBMITTED ──► PARTIALLY_FILLED ──► FILLED (terminal)
//!               │                 │    │
//!               │                 │    └─────► CANCELLED (terminal)
//!               ├─────────────────┴──────────► FAILED (terminal)
//!               └────────────────────────────► FILLED / CANCELLED
//! ```
//!
//! Terminal states are absorbing. An illegal transition returns
//! [`TransitionError`], which callers MUST treat as a bug, not a runtime
//! condition: it means an order record was driven out of band.
//!
//! Re-asserting the current state (e.g. a second partial fill while already
//! `PARTIALLY_FILLED`) is a silent no-op.

use std::fmt;

use chrono::{DateTime, Utc};
use qg_schemas::Side;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// OrderStatus
// ---------------------------------------------------------------------------

/// Lifecycle states shared by equity orders, option orders, and spreads.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Created, awaiting submission.
    Pending,
    /// Acknowledged by the broker.
    Submitted,
    /// Partially executed.
    PartiallyFilled,
    /// Fully executed. **Terminal.**
    Filled,
    /// Cancelled before completion. **Terminal.**
    Cancelled,
    /// Refused before the broker acknowledged (risk, validation, or
    /// submission failure). **Terminal.**
    Rejected,
    /// Broker-side failure after acknowledgement. **Terminal.**
    Failed,
}

impl OrderStatus {
    /// `true` if no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Filled | Self::Cancelled | Self::Rejected | Self::Failed
        )
    }

    /// Whether `self → next` is a legal lifecycle transition.
    ///
    /// Same-state moves are legal no-ops; terminal states permit nothing
    /// else.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;

        if *self == next {
            return true;
        }
        match self {
            Pending => matches!(next, Submitted | Rejected | Cancelled),
            Submitted => matches!(next, PartiallyFilled | Filled | Cancelled | Failed),
            PartiallyFilled => matches!(next, Filled | Cancelled | Failed),
            Filled | Cancelled | Rejected | Failed => false,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Submitted => "SUBMITTED",
            OrderStatus::PartiallyFilled => "PARTIALLY_FILLED",
            OrderStatus::Filled => "FILLED",
            OrderStatus::Cancelled => "CANCELLED",
            OrderStatus::Rejected => "REJECTED",
            OrderStatus::Failed => "FAILED",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// TransitionError
// ---------------------------------------------------------------------------

/// An event tried to drive an order through an illegal transition.
///
/// **Callers MUST treat this as a bug.** The order state is left unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionError {
    pub from: OrderStatus,
    pub to: OrderStatus,
}

impl fmt::Display for TransitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "illegal order transition: {} -> {}", self.from, self.to)
    }
}

impl std::error::Error for TransitionError {}

pub(crate) fn validate_transition(
    from: OrderStatus,
    to: OrderStatus,
) -> Result<(), TransitionError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(TransitionError { from, to })
    }
}

// ---------------------------------------------------------------------------
// Order
// ---------------------------------------------------------------------------

/// Equity order with full lifecycle tracking.
///
/// `quantity` and `notional` both carry USD amounts: the gateway sizes
/// orders by exposure, not shares, and the conversion happens downstream.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: String,
    pub strategy_id: String,
    pub symbol: String,
    pub side: Side,
    pub quantity: f64,
    pub notional: f64,
    pub status: OrderStatus,
    pub broker_order_id: Option<String>,
    pub filled_quantity: f64,
    pub filled_notional: f64,
    pub average_fill_price: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub filled_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
}

impl Order {
    /// Create a fresh PENDING order with a unique id.
    pub fn new(
        strategy_id: impl Into<String>,
        symbol: impl Into<String>,
        side: Side,
        quantity: f64,
        notional: f64,
    ) -> Self {
        Self {
            order_id: Uuid::new_v4().to_string(),
            strategy_id: strategy_id.into(),
            symbol: symbol.into(),
            side,
            quantity,
            notional,
            status: OrderStatus::Pending,
            broker_order_id: None,
            filled_quantity: 0.0,
            filled_notional: 0.0,
            average_fill_price: None,
            created_at: Utc::now(),
            submitted_at: None,
            filled_at: None,
            cancelled_at: None,
            rejection_reason: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Drive the order to `next`, stamping the matching timestamp.
    ///
    /// # Errors
    /// [`TransitionError`] on an illegal move; the order is unchanged.
    pub fn transition(&mut self, next: OrderStatus) -> Result<(), TransitionError> {
        if self.status == next {
            return Ok(());
        }
        validate_transition(self.status, next)?;

        self.status = next;
        match next {
            OrderStatus::Submitted => self.submitted_at = Some(Utc::now()),
            OrderStatus::Filled => self.filled_at = Some(Utc::now()),
            OrderStatus::Cancelled => self.cancelled_at = Some(Utc::now()),
            _ => {}
        }
        Ok(())
    }

    /// Transition to REJECTED recording the reason.
    pub fn reject(&mut self, reason: impl Into<String>) -> Result<(), TransitionError> {
        self.transition(OrderStatus::Rejected)?;
        self.rejection_reason = Some(reason.into());
        Ok(())
    }

    /// Transition to FAILED recording the reason.
    pub fn fail(&mut self, reason: impl Into<String>) -> Result<(), TransitionError> {
        self.transition(OrderStatus::Failed)?;
        self.rejection_reason = Some(reason.into());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn order() -> Order {
        Order::new("s1", "AAPL", Side::Buy, 10_000.0, 10_000.0)
    }

    #[test]
    fn new_order_is_pending() {
        let o = order();
        assert_eq!(o.status, OrderStatus::Pending);
        assert_eq!(o.filled_quantity, 0.0);
        assert!(!o.is_terminal());
        assert!(o.broker_order_id.is_none());
    }

    #[test]
    fn order_ids_are_unique() {
        assert_ne!(order().order_id, order().order_id);
    }

    #[test]
    fn happy_path_stamps_timestamps() {
        let mut o = order();
        o.transition(OrderStatus::Submitted).unwrap();
        assert!(o.submitted_at.is_some());
        o.transition(OrderStatus::PartiallyFilled).unwrap();
        o.transition(OrderStatus::Filled).unwrap();
        assert!(o.filled_at.is_some());
        assert!(o.is_terminal());
    }

    #[test]
    fn cancel_stamps_cancelled_at() {
        let mut o = order();
        o.transition(OrderStatus::Submitted).unwrap();
        o.transition(OrderStatus::Cancelled).unwrap();
        assert!(o.cancelled_at.is_some());
    }

    #[test]
    fn pending_cannot_fill_directly() {
        let mut o = order();
        let err = o.transition(OrderStatus::Filled).unwrap_err();
        assert_eq!(err.from, OrderStatus::Pending);
        assert_eq!(err.to, OrderStatus::Filled);
        assert_eq!(o.status, OrderStatus::Pending, "state unchanged after error");
    }

    #[test]
    fn pending_cannot_fail() {
        // FAILED means the broker acknowledged and then broke; an order that
        // never reached the broker rejects instead.
        let mut o = order();
        assert!(o.transition(OrderStatus::Failed).is_err());
    }

    #[test]
    fn terminal_states_are_absorbing() {
        for terminal in [
            OrderStatus::Filled,
            OrderStatus::Cancelled,
            OrderStatus::Rejected,
            OrderStatus::Failed,
        ] {
            for next in [
                OrderStatus::Pending,
                OrderStatus::Submitted,
                OrderStatus::PartiallyFilled,
                OrderStatus::Filled,
                OrderStatus::Cancelled,
                OrderStatus::Rejected,
                OrderStatus::Failed,
            ] {
                if next == terminal {
                    continue;
                }
                assert!(
                    !terminal.can_transition_to(next),
                    "{terminal} -> {next} must be illegal"
                );
            }
        }
    }

    #[test]
    fn same_state_transition_is_a_noop() {
        let mut o = order();
        o.transition(OrderStatus::Submitted).unwrap();
        let stamped = o.submitted_at;
        o.transition(OrderStatus::Submitted).unwrap();
        assert_eq!(o.submitted_at, stamped, "no restamp on re-assertion");
    }

    #[test]
    fn reject_records_reason() {
        let mut o = order();
        o.reject("risk refused").unwrap();
        assert_eq!(o.status, OrderStatus::Rejected);
        assert_eq!(o.rejection_reason.as_deref(), Some("risk refused"));
    }

    #[test]
    fn status_serializes_screaming_snake() {
        let v = serde_json::to_value(OrderStatus::PartiallyFilled).unwrap();
        assert_eq!(v, "PARTIALLY_FILLED");
    }
}
