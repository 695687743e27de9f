//! Option contract validation.
//!
//! Structural checks only — no strategy logic, no pricing. Spread
//! validation requires a shared underlying and expiration but deliberately
//! permits asymmetric leg quantities; venues that reject non-ratio spreads
//! surface that at submission.

use std::fmt;

use chrono::{NaiveDate, Utc};

use crate::option_order::{OptionLeg, OptionOrder, OptionSpreadOrder};

// ---------------------------------------------------------------------------
// OptionValidationError
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum OptionValidationError {
    ExpirationNotFuture(NaiveDate),
    NonPositiveStrike(f64),
    ZeroQuantity,
    ZeroMultiplier,
    NonPositiveLimitPrice(f64),
    ZeroSpreadLimitPrice,
    MixedUnderlying { expected: String, got: String },
    MixedExpiration { expected: NaiveDate, got: NaiveDate },
    Leg { index: usize, source: Box<OptionValidationError> },
}

impl fmt::Display for OptionValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValidationError::ExpirationNotFuture(d) => {
                write!(f, "Expiration {d} must be in the future")
            }
            OptionValidationError::NonPositiveStrike(s) => {
                write!(f, "Strike price must be positive: {s}")
            }
            OptionValidationError::ZeroQuantity => write!(f, "Quantity must be positive"),
            OptionValidationError::ZeroMultiplier => {
                write!(f, "Contract multiplier must be positive")
            }
            OptionValidationError::NonPositiveLimitPrice(p) => {
                write!(f, "Limit price must be positive: {p}")
            }
            OptionValidationError::ZeroSpreadLimitPrice => {
                write!(f, "Limit price cannot be zero")
            }
            OptionValidationError::MixedUnderlying { expected, got } => {
                write!(f, "All legs must have same underlying: {got} != {expected}")
            }
            OptionValidationError::MixedExpiration { expected, got } => {
                write!(f, "All legs must have same expiration: {got} != {expected}")
            }
            OptionValidationError::Leg { index, source } => {
                write!(f, "Leg {} validation failed: {source}", index + 1)
            }
        }
    }
}

impl std::error::Error for OptionValidationError {}

// ---------------------------------------------------------------------------
// Validator
// ---------------------------------------------------------------------------

/// Validates option legs, orders, and spreads before the broker is
/// contacted.
pub struct OptionContractValidator;

impl OptionContractValidator {
    /// Validate a leg against an explicit "today" — the deterministic core
    /// used by all other entry points.
    pub fn validate_leg_as_of(
        leg: &OptionLeg,
        today: NaiveDate,
    ) -> Result<(), OptionValidationError> {
        if leg.expiration <= today {
            return Err(OptionValidationError::ExpirationNotFuture(leg.expiration));
        }
        if leg.strike <= 0.0 {
            return Err(OptionValidationError::NonPositiveStrike(leg.strike));
        }
        if leg.quantity == 0 {
            return Err(OptionValidationError::ZeroQuantity);
        }
        if leg.contract_multiplier == 0 {
            return Err(OptionValidationError::ZeroMultiplier);
        }
        Ok(())
    }

    /// Validate a leg against the current UTC date.
    pub fn validate_leg(leg: &OptionLeg) -> Result<(), OptionValidationError> {
        Self::validate_leg_as_of(leg, Utc::now().date_naive())
    }

    /// Validate a single-leg order: the leg plus a positive limit price when
    /// one is set.
    pub fn validate_option_order(order: &OptionOrder) -> Result<(), OptionValidationError> {
        Self::validate_leg(&order.leg)?;
        if let Some(p) = order.limit_price {
            if p <= 0.0 {
                return Err(OptionValidationError::NonPositiveLimitPrice(p));
            }
        }
        Ok(())
    }

    /// Validate a spread: every leg valid, shared underlying, shared
    /// expiration, nonzero net limit when set. Leg quantities may differ.
    pub fn validate_spread_order(order: &OptionSpreadOrder) -> Result<(), OptionValidationError> {
        let today = Utc::now().date_naive();
        for (i, leg) in order.legs.iter().enumerate() {
            Self::validate_leg_as_of(leg, today).map_err(|e| OptionValidationError::Leg {
                index: i,
                source: Box::new(e),
            })?;
        }

        let first = &order.legs[0];
        for leg in &order.legs[1..] {
            if leg.underlying != first.underlying {
                return Err(OptionValidationError::MixedUnderlying {
                    expected: first.underlying.clone(),
                    got: leg.underlying.clone(),
                });
            }
            if leg.expiration != first.expiration {
                return Err(OptionValidationError::MixedExpiration {
                    expected: first.expiration,
                    got: leg.expiration,
                });
            }
        }

        // A net limit of exactly zero is ambiguous between "free" and
        // "unset"; refuse it. Negative nets (credit spreads) are fine.
        if order.limit_price == Some(0.0) {
            return Err(OptionValidationError::ZeroSpreadLimitPrice);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
