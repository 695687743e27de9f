//! Option order models: legs, single-leg orders, and atomic spreads.
//!
//! The contract-symbol codec lives here because every per-leg map in a
//! spread is keyed by it. The format is canonical across the whole core:
//! `UNDERLYING_YYMMDD_{C|P}_{strike·1000}` — identical inputs must produce
//! identical symbols, and parsing recovers the exact components.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use qg_schemas::Side;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::order::{validate_transition, OrderStatus, TransitionError};

// ---------------------------------------------------------------------------
// OptionType
// ---------------------------------------------------------------------------

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OptionType {
    Call,
    Put,
}

impl OptionType {
    /// Single-letter code used in contract symbols.
    pub fn code(&self) -> char {
        match self {
            OptionType::Call => 'C',
            OptionType::Put => 'P',
        }
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionType::Call => write!(f, "CALL"),
            OptionType::Put => write!(f, "PUT"),
        }
    }
}

// ---------------------------------------------------------------------------
// OptionLeg
// ---------------------------------------------------------------------------

fn default_multiplier() -> u32 {
    100
}

/// One leg of an option position. Immutable value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OptionLeg {
    /// Underlying symbol (e.g. `AAPL`).
    pub underlying: String,
    pub option_type: OptionType,
    pub strike: f64,
    /// Expiration date; must be strictly in the future at validation time.
    pub expiration: NaiveDate,
    pub side: Side,
    /// Number of contracts, strictly positive.
    pub quantity: u32,
    /// Underlying units per contract (100 for US equity options).
    #[serde(default = "default_multiplier")]
    pub contract_multiplier: u32,
}

impl OptionLeg {
    /// Canonical contract symbol: `UNDERLYING_YYMMDD_{C|P}_{strike·1000}`.
    pub fn contract_symbol(&self) -> String {
        format!(
            "{}_{}_{}_{}",
            self.underlying,
            self.expiration.format("%y%m%d"),
            self.option_type.code(),
            (self.strike * 1000.0).floor() as i64
        )
    }

    /// Leg notional at the given per-contract premium.
    pub fn notional(&self, price_per_contract: f64) -> f64 {
        price_per_contract * self.quantity as f64 * self.contract_multiplier as f64
    }
}

// ---------------------------------------------------------------------------
// Contract symbol codec
// ---------------------------------------------------------------------------

/// Components recovered from a contract symbol.
#[derive(Clone, Debug, PartialEq)]
pub struct ContractSpec {
    pub underlying: String,
    pub expiration: NaiveDate,
    pub option_type: OptionType,
    /// Strike in thousandths (`floor(strike · 1000)`).
    pub strike_millis: i64,
}

/// A contract symbol could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolError(pub String);

impl fmt::Display for SymbolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid contract symbol: {}", self.0)
    }
}

impl std::error::Error for SymbolError {}

/// Parse a canonical contract symbol back into its components.
pub fn parse_contract_symbol(symbol: &str) -> Result<ContractSpec, SymbolError> {
    let parts: Vec<&str> = symbol.split('_').collect();
    let &[underlying, date, code, strike] = parts.as_slice() else {
        return Err(SymbolError(symbol.to_string()));
    };

    if underlying.is_empty() {
        return Err(SymbolError(symbol.to_string()));
    }
    let expiration = NaiveDate::parse_from_str(date, "%y%m%d")
        .map_err(|_| SymbolError(symbol.to_string()))?;
    let option_type = match code {
        "C" => OptionType::Call,
        "P" => OptionType::Put,
        _ => return Err(SymbolError(symbol.to_string())),
    };
    let strike_millis: i64 = strike.parse().map_err(|_| SymbolError(symbol.to_string()))?;

    Ok(ContractSpec {
        underlying: underlying.to_string(),
        expiration,
        option_type,
        strike_millis,
    })
}

// ---------------------------------------------------------------------------
// OptionOrder
// ---------------------------------------------------------------------------

/// Single-leg option order; same lifecycle as an equity [`crate::Order`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OptionOrder {
    pub order_id: String,
    pub strategy_id: String,
    pub leg: OptionLeg,
    /// Limit price per contract; `None` for market.
    pub limit_price: Option<f64>,
    pub status: OrderStatus,
    pub broker_order_id: Option<String>,
    /// Contracts filled so far.
    pub filled_quantity: u32,
    /// Quantity-weighted average premium per contract.
    pub filled_price: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub filled_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
}

impl OptionOrder {
    pub fn new(strategy_id: impl Into<String>, leg: OptionLeg, limit_price: Option<f64>) -> Self {
        Self {
            order_id: Uuid::new_v4().to_string(),
            strategy_id: strategy_id.into(),
            leg,
            limit_price,
            status: OrderStatus::Pending,
            broker_order_id: None,
            filled_quantity: 0,
            filled_price: None,
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

    /// Order notional at the given premium, falling back to the limit price.
    pub fn notional(&self, price_per_contract: Option<f64>) -> f64 {
        let price = price_per_contract.or(self.limit_price).unwrap_or(0.0);
        self.leg.notional(price)
    }

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

    pub fn reject(&mut self, reason: impl Into<String>) -> Result<(), TransitionError> {
        self.transition(OrderStatus::Rejected)?;
        self.rejection_reason = Some(reason.into());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// OptionSpreadOrder
// ---------------------------------------------------------------------------

/// A spread was built with an unsupported leg count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpreadBuildError(pub usize);

impl fmt::Display for SpreadBuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "spread must have 2 to 4 legs, got {}", self.0)
    }
}

impl std::error::Error for SpreadBuildError {}

/// Multi-leg option spread submitted for atomic execution.
///
/// The broker guarantees all-legs-or-none at placement; later partial fills
/// are tracked per leg, bounded by each leg's quantity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OptionSpreadOrder {
    pub order_id: String,
    pub strategy_id: String,
    pub legs: Vec<OptionLeg>,
    /// Net limit price for the whole spread.
    pub limit_price: Option<f64>,
    pub status: OrderStatus,
    pub broker_order_id: Option<String>,
    /// Contracts filled per leg, keyed by contract symbol.
    pub leg_fills: HashMap<String, u32>,
    /// Last fill price per leg, keyed by contract symbol.
    pub leg_fill_prices: HashMap<String, f64>,
    pub created_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub filled_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
}

impl OptionSpreadOrder {
    /// Build a spread of 2–4 legs.
    pub fn new(
        strategy_id: impl Into<String>,
        legs: Vec<OptionLeg>,
        limit_price: Option<f64>,
    ) -> Result<Self, SpreadBuildError> {
        if !(2..=4).contains(&legs.len()) {
            return Err(SpreadBuildError(legs.len()));
        }
        Ok(Self {
            order_id: Uuid::new_v4().to_string(),
            strategy_id: strategy_id.into(),
            legs,
            limit_price,
            status: OrderStatus::Pending,
            broker_order_id: None,
            leg_fills: HashMap::new(),
            leg_fill_prices: HashMap::new(),
            created_at: Utc::now(),
            submitted_at: None,
            filled_at: None,
            cancelled_at: None,
            rejection_reason: None,
        })
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// `true` iff every leg is filled to its full quantity.
    pub fn is_fully_filled(&self) -> bool {
        self.legs.iter().all(|leg| {
            self.leg_fills.get(&leg.contract_symbol()).copied().unwrap_or(0) >= leg.quantity
        })
    }

    /// Net notional: leg notionals at recorded fill prices, falling back to
    /// the evenly distributed limit price for unfilled legs.
    pub fn net_notional(&self) -> f64 {
        let per_leg_limit = self
            .limit_price
            .map(|p| p / self.legs.len() as f64)
            .unwrap_or(0.0);
        self.legs
            .iter()
            .map(|leg| {
                let price = self
                    .leg_fill_prices
                    .get(&leg.contract_symbol())
                    .copied()
                    .unwrap_or(per_leg_limit);
                leg.notional(price)
            })
            .sum()
    }

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

    pub fn reject(&mut self, reason: impl Into<String>) -> Result<(), TransitionError> {
        self.transition(OrderStatus::Rejected)?;
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

    fn leg(option_type: OptionType, strike: f64, quantity: u32) -> OptionLeg {
        OptionLeg {
            underlying: "AAPL".to_string(),
            option_type,
            strike,
            expiration: NaiveDate::from_ymd_opt(2027, 1, 15).unwrap(),
            side: Side::Buy,
            quantity,
            contract_multiplier: 100,
        }
    }

    #[test]
    fn contract_symbol_format() {
        let l = leg(OptionType::Call, 175.0, 10);
        assert_eq!(l.contract_symbol(), "AAPL_270115_C_175000");
    }

    #[test]
    fn contract_symbol_floors_fractional_strikes() {
        let l = leg(OptionType::Put, 7.5, 1);
        assert_eq!(l.contract_symbol(), "AAPL_270115_P_7500");
    }

    #[test]
    fn contract_symbol_is_deterministic() {
        assert_eq!(
            leg(OptionType::Call, 180.0, 1).contract_symbol(),
            leg(OptionType::Call, 180.0, 5).contract_symbol(),
            "quantity must not affect the symbol"
        );
    }

    #[test]
    fn symbol_round_trip_recovers_components() {
        let l = leg(OptionType::Put, 182.5, 3);
        let spec = parse_contract_symbol(&l.contract_symbol()).unwrap();
        assert_eq!(spec.underlying, "AAPL");
        assert_eq!(spec.expiration, l.expiration);
        assert_eq!(spec.option_type, OptionType::Put);
        assert_eq!(spec.strike_millis, 182_500);
    }

    #[test]
    fn malformed_symbols_fail_to_parse() {
        for bad in ["", "AAPL", "AAPL_270115_C", "AAPL_notadate_C_1000", "AAPL_270115_X_1000", "_270115_C_1000"] {
            assert!(parse_contract_symbol(bad).is_err(), "{bad:?} must not parse");
        }
    }

    #[test]
    fn leg_notional_includes_multiplier() {
        let l = leg(OptionType::Call, 175.0, 10);
        assert_eq!(l.notional(2.50), 2_500.0);
    }

    #[test]
    fn spread_requires_two_to_four_legs() {
        let one = vec![leg(OptionType::Call, 175.0, 10)];
        assert_eq!(
            OptionSpreadOrder::new("s1", one, None).unwrap_err(),
            SpreadBuildError(1)
        );

        let five = (0..5).map(|i| leg(OptionType::Call, 175.0 + i as f64, 1)).collect();
        assert!(OptionSpreadOrder::new("s1", five, None).is_err());
    }

    #[test]
    fn fresh_spread_is_not_fully_filled() {
        let spread = OptionSpreadOrder::new(
            "s1",
            vec![leg(OptionType::Call, 175.0, 10), leg(OptionType::Call, 180.0, 10)],
            None,
        )
        .unwrap();
        assert!(!spread.is_fully_filled());
        assert_eq!(spread.status, OrderStatus::Pending);
    }

    #[test]
    fn fully_filled_requires_every_leg_at_quantity() {
        let legs = vec![leg(OptionType::Call, 175.0, 10), leg(OptionType::Call, 180.0, 5)];
        let mut spread = OptionSpreadOrder::new("s1", legs.clone(), None).unwrap();

        spread.leg_fills.insert(legs[0].contract_symbol(), 10);
        assert!(!spread.is_fully_filled());
        spread.leg_fills.insert(legs[1].contract_symbol(), 5);
        assert!(spread.is_fully_filled());
    }

    #[test]
    fn net_notional_falls_back_to_distributed_limit() {
        let legs = vec![leg(OptionType::Call, 175.0, 1), leg(OptionType::Call, 180.0, 1)];
        let spread = OptionSpreadOrder::new("s1", legs, Some(4.0)).unwrap();
        // Each leg priced at 4.0 / 2 = 2.0; notional = 2 * (2.0 * 1 * 100).
        assert_eq!(spread.net_notional(), 400.0);
    }

    #[test]
    fn option_order_notional_prefers_explicit_price() {
        let o = OptionOrder::new("s1", leg(OptionType::Call, 175.0, 2), Some(3.0));
        assert_eq!(o.notional(None), 600.0);
        assert_eq!(o.notional(Some(5.0)), 1_000.0);
    }

    #[test]
    fn option_order_shares_the_equity_state_machine() {
        let mut o = OptionOrder::new("s1", leg(OptionType::Call, 175.0, 2), None);
        assert!(o.transition(OrderStatus::Filled).is_err());
        o.transition(OrderStatus::Submitted).unwrap();
        o.transition(OrderStatus::Filled).unwrap();
        assert!(o.is_terminal());
    }
}
