//! Signal contract shared across the gateway.
//!
//! `TradingSignal` is the authoritative inbound contract: every signal is
//! deserialized into this type at the transport boundary and passed through
//! [`TradingSignal::normalized`] before any other component sees it.
//! Downstream crates may assume a normalized signal (uppercase symbol, all
//! ranges checked) and never re-validate.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Side / TimeHorizon
// ---------------------------------------------------------------------------

/// Order side.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// Trading time horizon declared by the strategy.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeHorizon {
    Intraday,
    Swing,
    Long,
}

// ---------------------------------------------------------------------------
// Constraints
// ---------------------------------------------------------------------------

/// Execution constraints attached to a signal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SignalConstraints {
    /// Max tolerated slippage in basis points, `0..=1000`.
    pub max_slippage_bps: u32,
    /// Optional hard cap on the order notional in USD.
    #[serde(default)]
    pub max_notional: Option<f64>,
}

// ---------------------------------------------------------------------------
// TradingSignal
// ---------------------------------------------------------------------------

/// A strategy's request to take or adjust exposure.
///
/// Immutable once normalized; the pipeline owns it for the duration of
/// processing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TradingSignal {
    pub strategy_id: String,
    /// Trading symbol, alphanumeric with `.` allowed; uppercased on entry.
    pub symbol: String,
    pub side: Side,
    /// Signal confidence in `[0, 1]`.
    pub confidence: f64,
    /// Target exposure in USD, strictly positive.
    pub target_exposure: f64,
    pub time_horizon: TimeHorizon,
    pub constraints: SignalConstraints,
}

impl TradingSignal {
    /// Validate every field and return the canonical form (symbol uppercased).
    ///
    /// # Errors
    /// Returns the first [`ValidationError`] encountered; a signal that fails
    /// here must never reach the pipeline.
    pub fn normalized(mut self) -> Result<Self, ValidationError> {
        if self.strategy_id.is_empty() {
            return Err(ValidationError::EmptyStrategyId);
        }
        if self.symbol.is_empty() || !self.symbol.chars().all(|c| c.is_ascii_alphanumeric() || c == '.') {
            return Err(ValidationError::BadSymbol(self.symbol));
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(ValidationError::ConfidenceOutOfRange(self.confidence));
        }
        if !(self.target_exposure > 0.0) {
            return Err(ValidationError::NonPositiveExposure(self.target_exposure));
        }
        if self.constraints.max_slippage_bps > 1000 {
            return Err(ValidationError::SlippageOutOfRange(
                self.constraints.max_slippage_bps,
            ));
        }
        if let Some(cap) = self.constraints.max_notional {
            if !(cap > 0.0) {
                return Err(ValidationError::NonPositiveMaxNotional(cap));
            }
        }

        self.symbol = self.symbol.to_ascii_uppercase();
        Ok(self)
    }

    /// Order notional used by every limit check: the target exposure, capped
    /// by `constraints.max_notional` when one is set.
    pub fn order_notional(&self) -> f64 {
        match self.constraints.max_notional {
            Some(cap) => self.target_exposure.min(cap),
            None => self.target_exposure,
        }
    }

    /// Signed notional for exposure projection: positive for BUY, negative
    /// for SELL.
    pub fn signed_exposure(&self) -> f64 {
        match self.side {
            Side::Buy => self.target_exposure,
            Side::Sell => -self.target_exposure,
        }
    }
}

// ---------------------------------------------------------------------------
// ValidationError
// ---------------------------------------------------------------------------

/// Structural validation failure for an inbound signal.
///
/// Surfaces as a REJECTED response at the transport boundary; the pipeline is
/// never invoked for a signal that fails validation.
#[derive(Clone, Debug, PartialEq)]
pub enum ValidationError {
    EmptyStrategyId,
    BadSymbol(String),
    ConfidenceOutOfRange(f64),
    NonPositiveExposure(f64),
    SlippageOutOfRange(u32),
    NonPositiveMaxNotional(f64),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyStrategyId => write!(f, "strategy_id must be non-empty"),
            ValidationError::BadSymbol(s) => {
                write!(f, "symbol must be alphanumeric (dots allowed): {s:?}")
            }
            ValidationError::ConfidenceOutOfRange(v) => {
                write!(f, "confidence must be within [0, 1]: {v}")
            }
            ValidationError::NonPositiveExposure(v) => {
                write!(f, "target_exposure must be positive: {v}")
            }
            ValidationError::SlippageOutOfRange(v) => {
                write!(f, "max_slippage_bps must be within [0, 1000]: {v}")
            }
            ValidationError::NonPositiveMaxNotional(v) => {
                write!(f, "max_notional must be positive when set: {v}")
            }
        }
    }
}

impl std::error::Error for ValidationError {}

// ---------------------------------------------------------------------------
// Pipeline response
// ---------------------------------------------------------------------------

/// Terminal disposition of a processed signal.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalStatus {
    Approved,
    Rejected,
}

/// Response returned to the signal submitter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SignalResponse {
    pub signal_id: String,
    #[serde(default)]
    pub order_id: Option<String>,
    pub status: SignalStatus,
    pub message: String,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl SignalResponse {
    pub fn rejected(signal_id: impl Into<String>, message: impl Into<String>, errors: Vec<String>) -> Self {
        Self {
            signal_id: signal_id.into(),
            order_id: None,
            status: SignalStatus::Rejected,
            message: message.into(),
            errors,
        }
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
