//! Position and exposure projections.
//!
//! Stateless: every number comes from the portfolio client at check time. A
//! portfolio transport failure fails the affected check (fail-closed) with
//! the transport message; the concentration check is the one deliberate
//! exception, skipping when portfolio value is unknown.

use std::sync::Arc;

use qg_config::RiskLimits;
use qg_portfolio::{PortfolioClient, PortfolioError};
use qg_schemas::TradingSignal;

use crate::types::CheckOutcome;

/// Projects post-trade exposure for the position, total, and concentration
/// checks.
pub struct ExposureChecker {
    portfolio: Arc<dyn PortfolioClient>,
}

impl ExposureChecker {
    pub fn new(portfolio: Arc<dyn PortfolioClient>) -> Self {
        Self { portfolio }
    }

    /// Absolute exposure in the signal's symbol after execution:
    /// `|current + signed_target|`.
    async fn projected_exposure(&self, signal: &TradingSignal) -> Result<f64, PortfolioError> {
        let current = self.portfolio.position(&signal.symbol).await?;
        Ok((current + signal.signed_exposure()).abs())
    }

    /// Per-symbol position limit.
    pub async fn check_position_limit(
        &self,
        signal: &TradingSignal,
        limits: &RiskLimits,
    ) -> CheckOutcome {
        let projected = match self.projected_exposure(signal).await {
            Ok(v) => v,
            Err(e) => return CheckOutcome::fail(e.to_string()),
        };

        if projected > limits.max_position_size_usd {
            return CheckOutcome::fail(format!(
                "Position limit exceeded: {projected:.2} > {:.2}",
                limits.max_position_size_usd
            ));
        }
        CheckOutcome::pass()
    }

    /// Whole-portfolio exposure limit: the new total replaces this symbol's
    /// current contribution with the projected one.
    pub async fn check_total_exposure(
        &self,
        signal: &TradingSignal,
        limits: &RiskLimits,
    ) -> CheckOutcome {
        let result: Result<f64, PortfolioError> = async {
            let positions = self.portfolio.all_positions().await?;
            let total: f64 = positions.values().map(|p| p.abs()).sum();
            let current_asset = positions.get(&signal.symbol).copied().unwrap_or(0.0).abs();
            let projected = self.projected_exposure(signal).await?;
            Ok(total - current_asset + projected)
        }
        .await;

        let new_total = match result {
            Ok(v) => v,
            Err(e) => return CheckOutcome::fail(e.to_string()),
        };

        if new_total > limits.max_total_exposure_usd {
            return CheckOutcome::fail(format!(
                "Total exposure limit exceeded: {new_total:.2} > {:.2}",
                limits.max_total_exposure_usd
            ));
        }
        CheckOutcome::pass()
    }

    /// Single-asset concentration against portfolio value.
    ///
    /// Skips (passes silently) when the value is unknown or non-positive —
    /// the only check permitted to degrade open.
    pub async fn check_concentration(
        &self,
        signal: &TradingSignal,
        limits: &RiskLimits,
        portfolio_value: Option<f64>,
    ) -> CheckOutcome {
        let value = match portfolio_value {
            Some(v) if v > 0.0 => v,
            _ => return CheckOutcome::pass(),
        };

        let projected = match self.projected_exposure(signal).await {
            Ok(v) => v,
            Err(e) => return CheckOutcome::fail(e.to_string()),
        };

        let pct = projected / value;
        if pct > limits.max_single_asset_exposure_pct {
            return CheckOutcome::fail(format!(
                "Single asset exposure limit exceeded: {:.2}% > {:.2}%",
                pct * 100.0,
                limits.max_single_asset_exposure_pct * 100.0
            ));
        }
        CheckOutcome::pass()
    }
}
