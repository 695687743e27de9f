//! Pre-trade check orchestration.
//!
//! # Check order (fixed)
//!
//! 1. `order_notional`          — size band for the single order
//! 2. `slippage`                — requested tolerance vs the house limit
//! 3. `position_limit`          — projected per-symbol exposure
//! 4. `total_exposure`          — projected whole-book exposure
//! 5. `single_asset_exposure`   — concentration vs portfolio value
//! 6. `strategy_daily_loss`     — per-strategy daily floor
//! 7. `total_daily_loss`        — whole-book daily floor
//! 8. `rate_limit`              — per-strategy submission throttle
//!
//! The order is part of the audit contract: decision entries can only be
//! diffed across versions if the check set and order are stable. Every check
//! runs even after a failure — no short-circuiting.

use std::sync::Arc;

use qg_config::RiskLimits;
use qg_portfolio::PortfolioClient;
use qg_schemas::TradingSignal;
use tracing::debug;

use crate::exposure::ExposureChecker;
use crate::loss::LossLimitChecker;
use crate::throttle::{ThrottleChecker, ThrottleStore};
use crate::types::{CheckOutcome, NamedCheck, RiskReport};

/// Orchestrates all pre-trade risk checks for one signal.
pub struct PreTradeRiskChecker {
    portfolio: Arc<dyn PortfolioClient>,
    exposure: ExposureChecker,
    loss: LossLimitChecker,
    throttle: ThrottleChecker,
    limits: RiskLimits,
}

impl PreTradeRiskChecker {
    pub fn new(
        portfolio: Arc<dyn PortfolioClient>,
        throttle_store: Arc<dyn ThrottleStore>,
        limits: RiskLimits,
    ) -> Self {
        Self {
            exposure: ExposureChecker::new(portfolio.clone()),
            loss: LossLimitChecker::new(portfolio.clone()),
            throttle: ThrottleChecker::new(throttle_store),
            portfolio,
            limits,
        }
    }

    pub fn limits(&self) -> &RiskLimits {
        &self.limits
    }

    fn check_order_notional(&self, signal: &TradingSignal) -> CheckOutcome {
        let notional = signal.order_notional();

        if notional > self.limits.max_order_notional_usd {
            return CheckOutcome::fail(format!(
                "Order notional exceeds limit: ${notional:.2} > ${:.2}",
                self.limits.max_order_notional_usd
            ));
        }
        if notional < self.limits.min_order_notional_usd {
            return CheckOutcome::fail(format!(
                "Order notional below minimum: ${notional:.2} < ${:.2}",
                self.limits.min_order_notional_usd
            ));
        }
        CheckOutcome::pass()
    }

    fn check_slippage(&self, signal: &TradingSignal) -> CheckOutcome {
        if signal.constraints.max_slippage_bps > self.limits.max_slippage_bps {
            return CheckOutcome::fail(format!(
                "Slippage limit exceeded: {} bps > {} bps",
                signal.constraints.max_slippage_bps, self.limits.max_slippage_bps
            ));
        }
        CheckOutcome::pass()
    }

    /// Run every check in the fixed order, accumulating outcomes.
    pub async fn run_all_checks(&self, signal: &TradingSignal) -> RiskReport {
        let mut checks = Vec::with_capacity(8);

        checks.push(NamedCheck {
            name: "order_notional",
            outcome: self.check_order_notional(signal),
        });
        checks.push(NamedCheck {
            name: "slippage",
            outcome: self.check_slippage(signal),
        });
        checks.push(NamedCheck {
            name: "position_limit",
            outcome: self.exposure.check_position_limit(signal, &self.limits).await,
        });
        checks.push(NamedCheck {
            name: "total_exposure",
            outcome: self.exposure.check_total_exposure(signal, &self.limits).await,
        });

        // Concentration needs the portfolio value; an unknown value (or a
        // value fetch failure) degrades this one check open.
        let portfolio_value = self.portfolio.portfolio_value().await.unwrap_or(None);
        checks.push(NamedCheck {
            name: "single_asset_exposure",
            outcome: self
                .exposure
                .check_concentration(signal, &self.limits, portfolio_value)
                .await,
        });

        checks.push(NamedCheck {
            name: "strategy_daily_loss",
            outcome: self
                .loss
                .check_strategy_daily_loss(&signal.strategy_id, &self.limits)
                .await,
        });
        checks.push(NamedCheck {
            name: "total_daily_loss",
            outcome: self.loss.check_total_daily_loss(&self.limits).await,
        });
        checks.push(NamedCheck {
            name: "rate_limit",
            outcome: self
                .throttle
                .check_rate_limit(&signal.strategy_id, &self.limits)
                .await,
        });

        let report = RiskReport::from_checks(checks);
        debug!(
            strategy_id = %signal.strategy_id,
            symbol = %signal.symbol,
            approved = report.approved,
            failures = report.errors.len(),
            "pre-trade checks complete"
        );
        report
    }
}
