//! Daily loss floors.
//!
//! P&L is fetched from the portfolio service since the start of the current
//! UTC day. The strategy-level check applies both the absolute floor and,
//! when portfolio value is known, the percentage floor; the total check
//! applies the absolute floor only.

use std::sync::Arc;

use chrono::{DateTime, NaiveTime, Utc};
use qg_config::RiskLimits;
use qg_portfolio::PortfolioClient;

use crate::types::CheckOutcome;

/// Start of the current UTC day.
pub(crate) fn start_of_utc_day() -> DateTime<Utc> {
    Utc::now().date_naive().and_time(NaiveTime::MIN).and_utc()
}

/// Checks strategy and portfolio daily loss limits.
pub struct LossLimitChecker {
    portfolio: Arc<dyn PortfolioClient>,
}

impl LossLimitChecker {
    pub fn new(portfolio: Arc<dyn PortfolioClient>) -> Self {
        Self { portfolio }
    }

    /// Per-strategy daily loss: absolute floor, then percentage of portfolio
    /// value when the value is known.
    pub async fn check_strategy_daily_loss(
        &self,
        strategy_id: &str,
        limits: &RiskLimits,
    ) -> CheckOutcome {
        let since = start_of_utc_day();
        let pnl = match self.portfolio.strategy_daily_pnl(strategy_id, since).await {
            Ok(v) => v,
            Err(e) => return CheckOutcome::fail(e.to_string()),
        };

        if pnl < -limits.max_daily_loss_usd {
            return CheckOutcome::fail(format!(
                "Daily loss limit exceeded: ${:.2} > ${:.2}",
                pnl.abs(),
                limits.max_daily_loss_usd
            ));
        }

        // Percentage floor only applies when the portfolio can be valued.
        match self.portfolio.portfolio_value().await {
            Ok(Some(value)) if value > 0.0 => {
                let loss_pct = pnl.abs() / value;
                if loss_pct > limits.max_daily_loss_pct {
                    return CheckOutcome::fail(format!(
                        "Daily loss percentage limit exceeded: {:.2}% > {:.2}%",
                        loss_pct * 100.0,
                        limits.max_daily_loss_pct * 100.0
                    ));
                }
            }
            Ok(_) => {}
            Err(e) => return CheckOutcome::fail(e.to_string()),
        }

        CheckOutcome::pass()
    }

    /// Whole-book daily loss floor.
    pub async fn check_total_daily_loss(&self, limits: &RiskLimits) -> CheckOutcome {
        let since = start_of_utc_day();
        let pnl = match self.portfolio.total_daily_pnl(since).await {
            Ok(v) => v,
            Err(e) => return CheckOutcome::fail(e.to_string()),
        };

        if pnl < -limits.max_daily_loss_usd {
            return CheckOutcome::fail(format!(
                "Total daily loss limit exceeded: ${:.2} > ${:.2}",
                pnl.abs(),
                limits.max_daily_loss_usd
            ));
        }
        CheckOutcome::pass()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qg_portfolio::StaticPortfolio;

    fn limits() -> RiskLimits {
        RiskLimits {
            max_daily_loss_usd: 1_000.0,
            max_daily_loss_pct: 0.05,
            ..RiskLimits::default()
        }
    }

    #[tokio::test]
    async fn loss_within_floor_passes() {
        let p = Arc::new(StaticPortfolio::new());
        p.add_pnl("s1", -500.0, Utc::now()).await;
        let checker = LossLimitChecker::new(p);

        let out = checker.check_strategy_daily_loss("s1", &limits()).await;
        assert!(out.valid);
    }

    #[tokio::test]
    async fn absolute_floor_breach_fails() {
        let p = Arc::new(StaticPortfolio::new());
        p.add_pnl("s1", -1_500.0, Utc::now()).await;
        let checker = LossLimitChecker::new(p);

        let out = checker.check_strategy_daily_loss("s1", &limits()).await;
        assert!(!out.valid);
        assert_eq!(
            out.error.unwrap(),
            "Daily loss limit exceeded: $1500.00 > $1000.00"
        );
    }

    #[tokio::test]
    async fn percentage_floor_breach_fails_when_value_known() {
        let p = Arc::new(StaticPortfolio::new());
        p.add_pnl("s1", -800.0, Utc::now()).await;
        p.set_portfolio_value(Some(10_000.0)).await;
        let checker = LossLimitChecker::new(p);

        // 800 / 10_000 = 8% > 5%, while the absolute floor (1000) holds.
        let out = checker.check_strategy_daily_loss("s1", &limits()).await;
        assert!(!out.valid);
        assert_eq!(
            out.error.unwrap(),
            "Daily loss percentage limit exceeded: 8.00% > 5.00%"
        );
    }

    #[tokio::test]
    async fn yesterdays_losses_do_not_count() {
        let p = Arc::new(StaticPortfolio::new());
        p.add_pnl("s1", -5_000.0, Utc::now() - chrono::Duration::days(2)).await;
        let checker = LossLimitChecker::new(p);

        let out = checker.check_strategy_daily_loss("s1", &limits()).await;
        assert!(out.valid);
    }

    #[tokio::test]
    async fn total_floor_sums_across_strategies() {
        let p = Arc::new(StaticPortfolio::new());
        p.add_pnl("s1", -700.0, Utc::now()).await;
        p.add_pnl("s2", -600.0, Utc::now()).await;
        let checker = LossLimitChecker::new(p);

        let out = checker.check_total_daily_loss(&limits()).await;
        assert!(!out.valid);
        assert_eq!(
            out.error.unwrap(),
            "Total daily loss limit exceeded: $1300.00 > $1000.00"
        );
    }

    #[tokio::test]
    async fn gains_never_trip_the_absolute_floor() {
        let p = Arc::new(StaticPortfolio::new());
        p.add_pnl("s1", 2_500.0, Utc::now()).await;
        let checker = LossLimitChecker::new(p);

        let out = checker.check_total_daily_loss(&limits()).await;
        assert!(out.valid);
    }

    #[tokio::test]
    async fn percentage_floor_compares_magnitude() {
        // The percentage floor compares |pnl| to portfolio value, so an
        // outsized gain trips it too.
        let p = Arc::new(StaticPortfolio::new());
        p.add_pnl("s1", 2_500.0, Utc::now()).await;
        p.set_portfolio_value(Some(10_000.0)).await;
        let checker = LossLimitChecker::new(p);

        let out = checker.check_strategy_daily_loss("s1", &limits()).await;
        assert!(!out.valid);
    }
}
