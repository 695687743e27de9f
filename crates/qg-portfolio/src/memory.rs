//! In-memory portfolio with the same semantics as the HTTP client.
//!
//! Used by scenario tests and dry runs. Setters mirror what the external
//! service would report; the read side implements [`PortfolioClient`]
//! verbatim.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::{PortfolioClient, PortfolioError};

#[derive(Debug, Default)]
struct Inner {
    positions: HashMap<String, f64>,
    portfolio_value: Option<f64>,
    pnl_entries: Vec<PnlEntry>,
}

#[derive(Debug, Clone)]
struct PnlEntry {
    strategy_id: String,
    pnl: f64,
    at: DateTime<Utc>,
}

/// In-memory [`PortfolioClient`] implementation.
#[derive(Debug, Default)]
pub struct StaticPortfolio {
    inner: Mutex<Inner>,
}

impl StaticPortfolio {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the signed USD position for a symbol.
    pub async fn set_position(&self, symbol: impl Into<String>, position: f64) {
        self.inner.lock().await.positions.insert(symbol.into(), position);
    }

    /// Set (or clear) the total portfolio value.
    pub async fn set_portfolio_value(&self, value: Option<f64>) {
        self.inner.lock().await.portfolio_value = value;
    }

    /// Record a P&L entry attributed to a strategy at the given instant.
    pub async fn add_pnl(&self, strategy_id: impl Into<String>, pnl: f64, at: DateTime<Utc>) {
        self.inner.lock().await.pnl_entries.push(PnlEntry {
            strategy_id: strategy_id.into(),
            pnl,
            at,
        });
    }
}

#[async_trait]
impl PortfolioClient for StaticPortfolio {
    async fn position(&self, symbol: &str) -> Result<f64, PortfolioError> {
        Ok(self.inner.lock().await.positions.get(symbol).copied().unwrap_or(0.0))
    }

    async fn all_positions(&self) -> Result<HashMap<String, f64>, PortfolioError> {
        Ok(self.inner.lock().await.positions.clone())
    }

    async fn portfolio_value(&self) -> Result<Option<f64>, PortfolioError> {
        Ok(self.inner.lock().await.portfolio_value)
    }

    async fn strategy_daily_pnl(
        &self,
        strategy_id: &str,
        since: DateTime<Utc>,
    ) -> Result<f64, PortfolioError> {
        Ok(self
            .inner
            .lock()
            .await
            .pnl_entries
            .iter()
            .filter(|e| e.strategy_id == strategy_id && e.at >= since)
            .map(|e| e.pnl)
            .sum())
    }

    async fn total_daily_pnl(&self, since: DateTime<Utc>) -> Result<f64, PortfolioError> {
        Ok(self
            .inner
            .lock()
            .await
            .pnl_entries
            .iter()
            .filter(|e| e.at >= since)
            .map(|e| e.pnl)
            .sum())
    }
}
