//! Read-only portfolio state boundary.
//!
//! All position, exposure, and P&L data lives in an external portfolio
//! service; the core only ever reads it through [`PortfolioClient`].  Two
//! implementations ship here: [`HttpPortfolioClient`] for the real service
//! and [`StaticPortfolio`], an in-memory implementation with identical
//! semantics used by tests and dry runs.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

mod http;
mod memory;

pub use http::HttpPortfolioClient;
pub use memory::StaticPortfolio;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors a [`PortfolioClient`] implementation may return.
#[derive(Debug)]
pub enum PortfolioError {
    /// Network or transport failure.
    Transport(String),
    /// The portfolio service returned an application-level error.
    Api { status: u16, message: String },
    /// A response payload could not be decoded.
    Decode(String),
}

impl fmt::Display for PortfolioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortfolioError::Transport(msg) => write!(f, "portfolio transport error: {msg}"),
            PortfolioError::Api { status, message } => {
                write!(f, "portfolio api error status={status}: {message}")
            }
            PortfolioError::Decode(msg) => write!(f, "portfolio decode error: {msg}"),
        }
    }
}

impl std::error::Error for PortfolioError {}

// ---------------------------------------------------------------------------
// Client trait
// ---------------------------------------------------------------------------

/// Read-only view of externalized portfolio state.
///
/// All amounts are USD. Implementations must be object-safe so callers can
/// hold an `Arc<dyn PortfolioClient>` without knowing the concrete type, and
/// `Send + Sync` so they can be shared across pipeline tasks.
#[async_trait]
pub trait PortfolioClient: Send + Sync {
    /// Current position for a symbol, signed: positive long, negative short,
    /// zero when flat or unknown.
    async fn position(&self, symbol: &str) -> Result<f64, PortfolioError>;

    /// All current positions, keyed by symbol.
    async fn all_positions(&self) -> Result<HashMap<String, f64>, PortfolioError>;

    /// Total portfolio value; `None` when the service cannot price it.
    async fn portfolio_value(&self) -> Result<Option<f64>, PortfolioError>;

    /// P&L attributed to one strategy since `since` (negative for losses).
    async fn strategy_daily_pnl(
        &self,
        strategy_id: &str,
        since: DateTime<Utc>,
    ) -> Result<f64, PortfolioError>;

    /// Total P&L across all strategies since `since`.
    async fn total_daily_pnl(&self, since: DateTime<Utc>) -> Result<f64, PortfolioError>;
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn client_is_object_safe_via_arc() {
        let _c: Arc<dyn PortfolioClient> = Arc::new(StaticPortfolio::new());
    }

    #[test]
    fn error_display_transport() {
        let e = PortfolioError::Transport("connection refused".to_string());
        assert_eq!(e.to_string(), "portfolio transport error: connection refused");
    }

    #[test]
    fn error_display_api() {
        let e = PortfolioError::Api {
            status: 502,
            message: "bad gateway".to_string(),
        };
        assert_eq!(e.to_string(), "portfolio api error status=502: bad gateway");
    }
}
