//! HTTP implementation of [`PortfolioClient`].
//!
//! Endpoint shapes served by the portfolio service:
//!
//! | Method/path                              | Response body              |
//! |------------------------------------------|----------------------------|
//! | `GET /positions/{symbol}`                | `{"position": f64}`        |
//! | `GET /positions`                         | `{"positions": {sym: f64}}`|
//! | `GET /value`                             | `{"value": f64 \| null}`   |
//! | `GET /pnl/strategy/{id}?since=<rfc3339>` | `{"pnl": f64}`             |
//! | `GET /pnl/total?since=<rfc3339>`         | `{"pnl": f64}`             |

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;

use crate::{PortfolioClient, PortfolioError};

/// [`PortfolioClient`] backed by the external portfolio service.
#[derive(Debug, Clone)]
pub struct HttpPortfolioClient {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct PositionBody {
    position: f64,
}

#[derive(Deserialize)]
struct PositionsBody {
    positions: HashMap<String, f64>,
}

#[derive(Deserialize)]
struct ValueBody {
    value: Option<f64>,
}

#[derive(Deserialize)]
struct PnlBody {
    pnl: f64,
}

impl HttpPortfolioClient {
    /// Build a client against `base_url` (no trailing slash required).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, PortfolioError> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| PortfolioError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(PortfolioError::Api {
                status: status.as_u16(),
                message,
            });
        }

        resp.json::<T>()
            .await
            .map_err(|e| PortfolioError::Decode(e.to_string()))
    }
}

fn since_query(since: DateTime<Utc>) -> Vec<(&'static str, String)> {
    vec![("since", since.to_rfc3339_opts(SecondsFormat::Secs, true))]
}

#[async_trait]
impl PortfolioClient for HttpPortfolioClient {
    async fn position(&self, symbol: &str) -> Result<f64, PortfolioError> {
        let body: PositionBody = self.get_json(&format!("/positions/{symbol}"), &[]).await?;
        Ok(body.position)
    }

    async fn all_positions(&self) -> Result<HashMap<String, f64>, PortfolioError> {
        let body: PositionsBody = self.get_json("/positions", &[]).await?;
        Ok(body.positions)
    }

    async fn portfolio_value(&self) -> Result<Option<f64>, PortfolioError> {
        let body: ValueBody = self.get_json("/value", &[]).await?;
        Ok(body.value)
    }

    async fn strategy_daily_pnl(
        &self,
        strategy_id: &str,
        since: DateTime<Utc>,
    ) -> Result<f64, PortfolioError> {
        let body: PnlBody = self
            .get_json(&format!("/pnl/strategy/{strategy_id}"), &since_query(since))
            .await?;
        Ok(body.pnl)
    }

    async fn total_daily_pnl(&self, since: DateTime<Utc>) -> Result<f64, PortfolioError> {
        let body: PnlBody = self.get_json("/pnl/total", &since_query(since)).await?;
        Ok(body.pnl)
    }
}
