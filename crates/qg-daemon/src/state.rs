//! Shared daemon state and production wiring.

use std::sync::Arc;

use anyhow::{Context, Result};
use qg_audit::{DecisionLog, JsonlAuditSink, TradeLog};
use qg_broker_paper::PaperBroker;
use qg_config::{load_layered_limits, GatewayConfig, RiskLimits};
use qg_execution::OrderRouter;
use qg_halt::{KillSwitch, MemoryHaltStore};
use qg_pipeline::SignalPipeline;
use qg_portfolio::{HttpPortfolioClient, PortfolioClient, StaticPortfolio};
use qg_risk::{MemoryThrottleStore, PreTradeRiskChecker};
use tracing::info;

/// Build identity reported by the health endpoints.
#[derive(Debug, Clone, Copy)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

impl BuildInfo {
    pub fn current() -> Self {
        Self {
            service: "quantgate",
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

/// Shared application state handed to every handler.
pub struct AppState {
    pub pipeline: SignalPipeline,
    pub build: BuildInfo,
}

impl AppState {
    pub fn new(pipeline: SignalPipeline) -> Self {
        Self {
            pipeline,
            build: BuildInfo::current(),
        }
    }

    /// Production wiring from environment configuration.
    ///
    /// The halt flag and throttle counters run on in-process stores here;
    /// deployments sharing them across gateway replicas swap in their
    /// kv-backed implementations at this single point.
    pub fn bootstrap(cfg: &GatewayConfig) -> Result<Arc<Self>> {
        let limits = match std::env::var("QG_LIMITS_FILE") {
            Ok(path) => {
                let loaded = load_layered_limits(&[path.as_str()])
                    .with_context(|| format!("load risk limits from {path}"))?;
                info!(config_hash = %loaded.config_hash, "risk limits loaded");
                loaded.limits
            }
            Err(_) => RiskLimits::default(),
        };

        let portfolio: Arc<dyn PortfolioClient> = match &cfg.portfolio_service_url {
            Some(url) => {
                info!(url = %url, "using portfolio service");
                Arc::new(HttpPortfolioClient::new(url.clone()))
            }
            None => {
                info!("no PORTFOLIO_SERVICE_URL set; using in-memory portfolio");
                Arc::new(StaticPortfolio::new())
            }
        };

        let decisions = JsonlAuditSink::new(
            format!("{}/decisions.jsonl", cfg.audit_dir),
            true,
        )
        .context("open decision log")?;
        let trades = JsonlAuditSink::new(format!("{}/trades.jsonl", cfg.audit_dir), true)
            .context("open trade log")?;

        let pipeline = SignalPipeline::new(
            KillSwitch::new(Arc::new(MemoryHaltStore::new())),
            PreTradeRiskChecker::new(portfolio, Arc::new(MemoryThrottleStore::new()), limits),
            OrderRouter::new(Arc::new(PaperBroker::new(cfg.paper_slippage_bps))),
            DecisionLog::new(Arc::new(decisions)),
            TradeLog::new(Arc::new(trades)),
        );

        Ok(Arc::new(Self::new(pipeline)))
    }
}
