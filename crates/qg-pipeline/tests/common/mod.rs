//! Shared wiring for pipeline scenario tests: paper broker, in-memory
//! stores, and inspectable audit sinks.
#![allow(dead_code)]

use std::sync::Arc;

use qg_audit::{DecisionLog, MemoryAuditSink, TradeLog};
use qg_broker_paper::PaperBroker;
use qg_config::RiskLimits;
use qg_execution::OrderRouter;
use qg_halt::{KillSwitch, MemoryHaltStore};
use qg_pipeline::SignalPipeline;
use qg_portfolio::StaticPortfolio;
use qg_risk::{MemoryThrottleStore, PreTradeRiskChecker};
use qg_schemas::{Side, SignalConstraints, TimeHorizon, TradingSignal};

pub struct Harness {
    pub pipeline: SignalPipeline,
    pub portfolio: Arc<StaticPortfolio>,
    pub decisions: Arc<MemoryAuditSink>,
    pub trades: Arc<MemoryAuditSink>,
}

pub fn harness(limits: RiskLimits) -> Harness {
    let portfolio = Arc::new(StaticPortfolio::new());
    let decisions = Arc::new(MemoryAuditSink::new());
    let trades = Arc::new(MemoryAuditSink::new());

    let pipeline = SignalPipeline::new(
        KillSwitch::new(Arc::new(MemoryHaltStore::new())),
        PreTradeRiskChecker::new(
            portfolio.clone(),
            Arc::new(MemoryThrottleStore::new()),
            limits,
        ),
        OrderRouter::new(Arc::new(PaperBroker::new(5))),
        DecisionLog::new(decisions.clone()),
        TradeLog::new(trades.clone()),
    );

    Harness {
        pipeline,
        portfolio,
        decisions,
        trades,
    }
}

pub fn buy_signal(symbol: &str, target_exposure: f64) -> TradingSignal {
    TradingSignal {
        strategy_id: "strat-alpha".to_string(),
        symbol: symbol.to_string(),
        side: Side::Buy,
        confidence: 0.9,
        target_exposure,
        time_horizon: TimeHorizon::Intraday,
        constraints: SignalConstraints {
            max_slippage_bps: 25,
            max_notional: None,
        },
    }
}
