//! With the kill switch active, any valid signal is rejected before risk
//! checks run and before any broker contact.

mod common;

use common::{buy_signal, harness};
use qg_config::RiskLimits;
use qg_schemas::SignalStatus;

#[tokio::test]
async fn active_kill_switch_rejects_without_broker_contact() {
    let h = harness(RiskLimits::default());
    h.portfolio.set_portfolio_value(Some(1_000_000.0)).await;
    h.pipeline.kill_switch().activate("drill").await.unwrap();

    let resp = h
        .pipeline
        .process_signal(&buy_signal("AAPL", 10_000.0))
        .await
        .unwrap();

    assert_eq!(resp.status, SignalStatus::Rejected);
    assert_eq!(resp.message, "Kill switch is active - trading halted");
    assert!(resp.order_id.is_none());

    // The decision entry marks the kill_switch pseudo-check invalid and
    // preserves the activation reason.
    let decisions = h.decisions.entries().await;
    assert_eq!(decisions.len(), 1);
    assert_eq!(decisions[0]["decision"], "REJECTED");
    assert_eq!(decisions[0]["check_results"]["kill_switch"]["valid"], false);
    assert_eq!(decisions[0]["metadata"]["halt_reason"], "drill");

    // No broker contact: the trade log is empty.
    assert!(h.trades.entries().await.is_empty());
}

#[tokio::test]
async fn deactivating_the_switch_restores_trading() {
    let h = harness(RiskLimits::default());
    h.portfolio.set_portfolio_value(Some(1_000_000.0)).await;

    h.pipeline.kill_switch().activate("drill").await.unwrap();
    let rejected = h
        .pipeline
        .process_signal(&buy_signal("AAPL", 10_000.0))
        .await
        .unwrap();
    assert_eq!(rejected.status, SignalStatus::Rejected);

    h.pipeline.kill_switch().deactivate("drill complete").await.unwrap();
    let approved = h
        .pipeline
        .process_signal(&buy_signal("AAPL", 10_000.0))
        .await
        .unwrap();
    assert_eq!(approved.status, SignalStatus::Approved);
}
