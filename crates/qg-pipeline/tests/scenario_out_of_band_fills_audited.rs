//! Out-of-band fills: applied fills emit ORDER_FILLED with cumulative
//! state; mismatched fills are discarded, audited, and leave the order
//! untouched.

mod common;

use common::{buy_signal, harness};
use qg_config::RiskLimits;
use qg_execution::{Fill, Order, OrderStatus};
use qg_pipeline::FillDisposition;
use qg_schemas::Side;

fn submitted_order() -> Order {
    let mut order = Order::new("strat-alpha", "AAPL", Side::Buy, 100.0, 10_000.0);
    order.broker_order_id = Some("BRK1".to_string());
    order.transition(OrderStatus::Submitted).unwrap();
    order
}

#[tokio::test]
async fn partial_then_full_fill_emit_filled_entries() {
    let h = harness(RiskLimits::default());
    let mut order = submitted_order();

    let disposition = h
        .pipeline
        .apply_fill(&mut order, &Fill::new("BRK1", "AAPL", 50.0, 100.0))
        .await
        .unwrap();
    assert_eq!(disposition, FillDisposition::Applied);
    assert_eq!(order.status, OrderStatus::PartiallyFilled);
    assert_eq!(order.average_fill_price, Some(100.0));

    h.pipeline
        .apply_fill(&mut order, &Fill::new("BRK1", "AAPL", 50.0, 100.0))
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::Filled);
    assert_eq!(order.filled_quantity, 100.0);
    assert_eq!(order.filled_notional, 10_000.0);

    let trades = h.trades.entries().await;
    let events: Vec<&str> = trades.iter().map(|e| e["event"].as_str().unwrap()).collect();
    assert_eq!(events, vec!["ORDER_FILLED", "ORDER_FILLED"]);
    assert_eq!(trades[0]["status"], "PARTIALLY_FILLED");
    assert_eq!(trades[1]["status"], "FILLED");
    assert_eq!(trades[1]["total_filled_notional"], 10_000.0);
}

#[tokio::test]
async fn mismatched_fill_is_discarded_and_audited() {
    let h = harness(RiskLimits::default());
    let mut order = submitted_order();

    let disposition = h
        .pipeline
        .apply_fill(&mut order, &Fill::new("SOMEONE_ELSE", "AAPL", 50.0, 100.0))
        .await
        .unwrap();

    match disposition {
        FillDisposition::Discarded(reason) => {
            assert_eq!(reason, "Broker order ID mismatch")
        }
        other => panic!("expected discard, got {other:?}"),
    }
    // Order untouched.
    assert_eq!(order.status, OrderStatus::Submitted);
    assert_eq!(order.filled_quantity, 0.0);

    let trades = h.trades.entries().await;
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0]["event"], "FILL_DISCARDED");
    assert_eq!(trades[0]["reason"], "Broker order ID mismatch");
}

#[tokio::test]
async fn fractional_overfill_is_clamped_to_order_totals() {
    let h = harness(RiskLimits::default());
    let mut order = submitted_order();

    let disposition = h
        .pipeline
        .apply_fill(&mut order, &Fill::new("BRK1", "AAPL", 100.5, 100.0))
        .await
        .unwrap();

    assert_eq!(disposition, FillDisposition::Applied);
    assert_eq!(order.status, OrderStatus::Filled);
    assert_eq!(order.filled_quantity, 100.0);
    assert_eq!(order.filled_notional, 10_000.0);
}
