//! End-to-end spread execution against the paper broker: a two-leg call
//! debit spread submits atomically, both leg fills arrive in one step, and
//! applying them drives the spread to FILLED.

use std::sync::Arc;

use chrono::NaiveDate;
use qg_broker_paper::PaperBroker;
use qg_execution::{
    BrokerAdapter, OptionFillProcessor, OptionLeg, OptionOrderRouter, OptionSpreadOrder,
    OptionType, OrderStatus,
};
use qg_schemas::Side;

fn call_leg(strike: f64, side: Side, quantity: u32) -> OptionLeg {
    OptionLeg {
        underlying: "AAPL".to_string(),
        option_type: OptionType::Call,
        strike,
        expiration: NaiveDate::from_ymd_opt(2027, 1, 15).unwrap(),
        side,
        quantity,
        contract_multiplier: 100,
    }
}

#[tokio::test]
async fn call_debit_spread_fills_atomically() {
    let broker = Arc::new(PaperBroker::new(5));
    let router = OptionOrderRouter::new(broker.clone());

    let long = call_leg(175.0, Side::Buy, 10);
    let short = call_leg(180.0, Side::Sell, 10);
    let mut spread =
        OptionSpreadOrder::new("strat-alpha", vec![long.clone(), short.clone()], None).unwrap();

    router.submit_spread_order(&mut spread).await.unwrap();
    assert_eq!(spread.status, OrderStatus::Submitted);
    let broker_order_id = spread.broker_order_id.clone().unwrap();
    assert!(broker_order_id.starts_with("PAPER_SPREAD_"));

    // Both leg fills are present immediately after submission.
    let fills = broker.get_option_fills(&broker_order_id).await.unwrap();
    assert_eq!(fills.len(), 2);

    for fill in &fills {
        let leg = spread
            .legs
            .iter()
            .find(|l| l.contract_symbol() == fill.contract_symbol)
            .cloned()
            .expect("fill must match a leg");
        OptionFillProcessor::apply_to_spread(&mut spread, fill, &leg).unwrap();
    }

    assert!(spread.is_fully_filled());
    assert_eq!(spread.status, OrderStatus::Filled);
    assert_eq!(spread.leg_fills[&long.contract_symbol()], 10);
    assert_eq!(spread.leg_fills[&short.contract_symbol()], 10);

    // Fill prices were recorded per leg and net notional reflects them.
    assert!(spread.leg_fill_prices[&long.contract_symbol()] > 0.0);
    assert!(spread.net_notional() > 0.0);
}

#[tokio::test]
async fn net_limit_price_is_distributed_across_legs() {
    let broker = Arc::new(PaperBroker::new(5));
    let router = OptionOrderRouter::new(broker.clone());

    let legs = vec![call_leg(175.0, Side::Buy, 4), call_leg(180.0, Side::Sell, 4)];
    let mut spread = OptionSpreadOrder::new("strat-alpha", legs, Some(6.0)).unwrap();

    router.submit_spread_order(&mut spread).await.unwrap();
    let fills = broker
        .get_option_fills(spread.broker_order_id.as_deref().unwrap())
        .await
        .unwrap();

    assert_eq!(fills.len(), 2);
    for fill in fills {
        assert_eq!(fill.price_per_contract, 3.0);
        assert_eq!(fill.quantity, 4);
    }
}

#[tokio::test]
async fn single_leg_option_order_round_trip() {
    let broker = Arc::new(PaperBroker::new(5));
    let router = OptionOrderRouter::new(broker.clone());

    let mut order =
        qg_execution::OptionOrder::new("strat-alpha", call_leg(170.0, Side::Buy, 3), Some(6.25));
    router.submit_option_order(&mut order).await.unwrap();

    let fills = broker
        .get_option_fills(order.broker_order_id.as_deref().unwrap())
        .await
        .unwrap();
    assert_eq!(fills.len(), 1);

    OptionFillProcessor::apply_to_order(&mut order, &fills[0]).unwrap();
    assert_eq!(order.status, OrderStatus::Filled);
    assert_eq!(order.filled_quantity, 3);
    assert_eq!(order.filled_price, Some(6.25));
}
