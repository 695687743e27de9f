//! Simulated "paper" broker adapter.
//!
//! Fills orders instantly against a small fixed price table with configured
//! slippage — no capital at risk. Used by tests, dry runs, and as the
//! reference implementation of the [`BrokerAdapter`] contract:
//!
//! - Equities: MARKET only; any other type is a broker order error.
//! - Fill price: `table_price · (1 + bps/10⁴)` for BUY, `1 − bps/10⁴` for
//!   SELL.
//! - Options: fill at the limit price when given, else at a synthetic
//!   premium `max(0.01, intrinsic + 0.02 · underlying)`.
//! - Spreads are atomic: all per-leg fills are produced in a single step; a
//!   net limit price is distributed evenly across legs.
//! - Simulated latencies are small fixed delays; callers may rely on
//!   ordering but never on durations.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use qg_execution::{
    BrokerAdapter, BrokerError, BrokerOrderRecord, Fill, OptionFill, OptionLeg, OptionType,
    OrderStatus, OrderType,
};
use qg_schemas::Side;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

const SUBMIT_LATENCY: Duration = Duration::from_millis(10);
const FILL_LATENCY: Duration = Duration::from_millis(50);

#[derive(Default)]
struct Books {
    orders: HashMap<String, BrokerOrderRecord>,
    fills: HashMap<String, Vec<Fill>>,
    option_fills: HashMap<String, Vec<OptionFill>>,
}

/// Paper trading broker — simulates execution without real capital.
pub struct PaperBroker {
    slippage_bps: u32,
    books: Mutex<Books>,
}

impl PaperBroker {
    /// Broker with the given simulated slippage in basis points.
    pub fn new(slippage_bps: u32) -> Self {
        Self {
            slippage_bps,
            books: Mutex::new(Books::default()),
        }
    }

    fn opaque_id(prefix: &str) -> String {
        let hex = Uuid::new_v4().simple().to_string();
        format!("{prefix}{}", &hex[..8])
    }

    /// Fixed reference prices; unknown symbols fall back to 100.0.
    fn mock_price(symbol: &str) -> f64 {
        match symbol {
            "AAPL" => 175.50,
            "MSFT" => 380.25,
            "GOOGL" => 140.75,
            "TSLA" => 250.00,
            _ => 100.0,
        }
    }

    /// Synthetic per-contract premium: intrinsic value plus 2% of the
    /// underlying as time value, floored at one cent.
    fn mock_premium(leg: &OptionLeg) -> f64 {
        let underlying = Self::mock_price(&leg.underlying);
        let intrinsic = match leg.option_type {
            OptionType::Call => (underlying - leg.strike).max(0.0),
            OptionType::Put => (leg.strike - underlying).max(0.0),
        };
        (intrinsic + 0.02 * underlying).max(0.01)
    }

    fn slipped_price(&self, symbol: &str, side: Side) -> f64 {
        let base = Self::mock_price(symbol);
        let direction = match side {
            Side::Buy => 1.0,
            Side::Sell => -1.0,
        };
        base * (1.0 + direction * self.slippage_bps as f64 / 10_000.0)
    }
}

#[async_trait]
impl BrokerAdapter for PaperBroker {
    fn name(&self) -> &'static str {
        "PAPER"
    }

    async fn submit_order(
        &self,
        symbol: &str,
        side: Side,
        quantity: f64,
        order_type: OrderType,
    ) -> Result<String, BrokerError> {
        if order_type != OrderType::Market {
            return Err(BrokerError::Order(format!(
                "paper broker only supports MARKET orders, got {order_type}"
            )));
        }

        let broker_order_id = Self::opaque_id("PAPER_");
        tokio::time::sleep(SUBMIT_LATENCY).await;

        {
            let mut books = self.books.lock().await;
            books.orders.insert(
                broker_order_id.clone(),
                BrokerOrderRecord {
                    broker_order_id: broker_order_id.clone(),
                    symbol: symbol.to_string(),
                    side,
                    quantity,
                    status: OrderStatus::Submitted,
                    created_at: Utc::now(),
                    filled_at: None,
                    cancelled_at: None,
                },
            );
        }

        // Market orders fill immediately at the slipped table price.
        tokio::time::sleep(FILL_LATENCY).await;
        let price = self.slipped_price(symbol, side);
        let fill = Fill::new(broker_order_id.clone(), symbol, quantity, price);

        let mut books = self.books.lock().await;
        books.fills.entry(broker_order_id.clone()).or_default().push(fill);
        if let Some(order) = books.orders.get_mut(&broker_order_id) {
            order.status = OrderStatus::Filled;
            order.filled_at = Some(Utc::now());
        }

        debug!(broker_order_id = %broker_order_id, symbol, price, "paper fill");
        Ok(broker_order_id)
    }

    async fn cancel_order(&self, broker_order_id: &str) -> Result<bool, BrokerError> {
        let mut books = self.books.lock().await;
        let Some(order) = books.orders.get_mut(broker_order_id) else {
            return Err(BrokerError::Order(format!("order not found: {broker_order_id}")));
        };

        if order.status.is_terminal() {
            return Ok(false);
        }
        order.status = OrderStatus::Cancelled;
        order.cancelled_at = Some(Utc::now());
        Ok(true)
    }

    async fn get_order_status(
        &self,
        broker_order_id: &str,
    ) -> Result<BrokerOrderRecord, BrokerError> {
        self.books
            .lock()
            .await
            .orders
            .get(broker_order_id)
            .cloned()
            .ok_or_else(|| BrokerError::Order(format!("order not found: {broker_order_id}")))
    }

    async fn get_fills(&self, broker_order_id: &str) -> Result<Vec<Fill>, BrokerError> {
        Ok(self
            .books
            .lock()
            .await
            .fills
            .get(broker_order_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn submit_option_order(
        &self,
        leg: &OptionLeg,
        limit_price: Option<f64>,
    ) -> Result<String, BrokerError> {
        let broker_order_id = Self::opaque_id("PAPER_OPT_");
        tokio::time::sleep(SUBMIT_LATENCY).await;

        let contract = leg.contract_symbol();
        {
            let mut books = self.books.lock().await;
            books.orders.insert(
                broker_order_id.clone(),
                BrokerOrderRecord {
                    broker_order_id: broker_order_id.clone(),
                    symbol: contract.clone(),
                    side: leg.side,
                    quantity: leg.quantity as f64,
                    status: OrderStatus::Submitted,
                    created_at: Utc::now(),
                    filled_at: None,
                    cancelled_at: None,
                },
            );
        }

        tokio::time::sleep(FILL_LATENCY).await;
        let price = limit_price.unwrap_or_else(|| Self::mock_premium(leg));
        let fill = OptionFill::new(broker_order_id.clone(), contract, leg.quantity, price);

        let mut books = self.books.lock().await;
        books
            .option_fills
            .entry(broker_order_id.clone())
            .or_default()
            .push(fill);
        if let Some(order) = books.orders.get_mut(&broker_order_id) {
            order.status = OrderStatus::Filled;
            order.filled_at = Some(Utc::now());
        }

        Ok(broker_order_id)
    }

    async fn submit_option_spread(
        &self,
        legs: &[OptionLeg],
        limit_price: Option<f64>,
    ) -> Result<String, BrokerError> {
        if legs.is_empty() {
            return Err(BrokerError::Order("spread must have at least one leg".to_string()));
        }

        let broker_order_id = Self::opaque_id("PAPER_SPREAD_");
        tokio::time::sleep(SUBMIT_LATENCY).await;

        {
            let mut books = self.books.lock().await;
            books.orders.insert(
                broker_order_id.clone(),
                BrokerOrderRecord {
                    broker_order_id: broker_order_id.clone(),
                    symbol: legs[0].underlying.clone(),
                    side: legs[0].side,
                    quantity: legs.iter().map(|l| l.quantity as f64).sum(),
                    status: OrderStatus::Submitted,
                    created_at: Utc::now(),
                    filled_at: None,
                    cancelled_at: None,
                },
            );
        }

        tokio::time::sleep(FILL_LATENCY).await;

        // Atomic execution: every leg fills in this single step. A net
        // limit price is distributed evenly; otherwise each leg fills at
        // its synthetic premium.
        let per_leg_limit = limit_price.map(|p| p / legs.len() as f64);
        let fills: Vec<OptionFill> = legs
            .iter()
            .map(|leg| {
                let price = per_leg_limit.unwrap_or_else(|| Self::mock_premium(leg));
                OptionFill::new(
                    broker_order_id.clone(),
                    leg.contract_symbol(),
                    leg.quantity,
                    price,
                )
            })
            .collect();

        let mut books = self.books.lock().await;
        books.option_fills.insert(broker_order_id.clone(), fills);
        if let Some(order) = books.orders.get_mut(&broker_order_id) {
            order.status = OrderStatus::Filled;
            order.filled_at = Some(Utc::now());
        }

        Ok(broker_order_id)
    }

    async fn get_option_fills(
        &self,
        broker_order_id: &str,
    ) -> Result<Vec<OptionFill>, BrokerError> {
        Ok(self
            .books
            .lock()
            .await
            .option_fills
            .get(broker_order_id)
            .cloned()
            .unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
